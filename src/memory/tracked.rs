//! Access-tracking lists
//!
//! A list created from a list display carries a [`Tracker`]: integer-index
//! reads and writes on it append an [`AccessEvent`] to the step-scoped
//! [`AccessLog`] before the operation itself runs. Negative indices are
//! normalized against the current length (`-1` on a 5-element list logs
//! index 4). The log is shared by handle, so the list never needs to know
//! who drains it.
//!
//! Logging must never break the guest: if the log is unavailable the event
//! is dropped and the operation proceeds.

use super::value::{ObjId, Value};
use crate::snapshot::{AccessEvent, AccessKind};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared, step-scoped buffer of access events.
///
/// The interpreter holds one handle and writes through tracked lists; the
/// tracer holds another and drains it when it records a step.
#[derive(Debug, Clone, Default)]
pub struct AccessLog {
    events: Rc<RefCell<Vec<AccessEvent>>>,
}

impl AccessLog {
    pub fn new() -> Self {
        AccessLog::default()
    }

    pub fn record(&self, kind: AccessKind, container: ObjId, index: i64) {
        match self.events.try_borrow_mut() {
            Ok(mut events) => events.push(AccessEvent {
                kind,
                container_id: container.to_string(),
                index,
            }),
            Err(_) => tracing::trace!(?kind, container, index, "access log busy, event dropped"),
        }
    }

    /// Remove and return every event recorded since the last drain
    pub fn drain(&self) -> Vec<AccessEvent> {
        self.events
            .try_borrow_mut()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.try_borrow().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binding of a tracked list to its own identity and the log it reports to
#[derive(Debug, Clone)]
pub struct Tracker {
    container: ObjId,
    log: AccessLog,
}

/// Heap representation of a list
#[derive(Debug, Clone, Default)]
pub struct ListObject {
    pub items: Vec<Value>,
    tracker: Option<Tracker>,
}

impl ListObject {
    /// A list produced by a comprehension, `list()`, a slice, ...
    pub fn plain(items: Vec<Value>) -> Self {
        ListObject {
            items,
            tracker: None,
        }
    }

    /// A list produced by a list display
    pub fn tracked(items: Vec<Value>, container: ObjId, log: AccessLog) -> Self {
        ListObject {
            items,
            tracker: Some(Tracker { container, log }),
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.tracker.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resolve a (possibly negative) index against the current length
    pub fn resolve(&self, index: i64) -> Option<usize> {
        let effective = self.normalize(index);
        usize::try_from(effective)
            .ok()
            .filter(|&i| i < self.items.len())
    }

    fn normalize(&self, index: i64) -> i64 {
        if index >= 0 {
            index
        } else {
            self.items.len() as i64 + index
        }
    }

    fn log(&self, kind: AccessKind, index: i64) {
        if let Some(tracker) = &self.tracker {
            tracker
                .log
                .record(kind, tracker.container, self.normalize(index));
        }
    }

    /// Integer-index read (`lst[i]`). Logged even when out of range.
    pub fn get(&self, index: i64) -> Option<&Value> {
        self.log(AccessKind::Read, index);
        self.resolve(index).map(|i| &self.items[i])
    }

    /// Integer-index write (`lst[i] = v`). Returns false when out of range.
    pub fn set(&mut self, index: i64, value: Value) -> bool {
        self.log(AccessKind::Write, index);
        match self.resolve(index) {
            Some(i) => {
                self.items[i] = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(n: i64, log: &AccessLog) -> ListObject {
        ListObject::tracked((1..=n).map(Value::Int).collect(), 7, log.clone())
    }

    #[test]
    fn test_negative_index_is_normalized() {
        let log = AccessLog::new();
        let list = tracked(5, &log);

        assert_eq!(list.get(-1), Some(&Value::Int(5)));

        let events = log.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AccessKind::Read);
        assert_eq!(events[0].container_id, "7");
        assert_eq!(events[0].index, 4);
    }

    #[test]
    fn test_write_logs_then_stores() {
        let log = AccessLog::new();
        let mut list = tracked(3, &log);

        assert!(list.set(1, Value::Int(9)));
        assert_eq!(list.items[1], Value::Int(9));

        let events = log.drain();
        assert_eq!(events[0].kind, AccessKind::Write);
        assert_eq!(events[0].index, 1);
    }

    #[test]
    fn test_out_of_range_access_still_logged() {
        let log = AccessLog::new();
        let list = tracked(2, &log);

        assert_eq!(list.get(5), None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_plain_list_logs_nothing() {
        let log = AccessLog::new();
        let mut list = ListObject::plain(vec![Value::Int(1)]);

        list.get(0);
        list.set(0, Value::Int(2));
        assert!(log.is_empty());
    }

    #[test]
    fn test_busy_log_drops_event() {
        let log = AccessLog::new();
        let list = tracked(3, &log);

        let guard = log.events.borrow_mut();
        assert_eq!(list.get(0), Some(&Value::Int(1)));
        drop(guard);

        assert!(log.is_empty());
    }

    #[test]
    fn test_drain_empties_log() {
        let log = AccessLog::new();
        let list = tracked(3, &log);
        list.get(0);
        list.get(1);

        assert_eq!(log.drain().len(), 2);
        assert!(log.drain().is_empty());
    }
}
