//! Per-cell highlights for array views.
//!
//! The changed mark compares against the previous step only; a cell is
//! changed when the previous step had a value at that index and it differs.

use indexmap::IndexMap;

use crate::snapshot::{AccessEvent, AccessKind, SerializedValue};

/// Equality as the JSON form sees it: NaN matches NaN
pub fn same_value(a: &SerializedValue, b: &SerializedValue) -> bool {
    use SerializedValue as V;
    match (a, b) {
        (V::Float(x), V::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        (V::PlainList(x), V::PlainList(y))
        | (V::Tuple(x), V::Tuple(y))
        | (V::Set(x), V::Set(y))
        | (V::Deque(x), V::Deque(y)) => same_items(x, y),
        (V::List { id: i, items: x }, V::List { id: j, items: y }) => i == j && same_items(x, y),
        (V::Mapping(x), V::Mapping(y)) => same_fields(x, y),
        (
            V::Object {
                id: i,
                class: c,
                data: x,
            },
            V::Object {
                id: j,
                class: d,
                data: y,
            },
        ) => i == j && c == d && same_fields(x, y),
        _ => a == b,
    }
}

fn same_fields(a: &IndexMap<String, SerializedValue>, b: &IndexMap<String, SerializedValue>) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && same_value(va, vb))
}

fn same_items(a: &[SerializedValue], b: &[SerializedValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_value(x, y))
}

/// One flag per element of `current`
pub fn changed_cells(previous: Option<&SerializedValue>, current: &[SerializedValue]) -> Vec<bool> {
    let before = previous.and_then(SerializedValue::collection_items).unwrap_or(&[]);
    current
        .iter()
        .enumerate()
        .map(|(i, item)| before.get(i).is_some_and(|old| !same_value(old, item)))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellAccess {
    pub read: bool,
    pub write: bool,
}

/// Read/write marks for a container of `len` cells with identity `id`
pub fn cell_accesses(accesses: &[AccessEvent], id: Option<&str>, len: usize) -> Vec<CellAccess> {
    let mut cells = vec![CellAccess::default(); len];
    let Some(id) = id else {
        return cells;
    };
    for event in accesses.iter().filter(|e| e.container_id == id) {
        let Some(cell) = usize::try_from(event.index)
            .ok()
            .and_then(|i| cells.get_mut(i))
        else {
            continue;
        };
        match event.kind {
            AccessKind::Read => cell.read = true,
            AccessKind::Write => cell.write = true,
        }
    }
    cells
}

/// Bar heights in percent, only when every item is a number
pub fn bar_heights(items: &[SerializedValue]) -> Option<Vec<f64>> {
    if items.is_empty() {
        return None;
    }
    let numbers: Vec<f64> = items
        .iter()
        .map(SerializedValue::as_number)
        .collect::<Option<_>>()?;
    let max = numbers.iter().copied().fold(1.0_f64, f64::max);
    Some(
        numbers
            .into_iter()
            .map(|n| (n / max * 100.0).max(5.0))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<SerializedValue> {
        values.iter().copied().map(SerializedValue::Int).collect()
    }

    #[test]
    fn test_one_step_back_diff() {
        let before = SerializedValue::PlainList(ints(&[1, 2, 3]));
        let now = ints(&[1, 5, 3, 7]);
        assert_eq!(changed_cells(Some(&before), &now), vec![false, true, false, false]);
        assert_eq!(changed_cells(None, &now), vec![false; 4]);
        // A previous non-sequence binding marks nothing
        assert_eq!(
            changed_cells(Some(&SerializedValue::Int(1)), &now),
            vec![false; 4]
        );
    }

    #[test]
    fn test_nan_is_unchanged() {
        let before = SerializedValue::PlainList(vec![SerializedValue::Float(f64::NAN)]);
        assert_eq!(
            changed_cells(Some(&before), &[SerializedValue::Float(f64::NAN)]),
            vec![false]
        );
    }

    #[test]
    fn test_accesses_filtered_by_id() {
        let accesses = vec![
            AccessEvent {
                kind: AccessKind::Read,
                container_id: "4".into(),
                index: 1,
            },
            AccessEvent {
                kind: AccessKind::Write,
                container_id: "4".into(),
                index: 1,
            },
            AccessEvent {
                kind: AccessKind::Write,
                container_id: "9".into(),
                index: 0,
            },
            AccessEvent {
                kind: AccessKind::Read,
                container_id: "4".into(),
                index: 10,
            },
        ];
        let cells = cell_accesses(&accesses, Some("4"), 2);
        assert_eq!(cells[0], CellAccess::default());
        assert_eq!(cells[1], CellAccess { read: true, write: true });
        assert!(cell_accesses(&accesses, None, 2).iter().all(|c| !c.read && !c.write));
    }

    #[test]
    fn test_bar_heights() {
        assert_eq!(bar_heights(&ints(&[0, 50, 100])), Some(vec![5.0, 50.0, 100.0]));
        // Values below one are scaled against one
        assert_eq!(
            bar_heights(&[SerializedValue::Float(0.5)]),
            Some(vec![50.0])
        );
        assert_eq!(bar_heights(&[]), None);
        assert_eq!(bar_heights(&[SerializedValue::Str("a".into())]), None);
    }
}
