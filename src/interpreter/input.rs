//! Queued input lines
//!
//! A run receives every line the user has typed so far, in order. `input()`
//! pops the next one; when none is left the run suspends so the caller can
//! ask for another line and replay the whole run with it appended.

use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    pending: VecDeque<String>,
    consumed: usize,
}

impl InputQueue {
    pub fn new(lines: impl IntoIterator<Item = String>) -> Self {
        InputQueue {
            pending: lines.into_iter().collect(),
            consumed: 0,
        }
    }

    pub fn pop(&mut self) -> Option<String> {
        let line = self.pending.pop_front()?;
        self.consumed += 1;
        Some(line)
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Number of lines handed to the script so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_order() {
        let mut queue = InputQueue::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.remaining(), 1);
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.consumed(), 2);
    }
}
