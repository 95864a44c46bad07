//! Display order of variables
//!
//! Names are appended the first time they are seen and keep their slot
//! afterwards, so panels don't jump around as variables come and go. The user
//! can move a name to another name's slot.

use crate::snapshot::Step;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableOrder {
    names: Vec<String>,
}

impl VariableOrder {
    pub fn new() -> Self {
        VariableOrder::default()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    /// Append any names of `step` not seen before
    pub fn observe(&mut self, step: &Step) {
        for name in step.variables.keys() {
            if !self.names.contains(name) {
                self.names.push(name.clone());
            }
        }
    }

    /// Remove `dragged` and re-insert it at the index `target` had before
    /// the removal. Returns false when either name is unknown.
    pub fn reorder(&mut self, dragged: &str, target: &str) -> bool {
        let (Some(from), Some(to)) = (self.position(dragged), self.position(target)) else {
            return false;
        };
        if from == to {
            return false;
        }
        let name = self.names.remove(from);
        self.names.insert(to, name);
        true
    }

    /// Move `name` one slot up (`-1`) or down (`+1`) among the names visible
    /// in `step`
    pub fn shift(&mut self, name: &str, step: &Step, offset: isize) -> bool {
        let visible = self.visible(step);
        let Some(index) = visible.iter().position(|n| *n == name) else {
            return false;
        };
        let Some(target) = index
            .checked_add_signed(offset)
            .and_then(|i| visible.get(i))
            .map(|n| n.to_string())
        else {
            return false;
        };
        self.reorder(name, &target)
    }

    /// Names bound in `step`, in display order
    pub fn visible<'a>(&'a self, step: &Step) -> Vec<&'a str> {
        self.names
            .iter()
            .filter(|name| step.variables.contains_key(*name))
            .map(String::as_str)
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{SerializedValue, VariableBinding};
    use indexmap::IndexMap;

    fn step(names: &[&str]) -> Step {
        let variables: IndexMap<_, _> = names
            .iter()
            .map(|n| {
                (
                    n.to_string(),
                    VariableBinding {
                        type_name: "int".into(),
                        value: SerializedValue::Int(0),
                        id: None,
                    },
                )
            })
            .collect();
        Step {
            line: 1,
            stdout: String::new(),
            variables,
            accesses: Vec::new(),
            explanation: "Line 1".into(),
        }
    }

    #[test]
    fn test_new_names_append() {
        let mut order = VariableOrder::new();
        order.observe(&step(&["b", "a"]));
        order.observe(&step(&["c", "a"]));
        assert_eq!(order.names(), ["b", "a", "c"]);
        assert_eq!(order.visible(&step(&["c", "b"])), vec!["b", "c"]);
    }

    #[test]
    fn test_reorder() {
        let mut order = VariableOrder::new();
        order.observe(&step(&["a", "b", "c", "d"]));
        assert!(order.reorder("a", "c"));
        assert_eq!(order.names(), ["b", "c", "a", "d"]);
        assert!(order.reorder("d", "b"));
        assert_eq!(order.names(), ["d", "b", "c", "a"]);
        assert!(!order.reorder("x", "a"));
        assert!(!order.reorder("a", "a"));
    }

    #[test]
    fn test_shift_skips_hidden_names() {
        let mut order = VariableOrder::new();
        order.observe(&step(&["a", "b", "c"]));
        let current = step(&["a", "c"]);
        assert!(order.shift("a", &current, 1));
        assert_eq!(order.visible(&current), vec!["c", "a"]);
        assert!(!order.shift("a", &current, 1));
        assert!(!order.shift("c", &current, -1));
    }
}
