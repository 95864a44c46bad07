//! Viewer-side reconstruction of data structures from a trace
//!
//! Everything here works on [`Step`]s alone. For each variable of the
//! selected step, [`classify`] picks a [`Shape`] and the matching builder
//! produces a [`Structure`] ready to draw:
//!
//! - arrays and deques get per-cell changed marks (against the previous step)
//!   and read/write marks (from the step's accesses)
//! - linked lists, trees and graphs are rebuilt from object fields
//! - other mappings become key/value rows
//!
//! Scalars and unrecognized values have no structure; they appear only in the
//! flat inspector ([`format::format_value`]).

pub mod classify;
pub mod diff;
pub mod format;
pub mod order;
pub mod structures;

pub use classify::{classify, Shape};
pub use order::VariableOrder;

use crate::snapshot::{AccessEvent, SerializedValue, Step, VariableBinding};
use diff::{bar_heights, cell_accesses, changed_cells};
use format::format_value;
use structures::{binary_tree, graph, linked_list, nary_tree, GraphView, LinkedListView, TreeNode};

/// Bracket style of an array view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    List,
    Tuple,
    Set,
    Deque,
}

impl ArrayKind {
    /// Opening and closing caps drawn around the cells
    pub fn caps(self) -> (&'static str, &'static str) {
        match self {
            ArrayKind::List => ("[", "]"),
            ArrayKind::Tuple => ("(", ")"),
            ArrayKind::Set => ("{", "}"),
            ArrayKind::Deque => ("Front ⇄", "⇄ Back"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayCell {
    pub text: String,
    pub changed: bool,
    pub read: bool,
    pub write: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayView {
    pub kind: ArrayKind,
    pub cells: Vec<ArrayCell>,
    /// Present only when every item is numeric
    pub bars: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    Array(ArrayView),
    LinkedList(LinkedListView),
    Tree(TreeNode),
    Graph(GraphView),
    Map(Vec<(String, String)>),
}

/// One variable as the structures view shows it
#[derive(Debug, Clone, PartialEq)]
pub struct VariableView<'a> {
    pub name: &'a str,
    pub binding: &'a VariableBinding,
    pub shape: Shape,
    pub structure: Structure,
}

fn array_view(
    kind: ArrayKind,
    items: &[SerializedValue],
    binding: &VariableBinding,
    previous: Option<&SerializedValue>,
    accesses: &[AccessEvent],
) -> ArrayView {
    let changed = changed_cells(previous, items);
    let marks = cell_accesses(accesses, binding.id.as_deref(), items.len());
    let cells = items
        .iter()
        .zip(changed)
        .zip(marks)
        .map(|((item, changed), mark)| ArrayCell {
            text: format_value(item),
            changed,
            read: mark.read,
            write: mark.write,
        })
        .collect();
    ArrayView {
        kind,
        cells,
        bars: if kind == ArrayKind::Deque {
            None
        } else {
            bar_heights(items)
        },
    }
}

/// Build the structure for `binding`, given the same name's value in the
/// previous step
pub fn structure_of(
    binding: &VariableBinding,
    previous: Option<&SerializedValue>,
    accesses: &[AccessEvent],
) -> Option<Structure> {
    let value = &binding.value;
    let structure = match (classify(value), value) {
        (Shape::Array | Shape::Deque, _) => {
            let kind = match value {
                SerializedValue::Tuple(_) => ArrayKind::Tuple,
                SerializedValue::Set(_) => ArrayKind::Set,
                SerializedValue::Deque(_) => ArrayKind::Deque,
                _ => ArrayKind::List,
            };
            let items = value.collection_items()?;
            Structure::Array(array_view(kind, items, binding, previous, accesses))
        }
        (Shape::LinkedNode, _) => Structure::LinkedList(linked_list(value)),
        (Shape::BinaryTree, _) => Structure::Tree(binary_tree(value)),
        (Shape::NTree, _) => Structure::Tree(nary_tree(value)),
        (Shape::Graph, _) => Structure::Graph(graph(value)?),
        (Shape::Map, SerializedValue::Mapping(map)) => Structure::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), format_value(v)))
                .collect(),
        ),
        _ => return None,
    };
    Some(structure)
}

/// Structural views for the names in `order` bound at `steps[index]`
pub fn reconstruct<'a>(steps: &'a [Step], index: usize, order: &VariableOrder) -> Vec<VariableView<'a>> {
    let Some(step) = steps.get(index) else {
        return Vec::new();
    };
    let previous = index.checked_sub(1).and_then(|i| steps.get(i));

    let mut views = Vec::new();
    for name in order.visible(step) {
        let Some((name, binding)) = step.variables.get_key_value(name) else {
            continue;
        };
        let before = previous
            .and_then(|p| p.variables.get(name))
            .map(|b| &b.value);
        if let Some(structure) = structure_of(binding, before, &step.accesses) {
            views.push(VariableView {
                name,
                binding,
                shape: classify(&binding.value),
                structure,
            });
        }
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::AccessKind;
    use indexmap::IndexMap;
    use serde_json::json;

    fn step(vars: serde_json::Value, accesses: Vec<AccessEvent>) -> Step {
        let variables: IndexMap<String, VariableBinding> = serde_json::from_value(vars).unwrap();
        Step {
            line: 1,
            stdout: String::new(),
            variables,
            accesses,
            explanation: "Line 1".into(),
        }
    }

    fn tracked(items: serde_json::Value) -> serde_json::Value {
        json!({"type": "list", "id": "7", "value": {"__type__": "list", "id": "7", "items": items}})
    }

    #[test]
    fn test_array_diff_and_accesses() {
        let steps = vec![
            step(json!({"a": tracked(json!([1, 2, 3])), "n": {"type": "int", "value": 1}}), vec![]),
            step(
                json!({"a": tracked(json!([1, 5, 3])), "n": {"type": "int", "value": 2}}),
                vec![AccessEvent {
                    kind: AccessKind::Write,
                    container_id: "7".into(),
                    index: 1,
                }],
            ),
        ];
        let mut order = VariableOrder::new();
        order.observe(&steps[0]);

        let views = reconstruct(&steps, 1, &order);
        assert_eq!(views.len(), 1, "scalars have no structure");
        let Structure::Array(array) = &views[0].structure else {
            panic!("Expected array");
        };
        let changed: Vec<_> = array.cells.iter().map(|c| c.changed).collect();
        assert_eq!(changed, vec![false, true, false]);
        assert!(array.cells[1].write && !array.cells[1].read);
        assert_eq!(array.bars.as_ref().map(Vec::len), Some(3));

        // The first step has nothing to compare against
        let first = reconstruct(&steps, 0, &order);
        let Structure::Array(array) = &first[0].structure else {
            panic!("Expected array");
        };
        assert!(array.cells.iter().all(|c| !c.changed));
    }

    #[test]
    fn test_deque_has_no_bars() {
        let steps = vec![step(
            json!({"q": {"type": "deque", "value": {"__type__": "deque", "items": [1, 2]}}}),
            vec![],
        )];
        let mut order = VariableOrder::new();
        order.observe(&steps[0]);
        let views = reconstruct(&steps, 0, &order);
        assert_eq!(views[0].shape, Shape::Deque);
        let Structure::Array(array) = &views[0].structure else {
            panic!("Expected array");
        };
        assert_eq!(array.kind, ArrayKind::Deque);
        assert_eq!(array.bars, None);
    }

    #[test]
    fn test_map_rows() {
        let steps = vec![step(
            json!({"d": {"type": "dict", "value": {"a": 1, "b": "x"}}}),
            vec![],
        )];
        let mut order = VariableOrder::new();
        order.observe(&steps[0]);
        let views = reconstruct(&steps, 0, &order);
        assert_eq!(
            views[0].structure,
            Structure::Map(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "'x'".to_string())
            ])
        );
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(reconstruct(&[], 3, &VariableOrder::new()).is_empty());
    }
}
