//! Linked lists, trees and graphs rebuilt from serialized objects.
//!
//! Walks carry their own visited set. A linked-list walk and each tree branch
//! stop at a node already on their path or at a `cyclic` marker; graph
//! traversal records every edge but expands each node once.

use std::collections::VecDeque;
use std::f64::consts::PI;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use super::classify::{is_adjacency, neighbor_field, CHILDREN_KEY, LEFT_KEY, NEXT_KEY, RIGHT_KEY};
use super::format::{format_value, label_text};
use crate::snapshot::SerializedValue;

const LABEL_KEYS: [&str; 3] = ["val", "value", "data"];

/// Text shown inside a node: `val`, then `value`, then `data`
pub fn node_label(data: &IndexMap<String, SerializedValue>) -> Option<String> {
    LABEL_KEYS
        .iter()
        .find_map(|key| data.get(*key))
        .map(label_text)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListNode {
    pub id: String,
    pub label: String,
}

/// How a linked-list walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEnd {
    Null,
    /// Reached a node already drawn
    Cycle { id: String },
    /// `next` held something that is not a node
    Value(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedListView {
    pub nodes: Vec<ListNode>,
    pub end: ListEnd,
}

pub fn linked_list(head: &SerializedValue) -> LinkedListView {
    let mut seen = FxHashSet::default();
    let mut nodes = Vec::new();
    let mut current = head;

    let end = loop {
        match current {
            SerializedValue::Object { id, data, .. } => {
                if !seen.insert(id.as_str()) {
                    break ListEnd::Cycle { id: id.clone() };
                }
                nodes.push(ListNode {
                    id: id.clone(),
                    label: node_label(data).unwrap_or_else(|| "?".to_string()),
                });
                match data.get(NEXT_KEY) {
                    Some(next) => current = next,
                    None => break ListEnd::Null,
                }
            }
            SerializedValue::Cyclic { id } => break ListEnd::Cycle { id: id.clone() },
            SerializedValue::None => break ListEnd::Null,
            other => break ListEnd::Value(format_value(other)),
        }
    };
    LinkedListView { nodes, end }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Node {
        id: String,
        label: String,
        children: Vec<TreeNode>,
    },
    /// Absent child
    Empty,
    /// Back-reference to a node on the current branch
    Cycle { id: String },
    /// A child that is a plain value
    Leaf(String),
}

impl TreeNode {
    /// Number of `Node`s in the tree
    pub fn node_count(&self) -> usize {
        match self {
            TreeNode::Node { children, .. } => {
                1 + children.iter().map(TreeNode::node_count).sum::<usize>()
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branching {
    Binary,
    Children,
}

fn tree_node(value: &SerializedValue, branching: Branching, path: &mut Vec<String>) -> TreeNode {
    let (id, data) = match value {
        SerializedValue::None => return TreeNode::Empty,
        SerializedValue::Cyclic { id } => return TreeNode::Cycle { id: id.clone() },
        SerializedValue::Object { id, data, .. } => (id, data),
        other => return TreeNode::Leaf(label_text(other)),
    };
    if path.contains(id) {
        return TreeNode::Cycle { id: id.clone() };
    }

    path.push(id.clone());
    let children = match branching {
        Branching::Binary => {
            let left = data.get(LEFT_KEY).unwrap_or(&SerializedValue::None);
            let right = data.get(RIGHT_KEY).unwrap_or(&SerializedValue::None);
            if *left == SerializedValue::None && *right == SerializedValue::None {
                Vec::new()
            } else {
                vec![
                    tree_node(left, branching, path),
                    tree_node(right, branching, path),
                ]
            }
        }
        Branching::Children => data
            .get(CHILDREN_KEY)
            .and_then(SerializedValue::sequence_items)
            .unwrap_or(&[])
            .iter()
            .map(|child| tree_node(child, branching, path))
            .collect(),
    };
    path.pop();

    TreeNode::Node {
        id: id.clone(),
        label: node_label(data).unwrap_or_else(|| "?".to_string()),
        children,
    }
}

/// `left`/`right` tree; a node with one child shows the other as `Empty`
pub fn binary_tree(root: &SerializedValue) -> TreeNode {
    tree_node(root, Branching::Binary, &mut Vec::new())
}

/// Tree whose nodes hold a `children` sequence
pub fn nary_tree(root: &SerializedValue) -> TreeNode {
    tree_node(root, Branching::Children, &mut Vec::new())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    /// The target was already expanded when this edge was found
    pub back: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphView {
    fn add_node(&mut self, known: &mut FxHashSet<String>, id: String, label: String) {
        if known.insert(id.clone()) {
            self.nodes.push(GraphNode { id, label });
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }
}

/// Graph from an adjacency mapping or from a node object with a neighbor
/// list. Returns `None` for anything else.
pub fn graph(value: &SerializedValue) -> Option<GraphView> {
    match value {
        SerializedValue::Mapping(map) if is_adjacency(map) => Some(adjacency_graph(map)),
        SerializedValue::Object { data, .. } if neighbor_field(data).is_some() => {
            Some(object_graph(value))
        }
        _ => None,
    }
}

fn adjacency_graph(map: &IndexMap<String, SerializedValue>) -> GraphView {
    let mut view = GraphView::default();
    let mut known = FxHashSet::default();
    for key in map.keys() {
        view.add_node(&mut known, key.clone(), key.clone());
    }
    for (key, neighbors) in map {
        for neighbor in neighbors.sequence_items().unwrap_or(&[]) {
            let to = label_text(neighbor);
            view.add_node(&mut known, to.clone(), to.clone());
            view.edges.push(GraphEdge {
                from: key.clone(),
                to,
                back: false,
            });
        }
    }
    view
}

fn object_graph(root: &SerializedValue) -> GraphView {
    let mut view = GraphView::default();
    let mut known = FxHashSet::default();
    let mut expanded: FxHashSet<&str> = FxHashSet::default();
    let mut queue = VecDeque::from([root]);

    while let Some(current) = queue.pop_front() {
        let SerializedValue::Object { id, class, data } = current else {
            continue;
        };
        if !expanded.insert(id.as_str()) {
            continue;
        }
        let label = node_label(data).unwrap_or_else(|| class.clone());
        view.add_node(&mut known, id.clone(), label);

        let neighbors = neighbor_field(data)
            .and_then(SerializedValue::collection_items)
            .unwrap_or(&[]);
        for neighbor in neighbors {
            match neighbor {
                SerializedValue::Cyclic { id: target } => view.edges.push(GraphEdge {
                    from: id.clone(),
                    to: target.clone(),
                    back: true,
                }),
                SerializedValue::Object { id: target, .. } => {
                    view.edges.push(GraphEdge {
                        from: id.clone(),
                        to: target.clone(),
                        back: expanded.contains(target.as_str()),
                    });
                    queue.push_back(neighbor);
                }
                other => {
                    let text = label_text(other);
                    let target = format!("value:{}", text);
                    view.add_node(&mut known, target.clone(), text);
                    view.edges.push(GraphEdge {
                        from: id.clone(),
                        to: target,
                        back: false,
                    });
                }
            }
        }
    }
    view
}

/// Positions for `count` nodes on a circle inside a `width` x `height`
/// canvas (y grows downward). Node `i` sits at `-90° + i/count · 360°`.
pub fn circular_layout(count: usize, width: f64, height: f64) -> Vec<(f64, f64)> {
    let (cx, cy) = (width / 2.0, height / 2.0);
    let radius = width.min(height) / 3.0;
    (0..count)
        .map(|i| {
            let angle = (i as f64 / count as f64) * 2.0 * PI - PI / 2.0;
            (cx + radius * angle.cos(), cy + radius * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(json: serde_json::Value) -> SerializedValue {
        SerializedValue::from(json)
    }

    fn node(id: &str, data: serde_json::Value) -> serde_json::Value {
        json!({"__type__": "object", "id": id, "class": "Node", "data": data})
    }

    #[test]
    fn test_linked_list_walk() {
        let head = value(node(
            "1",
            json!({"val": 1, "next": node("2", json!({"val": 2, "next": node("3", json!({"val": 3, "next": null}))}))}),
        ));
        let view = linked_list(&head);
        let labels: Vec<_> = view.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "3"]);
        assert_eq!(view.end, ListEnd::Null);
    }

    #[test]
    fn test_linked_list_cycle() {
        let head = value(node(
            "1",
            json!({"value": "a", "next": node("2", json!({"value": "b", "next": {"__type__": "cyclic", "id": "1"}}))}),
        ));
        let view = linked_list(&head);
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.end, ListEnd::Cycle { id: "1".into() });
    }

    #[test]
    fn test_binary_tree_empty_sides() {
        let root = value(node(
            "1",
            json!({"val": 5, "left": node("2", json!({"val": 3, "left": null, "right": null})), "right": null}),
        ));
        let tree = binary_tree(&root);
        assert_eq!(tree.node_count(), 2);
        match tree {
            TreeNode::Node { label, children, .. } => {
                assert_eq!(label, "5");
                assert_eq!(children.len(), 2);
                assert_eq!(children[1], TreeNode::Empty);
                assert!(matches!(&children[0], TreeNode::Node { children, .. } if children.is_empty()));
            }
            other => panic!("Expected node, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_subtree_is_not_a_cycle() {
        let shared = node("9", json!({"val": 0, "children": []}));
        let root = value(node("1", json!({"val": 1, "children": [shared.clone(), shared]})));
        assert_eq!(nary_tree(&root).node_count(), 3);
    }

    #[test]
    fn test_adjacency_graph() {
        let adjacency = value(json!({"A": ["B", "C"], "B": ["C"], "C": ["A"]}));
        let view = graph(&adjacency).unwrap();
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.edges.len(), 4);
        let c_to_a = view.edges.iter().find(|e| e.from == "C").unwrap();
        assert_eq!(c_to_a.to, "A");
        assert!(!c_to_a.back);
    }

    #[test]
    fn test_object_graph_bfs() {
        let c = node("3", json!({"val": "C", "neighbors": [{"__type__": "cyclic", "id": "1"}, 7]}));
        let b = node("2", json!({"val": "B", "neighbors": [c.clone()]}));
        let root = value(node("1", json!({"val": "A", "neighbors": [b, c]})));
        let view = graph(&root).unwrap();

        let labels: Vec<_> = view.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C", "7"]);
        // A→B, A→C, B→C, C→A, C→7; the second copy of C adds nothing
        assert_eq!(view.edges.len(), 5);
        let back: Vec<_> = view.edges.iter().filter(|e| e.back).collect();
        assert_eq!(back.len(), 1);
        assert_eq!((back[0].from.as_str(), back[0].to.as_str()), ("3", "1"));
    }

    #[test]
    fn test_circular_layout() {
        let points = circular_layout(4, 400.0, 300.0);
        assert_eq!(points.len(), 4);
        // First node straight above the center
        assert!((points[0].0 - 200.0).abs() < 1e-9);
        assert!((points[0].1 - 50.0).abs() < 1e-9);
        // Second node a quarter turn clockwise
        assert!((points[1].0 - 300.0).abs() < 1e-9);
        assert!((points[1].1 - 150.0).abs() < 1e-9);
    }
}
