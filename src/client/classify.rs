//! Shape classification by field-name probing.
//!
//! The probes form a priority list and the first match wins:
//!
//! 1. list, tuple or set: [`Shape::Array`]
//! 2. deque: [`Shape::Deque`]
//! 3. object with a `next` field: [`Shape::LinkedNode`]
//! 4. object with `left` or `right`: [`Shape::BinaryTree`]
//! 5. object with a `children` sequence: [`Shape::NTree`]
//! 6. object with `neighbors`, `adj` or `edges`, or a non-empty mapping
//!    whose values are all sequences: [`Shape::Graph`]
//! 7. any other mapping: [`Shape::Map`]
//! 8. scalars are [`Shape::Scalar`], everything else [`Shape::Unrenderable`]

use indexmap::IndexMap;

use crate::snapshot::SerializedValue;

pub const NEXT_KEY: &str = "next";
pub const LEFT_KEY: &str = "left";
pub const RIGHT_KEY: &str = "right";
pub const CHILDREN_KEY: &str = "children";
pub const NEIGHBOR_KEYS: [&str; 3] = ["neighbors", "adj", "edges"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Array,
    Deque,
    LinkedNode,
    BinaryTree,
    NTree,
    Graph,
    Map,
    Scalar,
    Unrenderable,
}

impl Shape {
    /// Whether the structures view draws this shape
    pub fn is_structural(self) -> bool {
        !matches!(self, Shape::Scalar | Shape::Unrenderable)
    }

    pub fn label(self) -> &'static str {
        match self {
            Shape::Array => "Array",
            Shape::Deque => "Deque",
            Shape::LinkedNode => "Linked List",
            Shape::BinaryTree => "Binary Tree",
            Shape::NTree => "Tree",
            Shape::Graph => "Graph",
            Shape::Map => "Map",
            Shape::Scalar => "Value",
            Shape::Unrenderable => "Opaque",
        }
    }
}

/// Adjacency-list form: `{"A": ["B", "C"], ...}`
pub fn is_adjacency(map: &IndexMap<String, SerializedValue>) -> bool {
    !map.is_empty() && map.values().all(|v| v.sequence_items().is_some())
}

/// The neighbor list of a graph-shaped object, from the first neighbor key
/// present
pub fn neighbor_field(data: &IndexMap<String, SerializedValue>) -> Option<&SerializedValue> {
    NEIGHBOR_KEYS.iter().find_map(|key| data.get(*key))
}

fn classify_object(data: &IndexMap<String, SerializedValue>) -> Shape {
    if data.contains_key(NEXT_KEY) {
        Shape::LinkedNode
    } else if data.contains_key(LEFT_KEY) || data.contains_key(RIGHT_KEY) {
        Shape::BinaryTree
    } else if data
        .get(CHILDREN_KEY)
        .is_some_and(|c| c.sequence_items().is_some())
    {
        Shape::NTree
    } else if neighbor_field(data).is_some() {
        Shape::Graph
    } else {
        Shape::Unrenderable
    }
}

pub fn classify(value: &SerializedValue) -> Shape {
    match value {
        SerializedValue::PlainList(_)
        | SerializedValue::List { .. }
        | SerializedValue::Tuple(_)
        | SerializedValue::Set(_) => Shape::Array,
        SerializedValue::Deque(_) => Shape::Deque,
        SerializedValue::Object { data, .. } => classify_object(data),
        SerializedValue::Mapping(map) if is_adjacency(map) => Shape::Graph,
        SerializedValue::Mapping(_) => Shape::Map,
        SerializedValue::Cyclic { .. } => Shape::Unrenderable,
        _ => Shape::Scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape(json: serde_json::Value) -> Shape {
        classify(&SerializedValue::from(json))
    }

    fn object(data: serde_json::Value) -> serde_json::Value {
        json!({"__type__": "object", "id": "1", "class": "N", "data": data})
    }

    #[test]
    fn test_sequences() {
        assert_eq!(shape(json!([1, 2])), Shape::Array);
        assert_eq!(shape(json!({"__type__": "list", "id": "2", "items": []})), Shape::Array);
        assert_eq!(shape(json!({"__type__": "deque", "items": [1]})), Shape::Deque);
        assert_eq!(shape(json!(5)), Shape::Scalar);
        assert_eq!(shape(json!(null)), Shape::Scalar);
    }

    #[test]
    fn test_probe_order() {
        // `next` wins over everything else
        assert_eq!(
            shape(object(json!({"next": null, "left": null, "neighbors": []}))),
            Shape::LinkedNode
        );
        assert_eq!(shape(object(json!({"right": null}))), Shape::BinaryTree);
        assert_eq!(shape(object(json!({"children": []}))), Shape::NTree);
        assert_eq!(shape(object(json!({"children": 3}))), Shape::Unrenderable);
        assert_eq!(shape(object(json!({"adj": []}))), Shape::Graph);
        assert_eq!(shape(object(json!({"x": 1}))), Shape::Unrenderable);
    }

    #[test]
    fn test_mappings() {
        assert_eq!(shape(json!({"A": ["B"], "B": []})), Shape::Graph);
        assert_eq!(shape(json!({"A": ["B"], "B": 2})), Shape::Map);
        assert_eq!(shape(json!({})), Shape::Map);
    }
}
