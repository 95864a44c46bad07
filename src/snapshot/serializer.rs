//! Heap → [`SerializedValue`] conversion
//!
//! Two guards keep the output finite:
//! - **Cycles**: a container that is already on the path from the root to
//!   the current node is emitted as a `cyclic` marker. The guard is per path,
//!   not global, so a container reachable along two different paths (a DAG)
//!   is expanded on both.
//! - **Depth**: past `max_depth` nesting levels the value is replaced by the
//!   string `"..."`.
//!
//! Primitives never take part in cycle detection.

use super::value::SerializedValue;
use crate::memory::format::{format_float, py_str};
use crate::memory::heap::{Heap, HeapData};
use crate::memory::value::{ObjId, Value};
use indexmap::IndexMap;

/// Placeholder emitted past the depth limit
pub const DEPTH_ELIDED: &str = "...";

/// Containers between the root and the node being serialized
struct Path<'a> {
    id: ObjId,
    parent: Option<&'a Path<'a>>,
}

impl Path<'_> {
    fn contains(path: Option<&Path<'_>>, id: ObjId) -> bool {
        let mut current = path;
        while let Some(node) = current {
            if node.id == id {
                return true;
            }
            current = node.parent;
        }
        false
    }
}

pub struct Serializer<'h> {
    heap: &'h Heap,
    max_depth: usize,
}

impl<'h> Serializer<'h> {
    pub fn new(heap: &'h Heap, max_depth: usize) -> Self {
        Serializer { heap, max_depth }
    }

    /// Serialize one root value (each variable is its own root)
    pub fn serialize(&self, value: &Value) -> SerializedValue {
        self.serialize_at(value, 0, None)
    }

    fn serialize_at(&self, value: &Value, depth: usize, path: Option<&Path<'_>>) -> SerializedValue {
        if depth > self.max_depth {
            return SerializedValue::Str(DEPTH_ELIDED.to_string());
        }

        match value {
            Value::None => SerializedValue::None,
            Value::Bool(b) => SerializedValue::Bool(*b),
            Value::Int(n) => SerializedValue::Int(*n),
            Value::Float(f) => SerializedValue::Float(*f),
            Value::Str(s) => SerializedValue::Str(s.to_string()),
            Value::Builtin(_) => SerializedValue::Str(py_str(self.heap, value)),
            Value::Ref(id) => self.serialize_object(*id, value, depth, path),
        }
    }

    fn serialize_object(
        &self,
        id: ObjId,
        value: &Value,
        depth: usize,
        path: Option<&Path<'_>>,
    ) -> SerializedValue {
        if Path::contains(path, id) {
            return SerializedValue::Cyclic { id: id.to_string() };
        }

        let Some(data) = self.heap.get(id) else {
            tracing::warn!(id, "snapshot references a missing heap object");
            return SerializedValue::Str(format!("<Error: dangling reference {}>", id));
        };

        let here = Path { id, parent: path };
        let items = |values: &[Value]| self.serialize_all(values.iter(), depth, &here);

        match data {
            HeapData::List(list) if list.is_tracked() => SerializedValue::List {
                id: id.to_string(),
                items: items(&list.items),
            },
            HeapData::List(list) => SerializedValue::PlainList(items(&list.items)),
            HeapData::Tuple(values) => SerializedValue::Tuple(items(values)),
            HeapData::Set(set) => SerializedValue::Set(self.serialize_all(set.values(), depth, &here)),
            HeapData::Deque(values) => {
                SerializedValue::Deque(self.serialize_all(values.iter(), depth, &here))
            }
            HeapData::Dict(dict) => SerializedValue::Mapping(
                dict.entries
                    .values()
                    .map(|(key, val)| {
                        (
                            self.key_text(key),
                            self.serialize_at(val, depth + 1, Some(&here)),
                        )
                    })
                    .collect(),
            ),
            HeapData::Instance(instance) => {
                let data: IndexMap<String, SerializedValue> = instance
                    .fields
                    .iter()
                    .filter(|(name, _)| !name.starts_with("__"))
                    .map(|(name, val)| {
                        (
                            name.clone(),
                            self.serialize_at(val, depth + 1, Some(&here)),
                        )
                    })
                    .collect();
                SerializedValue::Object {
                    id: id.to_string(),
                    class: self.heap.class_name(instance.class),
                    data,
                }
            }
            // Ranges, functions, classes, modules: their string form
            _ => SerializedValue::Str(py_str(self.heap, value)),
        }
    }

    fn serialize_all<'v>(
        &self,
        values: impl Iterator<Item = &'v Value>,
        depth: usize,
        here: &Path<'_>,
    ) -> Vec<SerializedValue> {
        values
            .map(|v| self.serialize_at(v, depth + 1, Some(here)))
            .collect()
    }

    /// Mapping keys are stringified the way `str()` would render them
    fn key_text(&self, key: &Value) -> String {
        match key {
            Value::Float(f) => format_float(*f),
            other => py_str(self.heap, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::heap::{ClassObject, DictObject, Instance};
    use crate::memory::stack::Namespace;
    use crate::memory::tracked::AccessLog;

    fn node_class(heap: &mut Heap) -> ObjId {
        heap.alloc(HeapData::Class(ClassObject::new("Node", None)))
            .unwrap()
    }

    fn node(heap: &mut Heap, class: ObjId, val: i64) -> ObjId {
        let mut fields = Namespace::default();
        fields.insert("val".into(), Value::Int(val));
        fields.insert("next".into(), Value::None);
        heap.alloc(HeapData::Instance(Instance { class, fields }))
            .unwrap()
    }

    fn set_next(heap: &mut Heap, from: ObjId, to: ObjId) {
        if let Some(HeapData::Instance(inst)) = heap.get_mut(from) {
            inst.fields.insert("next".into(), Value::Ref(to));
        }
    }

    fn count_cyclic(value: &SerializedValue) -> usize {
        match value {
            SerializedValue::Cyclic { .. } => 1,
            SerializedValue::Object { data, .. } | SerializedValue::Mapping(data) => {
                data.values().map(count_cyclic).sum()
            }
            SerializedValue::List { items, .. }
            | SerializedValue::PlainList(items)
            | SerializedValue::Tuple(items)
            | SerializedValue::Set(items)
            | SerializedValue::Deque(items) => items.iter().map(count_cyclic).sum(),
            _ => 0,
        }
    }

    #[test]
    fn test_two_node_cycle_yields_one_marker() {
        let mut heap = Heap::new(100);
        let class = node_class(&mut heap);
        let a = node(&mut heap, class, 1);
        let b = node(&mut heap, class, 2);
        set_next(&mut heap, a, b);
        set_next(&mut heap, b, a);

        let out = Serializer::new(&heap, 10).serialize(&Value::Ref(a));
        assert_eq!(count_cyclic(&out), 1);

        let SerializedValue::Object { data, .. } = &out else {
            panic!("Expected object");
        };
        let SerializedValue::Object { data: inner, .. } = &data["next"] else {
            panic!("Expected nested object");
        };
        assert_eq!(inner["next"], SerializedValue::Cyclic { id: a.to_string() });
    }

    #[test]
    fn test_shared_child_is_expanded_on_both_paths() {
        let mut heap = Heap::new(100);
        let class = node_class(&mut heap);
        let shared = node(&mut heap, class, 3);
        let root = heap
            .alloc_list(vec![Value::Ref(shared), Value::Ref(shared)])
            .unwrap();

        let out = Serializer::new(&heap, 10).serialize(&root);
        let SerializedValue::PlainList(items) = out else {
            panic!("Expected plain list");
        };
        assert!(items.iter().all(|i| matches!(i, SerializedValue::Object { .. })));
        assert_eq!(count_cyclic(&SerializedValue::PlainList(items)), 0);
    }

    #[test]
    fn test_self_containing_list() {
        let mut heap = Heap::new(100);
        let log = AccessLog::new();
        let id = heap.alloc_tracked_list(vec![Value::Int(1)], &log).unwrap();
        if let Some(HeapData::List(list)) = heap.get_mut(id) {
            list.items.push(Value::Ref(id));
        }

        let out = Serializer::new(&heap, 10).serialize(&Value::Ref(id));
        assert_eq!(
            out,
            SerializedValue::List {
                id: id.to_string(),
                items: vec![
                    SerializedValue::Int(1),
                    SerializedValue::Cyclic { id: id.to_string() }
                ],
            }
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut heap = Heap::new(100);
        let mut value = Value::Int(0);
        for _ in 0..5 {
            value = heap.alloc_list(vec![value]).unwrap();
        }

        let out = Serializer::new(&heap, 2).serialize(&value);
        // depth 0 → 1 → 2 are lists, depth 3 is elided
        let SerializedValue::PlainList(l1) = out else { panic!() };
        let SerializedValue::PlainList(l2) = &l1[0] else { panic!() };
        let SerializedValue::PlainList(l3) = &l2[0] else { panic!() };
        assert_eq!(l3[0], SerializedValue::Str(DEPTH_ELIDED.to_string()));
    }

    #[test]
    fn test_dict_keys_are_stringified() {
        let mut heap = Heap::new(100);
        let mut dict = DictObject::default();
        let key = heap.hash_key(&Value::Int(1)).unwrap();
        dict.insert(key, Value::Int(1), Value::str("one"));
        let id = heap.alloc(HeapData::Dict(dict)).unwrap();

        let out = Serializer::new(&heap, 10).serialize(&Value::Ref(id));
        let SerializedValue::Mapping(map) = out else { panic!() };
        assert_eq!(map["1"], SerializedValue::Str("one".into()));
    }

    #[test]
    fn test_dunder_fields_are_hidden() {
        let mut heap = Heap::new(100);
        let class = node_class(&mut heap);
        let id = node(&mut heap, class, 1);
        if let Some(HeapData::Instance(inst)) = heap.get_mut(id) {
            inst.fields.insert("__secret".into(), Value::Int(0));
        }

        let out = Serializer::new(&heap, 10).serialize(&Value::Ref(id));
        let SerializedValue::Object { data, class, .. } = out else { panic!() };
        assert_eq!(class, "Node");
        assert!(!data.contains_key("__secret"));
    }
}
