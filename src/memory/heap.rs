//! Object heap for the interpreter
//!
//! Every value with identity is stored here and referenced by [`ObjId`]:
//! - Containers: lists (optionally access-tracked), tuples, dicts, sets,
//!   deques and lazy ranges
//! - User-defined classes and their instances
//! - Functions, bound methods and imported modules
//!
//! Objects are never freed during a run. Ids are indices into the arena, so
//! they are dense, deterministic across replays, and cheap to compare for
//! `is` and for cycle detection.

use super::stack::{Namespace, Scope};
use super::tracked::{AccessLog, ListObject};
use super::value::{HashKey, ObjId, Value};
use crate::interpreter::builtins::Builtin;
use crate::parser::ast::{Expr, Stmt};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::collections::VecDeque;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised by heap operations; converted to runtime errors by the
/// interpreter
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HeapError {
    #[error("object limit of {limit} exceeded")]
    Exhausted { limit: usize },

    #[error("unhashable type: '{0}'")]
    Unhashable(String),
}

/// Dict storage: insertion-ordered, keyed by hash projection, keeping the
/// original key value for iteration
#[derive(Debug, Clone, Default)]
pub struct DictObject {
    pub entries: IndexMap<HashKey, (Value, Value), FxBuildHasher>,
    /// Factory called on missing keys (`collections.defaultdict`)
    pub default_factory: Option<Value>,
}

impl DictObject {
    pub fn get(&self, key: &HashKey) -> Option<&Value> {
        self.entries.get(key).map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: HashKey, original: Value, value: Value) {
        match self.entries.get_mut(&key) {
            Some(slot) => slot.1 = value,
            None => {
                self.entries.insert(key, (original, value));
            }
        }
    }

    pub fn remove(&mut self, key: &HashKey) -> Option<Value> {
        self.entries.shift_remove(key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.values().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Set storage (insertion-ordered for deterministic output)
#[derive(Debug, Clone, Default)]
pub struct SetObject {
    pub items: IndexMap<HashKey, Value, FxBuildHasher>,
}

impl SetObject {
    pub fn insert(&mut self, key: HashKey, value: Value) {
        self.items.entry(key).or_insert(value);
    }

    pub fn contains(&self, key: &HashKey) -> bool {
        self.items.contains_key(key)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// `range(start, stop, step)`; step is never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeObject {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeObject {
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            self.stop.saturating_sub(self.start)
        } else {
            self.start.saturating_sub(self.stop)
        };
        if span <= 0 {
            return 0;
        }
        let step = self.step.unsigned_abs();
        ((span.unsigned_abs() + step - 1) / step) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index < self.len() {
            Some(self.start + self.step * index as i64)
        } else {
            None
        }
    }

    pub fn contains(&self, n: i64) -> bool {
        let in_bounds = if self.step > 0 {
            n >= self.start && n < self.stop
        } else {
            n <= self.start && n > self.stop
        };
        in_bounds && (n - self.start) % self.step == 0
    }
}

/// Code of a user function: a statement block, or a lambda's expression
#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Rc<[Stmt]>),
    Lambda(Rc<Expr>),
}

#[derive(Debug, Clone)]
pub struct FunctionObject {
    pub name: String,
    pub params: Vec<String>,
    /// Evaluated defaults for the trailing parameters
    pub defaults: Vec<Value>,
    pub body: FunctionBody,
    /// Enclosing function scope, captured at definition time
    pub closure: Option<Rc<Scope>>,
    /// Class whose body defined this function; `super()` resolves from it
    pub owner: Option<ObjId>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct ClassObject {
    pub name: String,
    pub base: Option<ObjId>,
    /// Built-in exception class this class derives from, if any
    pub builtin_base: Option<Builtin>,
    pub attrs: Namespace,
}

impl ClassObject {
    pub fn new(name: impl Into<String>, base: Option<ObjId>) -> Self {
        ClassObject {
            name: name.into(),
            base,
            builtin_base: None,
            attrs: Namespace::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub class: ObjId,
    pub fields: Namespace,
}

#[derive(Debug, Clone)]
pub struct ModuleObject {
    pub name: String,
    pub attrs: Namespace,
}

/// A heap object
#[derive(Debug, Clone)]
pub enum HeapData {
    List(ListObject),
    Tuple(Vec<Value>),
    Dict(DictObject),
    Set(SetObject),
    Deque(VecDeque<Value>),
    Range(RangeObject),
    Instance(Instance),
    Class(ClassObject),
    Function(Rc<FunctionObject>),
    /// `obj.method` for a user-defined method
    BoundMethod { receiver: Value, function: ObjId },
    /// `obj.method` for a method of a built-in type (e.g. `lst.append`)
    BuiltinMethod { receiver: Value, name: Rc<str> },
    Module(ModuleObject),
    /// `super()`: attribute lookup starts above `class`, binds to `receiver`
    Super { class: ObjId, receiver: Value },
    /// Instance of a built-in exception class, created by `ValueError(...)`
    Exception { kind: &'static str, message: String },
}

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    objects: Vec<HeapData>,
    max_objects: usize,
}

impl Heap {
    /// Create a new heap with a maximum object count
    pub fn new(max_objects: usize) -> Self {
        Heap {
            objects: Vec::new(),
            max_objects,
        }
    }

    /// Allocate an object
    pub fn alloc(&mut self, data: HeapData) -> Result<ObjId, HeapError> {
        if self.objects.len() >= self.max_objects {
            return Err(HeapError::Exhausted {
                limit: self.max_objects,
            });
        }
        self.objects.push(data);
        Ok(self.objects.len() - 1)
    }

    /// Allocate a list that reports integer-index access to `log`
    pub fn alloc_tracked_list(
        &mut self,
        items: Vec<Value>,
        log: &AccessLog,
    ) -> Result<ObjId, HeapError> {
        let id = self.objects.len();
        self.alloc(HeapData::List(ListObject::tracked(items, id, log.clone())))
    }

    pub fn alloc_list(&mut self, items: Vec<Value>) -> Result<Value, HeapError> {
        self.alloc(HeapData::List(ListObject::plain(items)))
            .map(Value::Ref)
    }

    pub fn alloc_tuple(&mut self, items: Vec<Value>) -> Result<Value, HeapError> {
        self.alloc(HeapData::Tuple(items)).map(Value::Ref)
    }

    pub fn get(&self, id: ObjId) -> Option<&HeapData> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: ObjId) -> Option<&mut HeapData> {
        self.objects.get_mut(id)
    }

    /// Dereference a value to its heap object, if it is a reference
    pub fn deref(&self, value: &Value) -> Option<&HeapData> {
        value.as_ref_id().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Type name as the script would see it via `type(x).__name__`
    pub fn type_name(&self, value: &Value) -> String {
        match value {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Builtin(b) if b.is_type() => "type".to_string(),
            Value::Builtin(_) => "builtin_function_or_method".to_string(),
            Value::Ref(id) => match self.get(*id) {
                Some(HeapData::List(_)) => "list".to_string(),
                Some(HeapData::Tuple(_)) => "tuple".to_string(),
                Some(HeapData::Dict(d)) if d.default_factory.is_some() => {
                    "defaultdict".to_string()
                }
                Some(HeapData::Dict(_)) => "dict".to_string(),
                Some(HeapData::Set(_)) => "set".to_string(),
                Some(HeapData::Deque(_)) => "deque".to_string(),
                Some(HeapData::Range(_)) => "range".to_string(),
                Some(HeapData::Instance(inst)) => self.class_name(inst.class),
                Some(HeapData::Class(_)) => "type".to_string(),
                Some(HeapData::Function(_)) => "function".to_string(),
                Some(HeapData::BoundMethod { .. }) => "method".to_string(),
                Some(HeapData::BuiltinMethod { .. }) => {
                    "builtin_function_or_method".to_string()
                }
                Some(HeapData::Module(_)) => "module".to_string(),
                Some(HeapData::Super { .. }) => "super".to_string(),
                Some(HeapData::Exception { kind, .. }) => kind.to_string(),
                None => "object".to_string(),
            },
        }
    }

    pub fn class_name(&self, class: ObjId) -> String {
        match self.get(class) {
            Some(HeapData::Class(c)) => c.name.clone(),
            _ => "object".to_string(),
        }
    }

    /// Functions, classes, methods and modules: values the tracer leaves
    /// out of variable snapshots
    pub fn is_callable_or_type(&self, value: &Value) -> bool {
        match value {
            Value::Builtin(_) => true,
            Value::Ref(id) => matches!(
                self.get(*id),
                Some(
                    HeapData::Function(_)
                        | HeapData::Class(_)
                        | HeapData::BoundMethod { .. }
                        | HeapData::BuiltinMethod { .. }
                        | HeapData::Module(_)
                )
            ),
            _ => false,
        }
    }

    /// Look up an attribute on a class, walking the base-class chain
    pub fn class_attr(&self, class: ObjId, name: &str) -> Option<Value> {
        let mut current = Some(class);
        // Bounded by the number of objects, so a malformed chain cannot loop
        for _ in 0..self.objects.len() {
            let Some(HeapData::Class(c)) = current.and_then(|id| self.get(id)) else {
                return None;
            };
            if let Some(v) = c.attrs.get(name) {
                return Some(v.clone());
            }
            current = c.base;
        }
        None
    }

    /// Whether `class` is `ancestor` or derives from it
    pub fn is_subclass(&self, class: ObjId, ancestor: ObjId) -> bool {
        let mut current = Some(class);
        for _ in 0..self.objects.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => match self.get(id) {
                    Some(HeapData::Class(c)) => current = c.base,
                    _ => return false,
                },
                None => return false,
            }
        }
        false
    }

    /// Built-in exception class that `class` ultimately derives from
    pub fn exception_base(&self, class: ObjId) -> Option<Builtin> {
        let mut current = Some(class);
        for _ in 0..self.objects.len() {
            let Some(HeapData::Class(c)) = current.and_then(|id| self.get(id)) else {
                return None;
            };
            if c.builtin_base.is_some() {
                return c.builtin_base;
            }
            current = c.base;
        }
        None
    }

    /// Hash projection used for dict keys and set members
    pub fn hash_key(&self, value: &Value) -> Result<HashKey, HeapError> {
        match value {
            Value::None => Ok(HashKey::None),
            Value::Bool(b) => Ok(HashKey::Int(i64::from(*b))),
            Value::Int(n) => Ok(HashKey::Int(*n)),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 9.2e18 {
                    Ok(HashKey::Int(*f as i64))
                } else {
                    Ok(HashKey::Float(f.to_bits()))
                }
            }
            Value::Str(s) => Ok(HashKey::Str(s.clone())),
            Value::Builtin(b) => Ok(HashKey::Builtin(b.name())),
            Value::Ref(id) => match self.get(*id) {
                Some(HeapData::Tuple(items)) => items
                    .iter()
                    .map(|item| self.hash_key(item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(HashKey::Tuple),
                Some(HeapData::List(_) | HeapData::Dict(_) | HeapData::Set(_) | HeapData::Deque(_)) => {
                    Err(HeapError::Unhashable(self.type_name(value)))
                }
                _ => Ok(HashKey::Identity(*id)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut heap = Heap::new(10);
        let a = heap.alloc(HeapData::Tuple(vec![])).unwrap();
        let b = heap.alloc(HeapData::Tuple(vec![])).unwrap();
        assert_eq!((a, b), (0, 1));
    }

    #[test]
    fn test_object_limit() {
        let mut heap = Heap::new(1);
        heap.alloc(HeapData::Tuple(vec![])).unwrap();
        assert_eq!(
            heap.alloc(HeapData::Tuple(vec![])),
            Err(HeapError::Exhausted { limit: 1 })
        );
    }

    #[test]
    fn test_tracked_list_knows_its_id() {
        let mut heap = Heap::new(10);
        heap.alloc(HeapData::Tuple(vec![])).unwrap();
        let log = AccessLog::new();
        let id = heap
            .alloc_tracked_list(vec![Value::Int(1)], &log)
            .unwrap();

        if let Some(HeapData::List(list)) = heap.get(id) {
            list.get(0);
        }
        assert_eq!(log.drain()[0].container_id, id.to_string());
    }

    #[test]
    fn test_range_len_and_contains() {
        let r = RangeObject {
            start: 10,
            stop: 0,
            step: -3,
        };
        assert_eq!(r.len(), 4); // 10, 7, 4, 1
        assert_eq!(r.get(3), Some(1));
        assert!(r.contains(7));
        assert!(!r.contains(0));

        let empty = RangeObject {
            start: 5,
            stop: 5,
            step: 1,
        };
        assert!(empty.is_empty());
    }

    #[test]
    fn test_numeric_keys_unify() {
        let heap = Heap::new(10);
        assert_eq!(
            heap.hash_key(&Value::Bool(true)).unwrap(),
            heap.hash_key(&Value::Float(1.0)).unwrap()
        );
    }

    #[test]
    fn test_lists_are_unhashable() {
        let mut heap = Heap::new(10);
        let list = heap.alloc_list(vec![]).unwrap();
        assert_eq!(
            heap.hash_key(&list),
            Err(HeapError::Unhashable("list".to_string()))
        );
    }

    #[test]
    fn test_class_attr_walks_bases() {
        let mut heap = Heap::new(10);
        let mut animal = ClassObject::new("Animal", None);
        animal
            .attrs
            .insert("kind".to_string(), Value::str("animal"));
        let base = heap.alloc(HeapData::Class(animal)).unwrap();
        let derived = heap
            .alloc(HeapData::Class(ClassObject::new("Dog", Some(base))))
            .unwrap();

        assert_eq!(heap.class_attr(derived, "kind"), Some(Value::str("animal")));
        assert!(heap.is_subclass(derived, base));
        assert!(!heap.is_subclass(base, derived));
    }
}
