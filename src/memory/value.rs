//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents all runtime values
//! of a traced script. Immutable scalars are stored inline; everything with
//! identity (lists, dicts, instances, functions, ...) lives in the
//! [`Heap`](super::heap::Heap) and is referenced through [`Value::Ref`].
//!
//! # Value Types
//!
//! - [`Value::None`], [`Value::Bool`], [`Value::Int`], [`Value::Float`],
//!   [`Value::Str`]: scalars with value semantics
//! - [`Value::Ref`]: handle to a heap object (shared, mutable, has identity)
//! - [`Value::Builtin`]: a native function, type or exception class

use crate::interpreter::builtins::Builtin;
use std::rc::Rc;

/// Identity of a heap object. Allocation is monotonic, so the same script
/// with the same inputs always produces the same ids.
pub type ObjId = usize;

/// Runtime values in the interpreter
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Ref(ObjId),
    Builtin(Builtin),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Get the integer value (bools count as ints), returns None otherwise
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Numeric value as a float, for mixed int/float arithmetic
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<ObjId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }
}

/// Hashable projection of a value, used as the key of dicts and sets.
///
/// Numbers that compare equal hash equal (`1 == 1.0 == True`), tuples hash
/// structurally, and heap objects without value equality hash by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Int(i64),
    /// Non-integral float, stored by bit pattern
    Float(u64),
    Str(Rc<str>),
    Tuple(Vec<HashKey>),
    Identity(ObjId),
    Builtin(&'static str),
}
