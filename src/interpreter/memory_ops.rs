//! Subscripts, slices and attributes
//!
//! This module provides the element- and field-level operations of the
//! interpreter:
//!
//! - Item access (`obj[i]`), assignment and deletion for every container
//! - Slicing (`obj[lo:hi:step]`) with the script language's clamping rules
//! - Attribute access on instances, classes, modules, `super()` and
//!   built-in values
//!
//! # Access tracking
//!
//! Only integer-index `get` and `set` on a tracked list are logged, and
//! both go through [`ListObject`](crate::memory::tracked::ListObject) so the
//! log entry is written before the operation runs. Slices, deletion and
//! negative-index normalization for deletion are not logged.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::methods::has_method;
use crate::interpreter::LineHook;
use crate::memory::format::py_repr;
use crate::memory::heap::{HeapData, RangeObject};
use crate::memory::value::{ObjId, Value};
use crate::parser::ast::{Expr, SourceLocation};

/// Evaluated `lo:hi:step`; `None` where the bound was omitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SliceBounds {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub step: Option<i64>,
}

/// Positions selected by a slice over a sequence of known length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SliceRange {
    pub start: i64,
    pub step: i64,
    pub len: usize,
}

impl SliceRange {
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..self.len).map(move |k| (self.start + k as i64 * self.step) as usize)
    }
}

/// Resolve slice bounds against a sequence of `len` items
pub(crate) fn slice_range(
    len: usize,
    bounds: SliceBounds,
    location: SourceLocation,
) -> Result<SliceRange, RuntimeError> {
    let len = len as i64;
    let step = bounds.step.unwrap_or(1);
    if step == 0 {
        return Err(RuntimeError::value_error(
            "slice step cannot be zero",
            location,
        ));
    }
    let clamp = |bound: i64| -> i64 {
        if bound < 0 {
            let adjusted = bound.saturating_add(len);
            if adjusted < 0 {
                if step < 0 {
                    -1
                } else {
                    0
                }
            } else {
                adjusted
            }
        } else if bound >= len {
            if step < 0 {
                len - 1
            } else {
                len
            }
        } else {
            bound
        }
    };
    let (default_start, default_stop) = if step > 0 { (0, len) } else { (len - 1, -1) };
    let start = bounds.lower.map(clamp).unwrap_or(default_start);
    let stop = bounds.upper.map(clamp).unwrap_or(default_stop);

    let count = if step > 0 && stop > start {
        (stop - start + step - 1) / step
    } else if step < 0 && start > stop {
        (start - stop - step - 1) / -step
    } else {
        0
    };
    Ok(SliceRange {
        start,
        step,
        len: count as usize,
    })
}

impl<H: LineHook> Interpreter<H> {
    pub(crate) fn eval_slice_bounds(
        &mut self,
        lower: &Option<Box<Expr>>,
        upper: &Option<Box<Expr>>,
        step: &Option<Box<Expr>>,
    ) -> Result<SliceBounds, RuntimeError> {
        Ok(SliceBounds {
            lower: self.eval_slice_bound(lower)?,
            upper: self.eval_slice_bound(upper)?,
            step: self.eval_slice_bound(step)?,
        })
    }

    fn eval_slice_bound(&mut self, bound: &Option<Box<Expr>>) -> Result<Option<i64>, RuntimeError> {
        let Some(expr) = bound else {
            return Ok(None);
        };
        match self.eval(expr)? {
            Value::None => Ok(None),
            value => value.as_int().map(Some).ok_or_else(|| {
                RuntimeError::type_error(
                    "slice indices must be integers or None or have an __index__ method",
                    expr.location(),
                )
            }),
        }
    }

    fn index_of(&self, container: &str, index: &Value, location: SourceLocation) -> Result<i64, RuntimeError> {
        index.as_int().ok_or_else(|| {
            RuntimeError::type_error(
                format!(
                    "{} indices must be integers or slices, not {}",
                    container,
                    self.heap.type_name(index)
                ),
                location,
            )
        })
    }

    fn key_error(&self, key: &Value, location: SourceLocation) -> RuntimeError {
        RuntimeError::KeyError {
            key: py_repr(&self.heap, key),
            location,
        }
    }

    fn not_subscriptable(&self, value: &Value, location: SourceLocation) -> RuntimeError {
        RuntimeError::type_error(
            format!("'{}' object is not subscriptable", self.heap.type_name(value)),
            location,
        )
    }

    /// `object[index]`
    pub(crate) fn get_item(
        &mut self,
        object: &Value,
        index: &Value,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let id = match object {
            Value::Str(s) => {
                let i = self.index_of("string", index, location)?;
                let len = s.chars().count() as i64;
                let position = if i < 0 { i + len } else { i };
                return usize::try_from(position)
                    .ok()
                    .and_then(|p| s.chars().nth(p))
                    .map(|c| Value::str(c.to_string()))
                    .ok_or_else(|| RuntimeError::index_error("string index out of range", location));
            }
            Value::Ref(id) => *id,
            other => return Err(self.not_subscriptable(other, location)),
        };

        match self.heap.get(id) {
            Some(HeapData::List(list)) => {
                let i = self.index_of("list", index, location)?;
                list.get(i)
                    .cloned()
                    .ok_or_else(|| RuntimeError::index_error("list index out of range", location))
            }
            Some(HeapData::Tuple(items)) => {
                let i = self.index_of("tuple", index, location)?;
                sequence_get(items.iter(), items.len(), i)
                    .ok_or_else(|| RuntimeError::index_error("tuple index out of range", location))
            }
            Some(HeapData::Deque(items)) => {
                let i = self.index_of("deque", index, location)?;
                sequence_get(items.iter(), items.len(), i)
                    .ok_or_else(|| RuntimeError::index_error("deque index out of range", location))
            }
            Some(HeapData::Range(range)) => {
                let i = self.index_of("range object", index, location)?;
                let position = if i < 0 { i + range.len() as i64 } else { i };
                usize::try_from(position)
                    .ok()
                    .and_then(|p| range.get(p))
                    .map(Value::Int)
                    .ok_or_else(|| {
                        RuntimeError::index_error("range object index out of range", location)
                    })
            }
            Some(HeapData::Dict(dict)) => {
                let key = self.hash_key(index, location)?;
                if let Some(value) = dict.get(&key) {
                    return Ok(value.clone());
                }
                let factory = dict.default_factory.clone().filter(|f| !f.is_none());
                let Some(factory) = factory else {
                    return Err(self.key_error(index, location));
                };
                let value = self.call_value(&factory, Vec::new(), Vec::new(), location)?;
                if let Some(HeapData::Dict(dict)) = self.heap.get_mut(id) {
                    dict.insert(key, index.clone(), value.clone());
                }
                Ok(value)
            }
            Some(HeapData::Instance(_)) => {
                match self.call_dunder(object, "__getitem__", vec![index.clone()], location)? {
                    Some(value) => Ok(value),
                    None => Err(self.not_subscriptable(object, location)),
                }
            }
            _ => Err(self.not_subscriptable(object, location)),
        }
    }

    /// `object[index] = value`
    pub(crate) fn set_item(
        &mut self,
        object: &Value,
        index: Value,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let Some(id) = object.as_ref_id() else {
            return Err(self.no_item_assignment(object, location));
        };
        match self.heap.get(id) {
            Some(HeapData::List(_)) => {
                let i = self.index_of("list", &index, location)?;
                let stored = match self.heap.get_mut(id) {
                    Some(HeapData::List(list)) => list.set(i, value),
                    _ => false,
                };
                if stored {
                    Ok(())
                } else {
                    Err(RuntimeError::index_error(
                        "list assignment index out of range",
                        location,
                    ))
                }
            }
            Some(HeapData::Deque(items)) => {
                let i = self.index_of("deque", &index, location)?;
                let len = items.len() as i64;
                let position = if i < 0 { i + len } else { i };
                match (usize::try_from(position).ok(), self.heap.get_mut(id)) {
                    (Some(p), Some(HeapData::Deque(items))) if p < items.len() => {
                        items[p] = value;
                        Ok(())
                    }
                    _ => Err(RuntimeError::index_error("deque index out of range", location)),
                }
            }
            Some(HeapData::Dict(_)) => {
                let key = self.hash_key(&index, location)?;
                if let Some(HeapData::Dict(dict)) = self.heap.get_mut(id) {
                    dict.insert(key, index, value);
                }
                Ok(())
            }
            Some(HeapData::Instance(_)) => {
                match self.call_dunder(object, "__setitem__", vec![index, value], location)? {
                    Some(_) => Ok(()),
                    None => Err(self.no_item_assignment(object, location)),
                }
            }
            _ => Err(self.no_item_assignment(object, location)),
        }
    }

    fn no_item_assignment(&self, object: &Value, location: SourceLocation) -> RuntimeError {
        RuntimeError::type_error(
            format!(
                "'{}' object does not support item assignment",
                self.heap.type_name(object)
            ),
            location,
        )
    }

    /// `del object[index]`
    pub(crate) fn del_item(
        &mut self,
        object: &Value,
        index: &Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let no_deletion = |this: &Self| {
            RuntimeError::type_error(
                format!(
                    "'{}' object doesn't support item deletion",
                    this.heap.type_name(object)
                ),
                location,
            )
        };
        let Some(id) = object.as_ref_id() else {
            return Err(no_deletion(self));
        };
        match self.heap.get(id) {
            Some(HeapData::List(_)) => {
                let i = self.index_of("list", index, location)?;
                let removed = match self.heap.get_mut(id) {
                    Some(HeapData::List(list)) => list.resolve(i).map(|p| list.items.remove(p)),
                    _ => None,
                };
                removed.map(|_| ()).ok_or_else(|| {
                    RuntimeError::index_error("list assignment index out of range", location)
                })
            }
            Some(HeapData::Deque(items)) => {
                let i = self.index_of("deque", index, location)?;
                let position = if i < 0 { i + items.len() as i64 } else { i };
                let removed = match (usize::try_from(position).ok(), self.heap.get_mut(id)) {
                    (Some(p), Some(HeapData::Deque(items))) => items.remove(p),
                    _ => None,
                };
                removed.map(|_| ()).ok_or_else(|| {
                    RuntimeError::index_error("deque index out of range", location)
                })
            }
            Some(HeapData::Dict(_)) => {
                let key = self.hash_key(index, location)?;
                let removed = match self.heap.get_mut(id) {
                    Some(HeapData::Dict(dict)) => dict.remove(&key),
                    _ => None,
                };
                removed
                    .map(|_| ())
                    .ok_or_else(|| self.key_error(index, location))
            }
            Some(HeapData::Instance(_)) => {
                match self.call_dunder(object, "__delitem__", vec![index.clone()], location)? {
                    Some(_) => Ok(()),
                    None => Err(no_deletion(self)),
                }
            }
            _ => Err(no_deletion(self)),
        }
    }

    /// `object[lo:hi:step]`: a new plain list, tuple, string or range
    pub(crate) fn get_slice(
        &mut self,
        object: &Value,
        bounds: SliceBounds,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if let Value::Str(s) = object {
            let chars: Vec<char> = s.chars().collect();
            let range = slice_range(chars.len(), bounds, location)?;
            let text: String = range.indices().map(|i| chars[i]).collect();
            return Ok(Value::str(text));
        }
        match self.heap.deref(object) {
            Some(HeapData::List(list)) => {
                let range = slice_range(list.len(), bounds, location)?;
                let items = range.indices().map(|i| list.items[i].clone()).collect();
                self.alloc_list(items, location)
            }
            Some(HeapData::Tuple(items)) => {
                let range = slice_range(items.len(), bounds, location)?;
                let picked = range.indices().map(|i| items[i].clone()).collect();
                self.alloc_tuple(picked, location)
            }
            Some(HeapData::Range(r)) => {
                let r = *r;
                let range = slice_range(r.len(), bounds, location)?;
                let start = r.start + range.start * r.step;
                let step = r.step * range.step;
                let sliced = RangeObject {
                    start,
                    stop: start + step * range.len as i64,
                    step,
                };
                self.alloc(HeapData::Range(sliced), location)
            }
            _ => Err(self.not_subscriptable(object, location)),
        }
    }

    fn list_id(&self, object: &Value, location: SourceLocation) -> Result<ObjId, RuntimeError> {
        match self.heap.deref(object) {
            Some(HeapData::List(_)) => object.as_ref_id().ok_or_else(|| self.no_item_assignment(object, location)),
            _ => Err(self.no_item_assignment(object, location)),
        }
    }

    /// `lst[lo:hi:step] = iterable`
    pub(crate) fn set_slice(
        &mut self,
        object: &Value,
        bounds: SliceBounds,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let id = self.list_id(object, location)?;
        let replacement = self.collect_items(&value, location)?;
        let Some(HeapData::List(list)) = self.heap.get_mut(id) else {
            return Ok(());
        };
        let range = slice_range(list.len(), bounds, location)?;
        if range.step == 1 {
            let start = range.start as usize;
            list.items
                .splice(start..start + range.len, replacement);
            return Ok(());
        }
        if replacement.len() != range.len {
            return Err(RuntimeError::value_error(
                format!(
                    "attempt to assign sequence of size {} to extended slice of size {}",
                    replacement.len(),
                    range.len
                ),
                location,
            ));
        }
        for (i, item) in range.indices().zip(replacement) {
            list.items[i] = item;
        }
        Ok(())
    }

    /// `del lst[lo:hi:step]`
    pub(crate) fn del_slice(
        &mut self,
        object: &Value,
        bounds: SliceBounds,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let id = self.list_id(object, location)?;
        let Some(HeapData::List(list)) = self.heap.get_mut(id) else {
            return Ok(());
        };
        let range = slice_range(list.len(), bounds, location)?;
        let mut doomed: Vec<usize> = range.indices().collect();
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for i in doomed {
            list.items.remove(i);
        }
        Ok(())
    }

    // ---- Attributes ----

    /// `object.name`
    pub(crate) fn get_attr(
        &mut self,
        object: &Value,
        name: &str,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let missing = |owner: String| {
            RuntimeError::attribute_error(format!("{} has no attribute '{}'", owner, name), location)
        };

        match self.heap.deref(object) {
            Some(HeapData::Instance(instance)) => {
                if let Some(value) = instance.fields.get(name) {
                    return Ok(value.clone());
                }
                let class = instance.class;
                if name == "__class__" {
                    return Ok(Value::Ref(class));
                }
                match self.heap.class_attr(class, name) {
                    Some(Value::Ref(function))
                        if matches!(self.heap.get(function), Some(HeapData::Function(_))) =>
                    {
                        self.alloc(
                            HeapData::BoundMethod {
                                receiver: object.clone(),
                                function,
                            },
                            location,
                        )
                    }
                    Some(value) => Ok(value),
                    None => Err(missing(
                        format!("'{}' object", self.heap.class_name(class)),
                    )),
                }
            }
            Some(HeapData::Class(class)) => {
                if name == "__name__" {
                    return Ok(Value::str(class.name.as_str()));
                }
                let class_name = class.name.clone();
                let id = object.as_ref_id().unwrap_or_default();
                self.heap
                    .class_attr(id, name)
                    .ok_or_else(|| missing(format!("type object '{}'", class_name)))
            }
            Some(HeapData::Module(module)) => module
                .attrs
                .get(name)
                .cloned()
                .ok_or_else(|| missing(format!("module '{}'", module.name))),
            Some(HeapData::Super { class, receiver }) => {
                let (class, receiver) = (*class, receiver.clone());
                let base = match self.heap.get(class) {
                    Some(HeapData::Class(c)) => c.base,
                    _ => None,
                };
                match base.and_then(|b| self.heap.class_attr(b, name)) {
                    Some(Value::Ref(function))
                        if matches!(self.heap.get(function), Some(HeapData::Function(_))) =>
                    {
                        self.alloc(HeapData::BoundMethod { receiver, function }, location)
                    }
                    Some(value) => Ok(value),
                    None if name == "__init__" => self.alloc(
                        HeapData::BuiltinMethod {
                            receiver,
                            name: name.into(),
                        },
                        location,
                    ),
                    None => Err(missing("'super' object".to_string())),
                }
            }
            Some(HeapData::Function(function)) if name == "__name__" => {
                Ok(Value::str(function.name.as_str()))
            }
            Some(HeapData::Exception { message, .. }) if name == "args" => {
                let args = if message.is_empty() {
                    Vec::new()
                } else {
                    vec![Value::str(message.as_str())]
                };
                self.alloc_tuple(args, location)
            }
            _ => {
                if let Value::Builtin(builtin) = object {
                    if name == "__name__" {
                        return Ok(Value::str(builtin.name()));
                    }
                }
                let type_name = self.heap.type_name(object);
                if has_method(&type_name, name) {
                    return self.alloc(
                        HeapData::BuiltinMethod {
                            receiver: object.clone(),
                            name: name.into(),
                        },
                        location,
                    );
                }
                Err(missing(format!("'{}' object", type_name)))
            }
        }
    }

    /// `object.name = value`
    pub(crate) fn set_attr(
        &mut self,
        object: &Value,
        name: &str,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if let Some(id) = object.as_ref_id() {
            match self.heap.get_mut(id) {
                Some(HeapData::Instance(instance)) => {
                    instance.fields.insert(name.to_string(), value);
                    return Ok(());
                }
                Some(HeapData::Class(class)) => {
                    class.attrs.insert(name.to_string(), value);
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(RuntimeError::attribute_error(
            format!(
                "'{}' object has no attribute '{}'",
                self.heap.type_name(object),
                name
            ),
            location,
        ))
    }

    /// `del object.name`
    pub(crate) fn del_attr(
        &mut self,
        object: &Value,
        name: &str,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let removed = match object.as_ref_id().and_then(|id| self.heap.get_mut(id)) {
            Some(HeapData::Instance(instance)) => instance.fields.shift_remove(name),
            Some(HeapData::Class(class)) => class.attrs.shift_remove(name),
            _ => None,
        };
        removed.map(|_| ()).ok_or_else(|| {
            RuntimeError::attribute_error(
                format!(
                    "'{}' object has no attribute '{}'",
                    self.heap.type_name(object),
                    name
                ),
                location,
            )
        })
    }
}

fn sequence_get<'a>(
    mut items: impl Iterator<Item = &'a Value>,
    len: usize,
    index: i64,
) -> Option<Value> {
    let position = if index < 0 { index + len as i64 } else { index };
    usize::try_from(position)
        .ok()
        .and_then(|p| items.nth(p))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(lower: Option<i64>, upper: Option<i64>, step: Option<i64>) -> SliceBounds {
        SliceBounds { lower, upper, step }
    }

    fn picked(len: usize, b: SliceBounds) -> Vec<usize> {
        slice_range(len, b, SourceLocation::default())
            .unwrap()
            .indices()
            .collect()
    }

    #[test]
    fn test_slice_defaults() {
        assert_eq!(picked(4, bounds(None, None, None)), vec![0, 1, 2, 3]);
        assert_eq!(picked(4, bounds(None, None, Some(-1))), vec![3, 2, 1, 0]);
        assert_eq!(picked(5, bounds(None, None, Some(2))), vec![0, 2, 4]);
    }

    #[test]
    fn test_slice_negative_and_clamped_bounds() {
        assert_eq!(picked(5, bounds(Some(-2), None, None)), vec![3, 4]);
        assert_eq!(picked(5, bounds(Some(1), Some(100), None)), vec![1, 2, 3, 4]);
        assert_eq!(picked(5, bounds(Some(-100), Some(2), None)), vec![0, 1]);
        assert_eq!(picked(5, bounds(Some(3), Some(1), None)), Vec::<usize>::new());
        assert_eq!(picked(5, bounds(Some(3), Some(0), Some(-1))), vec![3, 2, 1]);
    }

    #[test]
    fn test_slice_step_zero() {
        let err = slice_range(3, bounds(None, None, Some(0)), SourceLocation::default()).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: slice step cannot be zero");
    }

    #[test]
    fn test_empty_sequence_reverse() {
        assert_eq!(picked(0, bounds(None, None, Some(-1))), Vec::<usize>::new());
    }
}
