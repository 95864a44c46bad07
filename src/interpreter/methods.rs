//! Methods of built-in types
//!
//! `lst.append(x)`, `d.get(k)`, `s.split()` and friends. Like the free
//! built-ins these are native and never fire statement boundaries. Receivers
//! are dispatched on their runtime type; [`has_method`] answers attribute
//! lookups such as `f = lst.append` without calling anything.
//!
//! Methods that hand back a view in the script language (`dict.keys()`,
//! `dict.items()`, ...) return a plain list here. Plain lists are never
//! access-tracked.

use crate::interpreter::builtins::{arity, KeywordArgs};
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::formatting::str_format;
use crate::interpreter::memory_ops::{slice_range, SliceBounds};
use crate::interpreter::LineHook;
use crate::memory::format::py_repr;
use crate::memory::heap::{DictObject, HeapData, SetObject};
use crate::memory::tracked::ListObject;
use crate::memory::value::{ObjId, Value};
use crate::parser::ast::SourceLocation;
use std::collections::VecDeque;
use std::rc::Rc;

const LIST_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "index", "count", "sort", "reverse", "clear",
    "copy",
];
const DICT_METHODS: &[&str] = &[
    "get", "keys", "values", "items", "pop", "setdefault", "update", "clear", "copy", "popitem",
];
const SET_METHODS: &[&str] = &[
    "add",
    "remove",
    "discard",
    "pop",
    "clear",
    "copy",
    "union",
    "intersection",
    "difference",
    "issubset",
    "issuperset",
    "update",
];
const DEQUE_METHODS: &[&str] = &[
    "append",
    "appendleft",
    "pop",
    "popleft",
    "extend",
    "extendleft",
    "clear",
    "rotate",
];
const TUPLE_METHODS: &[&str] = &["index", "count"];
const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "strip",
    "lstrip",
    "rstrip",
    "split",
    "join",
    "replace",
    "startswith",
    "endswith",
    "find",
    "rfind",
    "index",
    "count",
    "isdigit",
    "isalpha",
    "isalnum",
    "isspace",
    "isupper",
    "islower",
    "format",
    "title",
    "capitalize",
    "center",
    "ljust",
    "rjust",
    "zfill",
    "splitlines",
];

/// Whether values whose type is `type_name` have a native method `name`
pub(crate) fn has_method(type_name: &str, name: &str) -> bool {
    let table = match type_name {
        "list" => LIST_METHODS,
        "dict" | "defaultdict" => DICT_METHODS,
        "set" => SET_METHODS,
        "deque" => DEQUE_METHODS,
        "tuple" => TUPLE_METHODS,
        "str" => STR_METHODS,
        _ => return false,
    };
    table.contains(&name)
}

/// Byte offset → char offset
fn char_offset(s: &str, byte: usize) -> i64 {
    s[..byte].chars().count() as i64
}

/// `s[start:end]` by chars, with the char offset of the window
fn str_window(s: &str, start: Option<i64>, end: Option<i64>, location: SourceLocation) -> Result<(i64, String), RuntimeError> {
    let chars: Vec<char> = s.chars().collect();
    let range = slice_range(
        chars.len(),
        SliceBounds {
            lower: start,
            upper: end,
            step: None,
        },
        location,
    )?;
    let window = chars[range.start as usize..range.start as usize + range.len]
        .iter()
        .collect();
    Ok((range.start, window))
}

/// `str.split` without a separator: runs of whitespace, ends trimmed
fn split_whitespace(s: &str, maxsplit: i64) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if maxsplit >= 0 && parts.len() as i64 == maxsplit {
            parts.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_cased = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if previous_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            out.push(c);
            previous_cased = false;
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn zfill(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if width <= len {
        return s.to_string();
    }
    let zeros = "0".repeat(width - len);
    match s.chars().next() {
        Some(sign @ ('+' | '-')) => format!("{}{}{}", sign, zeros, &s[1..]),
        _ => format!("{}{}", zeros, s),
    }
}

/// Left and right padding of `str.center`
fn center_padding(len: usize, width: usize) -> (usize, usize) {
    let margin = width - len;
    let left = margin / 2 + (margin & width & 1);
    (left, margin - left)
}

fn is_cased_as(s: &str, upper: bool) -> bool {
    let has_upper = s.chars().any(char::is_uppercase);
    let has_lower = s.chars().any(char::is_lowercase);
    if upper {
        has_upper && !has_lower
    } else {
        has_lower && !has_upper
    }
}

impl<H: LineHook> Interpreter<H> {
    /// `receiver.name(args)` where the receiver is a built-in value
    pub(crate) fn call_builtin_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let kwargs = KeywordArgs::new(kwargs);
        if let Value::Str(s) = receiver {
            return self.str_method(s.clone(), name, args, kwargs, location);
        }
        let type_name = self.heap.type_name(receiver);
        let id = match receiver {
            Value::Ref(id) if has_method(&type_name, name) => *id,
            _ => {
                return Err(RuntimeError::attribute_error(
                    format!("'{}' object has no attribute '{}'", type_name, name),
                    location,
                ))
            }
        };
        match self.heap.get(id) {
            Some(HeapData::List(_)) => self.list_method(id, name, args, kwargs, location),
            Some(HeapData::Dict(_)) => self.dict_method(id, name, args, kwargs, location),
            Some(HeapData::Set(_)) => self.set_method(id, name, args, kwargs, location),
            Some(HeapData::Deque(_)) => self.deque_method(id, name, args, kwargs, location),
            Some(HeapData::Tuple(items)) => {
                let items = items.clone();
                kwargs.finish(name, location)?;
                self.sequence_search(&items, "tuple", name, args, location)
            }
            _ => Err(RuntimeError::attribute_error(
                format!("'{}' object has no attribute '{}'", type_name, name),
                location,
            )),
        }
    }

    fn list_mut(&mut self, id: ObjId) -> Option<&mut ListObject> {
        match self.heap.get_mut(id) {
            Some(HeapData::List(list)) => Some(list),
            _ => None,
        }
    }

    fn dict_mut(&mut self, id: ObjId) -> Option<&mut DictObject> {
        match self.heap.get_mut(id) {
            Some(HeapData::Dict(dict)) => Some(dict),
            _ => None,
        }
    }

    fn set_mut(&mut self, id: ObjId) -> Option<&mut SetObject> {
        match self.heap.get_mut(id) {
            Some(HeapData::Set(set)) => Some(set),
            _ => None,
        }
    }

    fn deque_mut(&mut self, id: ObjId) -> Option<&mut VecDeque<Value>> {
        match self.heap.get_mut(id) {
            Some(HeapData::Deque(items)) => Some(items),
            _ => None,
        }
    }

    fn int_param(&self, method: &str, value: &Value, location: SourceLocation) -> Result<i64, RuntimeError> {
        value.as_int().ok_or_else(|| {
            RuntimeError::type_error(
                format!(
                    "{}() argument must be int, not '{}'",
                    method,
                    self.heap.type_name(value)
                ),
                location,
            )
        })
    }

    /// Position of the first item equal to `needle`
    fn position_of(
        &mut self,
        items: &[Value],
        needle: &Value,
        location: SourceLocation,
    ) -> Result<Option<usize>, RuntimeError> {
        for (i, item) in items.iter().enumerate() {
            if self.values_eq(item, needle, location)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// `index` and `count`, shared by lists and tuples
    fn sequence_search(
        &mut self,
        items: &[Value],
        type_name: &str,
        name: &str,
        args: Vec<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match name {
            "index" => {
                arity(name, &args, 1, 1, location)?;
                match self.position_of(items, &args[0], location)? {
                    Some(i) => Ok(Value::Int(i as i64)),
                    None if type_name == "tuple" => Err(RuntimeError::value_error(
                        "tuple.index(x): x not in tuple",
                        location,
                    )),
                    None => Err(RuntimeError::value_error(
                        format!("{} is not in list", py_repr(&self.heap, &args[0])),
                        location,
                    )),
                }
            }
            "count" => {
                arity(name, &args, 1, 1, location)?;
                let mut count = 0;
                for item in items {
                    if self.values_eq(item, &args[0], location)? {
                        count += 1;
                    }
                }
                Ok(Value::Int(count))
            }
            _ => Err(RuntimeError::attribute_error(
                format!("'{}' object has no attribute '{}'", type_name, name),
                location,
            )),
        }
    }

    fn list_method(
        &mut self,
        id: ObjId,
        name: &str,
        args: Vec<Value>,
        mut kwargs: KeywordArgs,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if name == "sort" {
            if !args.is_empty() {
                return Err(RuntimeError::type_error(
                    "sort() takes no positional arguments",
                    location,
                ));
            }
            let key = kwargs.take("key");
            let reverse = kwargs
                .take("reverse")
                .map(|r| self.truthy(&r))
                .unwrap_or(false);
            kwargs.finish(name, location)?;

            let mut items = self
                .list_mut(id)
                .map(|list| std::mem::take(&mut list.items))
                .unwrap_or_default();
            let sorted = self.sort_values(&mut items, key, reverse, location);
            if let Some(list) = self.list_mut(id) {
                list.items = items;
            }
            return sorted.map(|_| Value::None);
        }
        kwargs.finish(name, location)?;

        match name {
            "append" => {
                arity(name, &args, 1, 1, location)?;
                let item = args.into_iter().next().unwrap_or_default();
                if let Some(list) = self.list_mut(id) {
                    list.items.push(item);
                }
                Ok(Value::None)
            }
            "extend" => {
                arity(name, &args, 1, 1, location)?;
                let items = self.collect_items(&args[0], location)?;
                if let Some(list) = self.list_mut(id) {
                    list.items.extend(items);
                }
                Ok(Value::None)
            }
            "insert" => {
                arity(name, &args, 2, 2, location)?;
                let index = self.int_param(name, &args[0], location)?;
                if let Some(list) = self.list_mut(id) {
                    let len = list.items.len() as i64;
                    let position = if index < 0 { (index + len).max(0) } else { index.min(len) };
                    list.items.insert(position as usize, args[1].clone());
                }
                Ok(Value::None)
            }
            "pop" => {
                arity(name, &args, 0, 1, location)?;
                let index = match args.first() {
                    Some(i) => self.int_param(name, i, location)?,
                    None => -1,
                };
                let Some(list) = self.list_mut(id) else {
                    return Ok(Value::None);
                };
                if list.items.is_empty() {
                    return Err(RuntimeError::index_error("pop from empty list", location));
                }
                match list.resolve(index) {
                    Some(i) => Ok(list.items.remove(i)),
                    None => Err(RuntimeError::index_error("pop index out of range", location)),
                }
            }
            "remove" => {
                arity(name, &args, 1, 1, location)?;
                let items = self.list_mut(id).map(|l| l.items.clone()).unwrap_or_default();
                match self.position_of(&items, &args[0], location)? {
                    Some(i) => {
                        if let Some(list) = self.list_mut(id) {
                            list.items.remove(i);
                        }
                        Ok(Value::None)
                    }
                    None => Err(RuntimeError::value_error(
                        "list.remove(x): x not in list",
                        location,
                    )),
                }
            }
            "index" | "count" => {
                let items = self.list_mut(id).map(|l| l.items.clone()).unwrap_or_default();
                self.sequence_search(&items, "list", name, args, location)
            }
            "reverse" => {
                arity(name, &args, 0, 0, location)?;
                if let Some(list) = self.list_mut(id) {
                    list.items.reverse();
                }
                Ok(Value::None)
            }
            "clear" => {
                arity(name, &args, 0, 0, location)?;
                if let Some(list) = self.list_mut(id) {
                    list.items.clear();
                }
                Ok(Value::None)
            }
            "copy" => {
                arity(name, &args, 0, 0, location)?;
                let items = self.list_mut(id).map(|l| l.items.clone()).unwrap_or_default();
                self.alloc_list(items, location)
            }
            _ => Err(RuntimeError::attribute_error(
                format!("'list' object has no attribute '{}'", name),
                location,
            )),
        }
    }

    fn dict_method(
        &mut self,
        id: ObjId,
        name: &str,
        args: Vec<Value>,
        kwargs: KeywordArgs,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if name == "update" {
            arity(name, &args, 0, 1, location)?;
            let mut incoming = DictObject::default();
            if let Some(source) = args.first() {
                self.dict_update(&mut incoming, source, location)?;
            }
            for (key, value) in kwargs.into_entries() {
                let hashed = self.hash_key(&Value::str(key.as_str()), location)?;
                incoming.insert(hashed, Value::str(key), value);
            }
            if let Some(dict) = self.dict_mut(id) {
                for (key, (original, value)) in incoming.entries {
                    dict.insert(key, original, value);
                }
            }
            return Ok(Value::None);
        }
        kwargs.finish(name, location)?;

        match name {
            "get" => {
                arity(name, &args, 1, 2, location)?;
                let key = self.hash_key(&args[0], location)?;
                let found = self.dict_mut(id).and_then(|d| d.get(&key).cloned());
                Ok(found.or_else(|| args.get(1).cloned()).unwrap_or_default())
            }
            "keys" | "values" | "items" => {
                arity(name, &args, 0, 0, location)?;
                let entries: Vec<(Value, Value)> = self
                    .dict_mut(id)
                    .map(|d| d.entries.values().cloned().collect())
                    .unwrap_or_default();
                let mut items = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    items.push(match name {
                        "keys" => key,
                        "values" => value,
                        _ => self.alloc_tuple(vec![key, value], location)?,
                    });
                }
                self.alloc_list(items, location)
            }
            "pop" => {
                arity(name, &args, 1, 2, location)?;
                let key = self.hash_key(&args[0], location)?;
                match (self.dict_mut(id).and_then(|d| d.remove(&key)), args.get(1)) {
                    (Some(value), _) => Ok(value),
                    (None, Some(default)) => Ok(default.clone()),
                    (None, None) => Err(RuntimeError::KeyError {
                        key: py_repr(&self.heap, &args[0]),
                        location,
                    }),
                }
            }
            "setdefault" => {
                arity(name, &args, 1, 2, location)?;
                let key = self.hash_key(&args[0], location)?;
                let default = args.get(1).cloned().unwrap_or_default();
                let Some(dict) = self.dict_mut(id) else {
                    return Ok(Value::None);
                };
                if let Some(existing) = dict.get(&key) {
                    return Ok(existing.clone());
                }
                dict.insert(key, args[0].clone(), default.clone());
                Ok(default)
            }
            "clear" => {
                arity(name, &args, 0, 0, location)?;
                if let Some(dict) = self.dict_mut(id) {
                    dict.entries.clear();
                }
                Ok(Value::None)
            }
            "copy" => {
                arity(name, &args, 0, 0, location)?;
                let copy = self.dict_mut(id).map(|d| d.clone()).unwrap_or_default();
                self.alloc(HeapData::Dict(copy), location)
            }
            "popitem" => {
                arity(name, &args, 0, 0, location)?;
                match self.dict_mut(id).and_then(|d| d.entries.pop()) {
                    Some((_, (key, value))) => self.alloc_tuple(vec![key, value], location),
                    None => Err(RuntimeError::KeyError {
                        key: "'popitem(): dictionary is empty'".to_string(),
                        location,
                    }),
                }
            }
            _ => Err(RuntimeError::attribute_error(
                format!("'dict' object has no attribute '{}'", name),
                location,
            )),
        }
    }

    fn set_method(
        &mut self,
        id: ObjId,
        name: &str,
        args: Vec<Value>,
        kwargs: KeywordArgs,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        kwargs.finish(name, location)?;
        match name {
            "add" | "remove" | "discard" => {
                arity(name, &args, 1, 1, location)?;
                let key = self.hash_key(&args[0], location)?;
                let Some(set) = self.set_mut(id) else {
                    return Ok(Value::None);
                };
                match name {
                    "add" => set.insert(key, args[0].clone()),
                    _ => {
                        if set.items.shift_remove(&key).is_none() && name == "remove" {
                            return Err(RuntimeError::KeyError {
                                key: py_repr(&self.heap, &args[0]),
                                location,
                            });
                        }
                    }
                }
                Ok(Value::None)
            }
            "pop" => {
                arity(name, &args, 0, 0, location)?;
                match self.set_mut(id).and_then(|s| s.items.shift_remove_index(0)) {
                    Some((_, value)) => Ok(value),
                    None => Err(RuntimeError::KeyError {
                        key: "'pop from an empty set'".to_string(),
                        location,
                    }),
                }
            }
            "clear" => {
                arity(name, &args, 0, 0, location)?;
                if let Some(set) = self.set_mut(id) {
                    set.items.clear();
                }
                Ok(Value::None)
            }
            "copy" => {
                arity(name, &args, 0, 0, location)?;
                let copy = self.set_mut(id).map(|s| s.clone()).unwrap_or_default();
                self.alloc(HeapData::Set(copy), location)
            }
            "union" | "intersection" | "difference" | "update" => {
                let mut result = self.set_mut(id).map(|s| s.clone()).unwrap_or_default();
                for other in &args {
                    let items = self.collect_items(other, location)?;
                    let other = self.build_set(items, location)?;
                    match name {
                        "union" | "update" => {
                            for (key, value) in other.items {
                                result.insert(key, value);
                            }
                        }
                        "intersection" => result.items.retain(|key, _| other.contains(key)),
                        _ => result.items.retain(|key, _| !other.contains(key)),
                    }
                }
                if name == "update" {
                    if let Some(set) = self.set_mut(id) {
                        *set = result;
                    }
                    return Ok(Value::None);
                }
                self.alloc(HeapData::Set(result), location)
            }
            "issubset" | "issuperset" => {
                arity(name, &args, 1, 1, location)?;
                let items = self.collect_items(&args[0], location)?;
                let other = self.build_set(items, location)?;
                let this = self.set_mut(id).map(|s| s.clone()).unwrap_or_default();
                let (small, large) = if name == "issubset" {
                    (&this, &other)
                } else {
                    (&other, &this)
                };
                Ok(Value::Bool(small.items.keys().all(|k| large.contains(k))))
            }
            _ => Err(RuntimeError::attribute_error(
                format!("'set' object has no attribute '{}'", name),
                location,
            )),
        }
    }

    fn deque_method(
        &mut self,
        id: ObjId,
        name: &str,
        args: Vec<Value>,
        kwargs: KeywordArgs,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        kwargs.finish(name, location)?;
        match name {
            "append" | "appendleft" => {
                arity(name, &args, 1, 1, location)?;
                if let Some(items) = self.deque_mut(id) {
                    if name == "append" {
                        items.push_back(args[0].clone());
                    } else {
                        items.push_front(args[0].clone());
                    }
                }
                Ok(Value::None)
            }
            "pop" | "popleft" => {
                arity(name, &args, 0, 0, location)?;
                let popped = self.deque_mut(id).and_then(|items| {
                    if name == "pop" {
                        items.pop_back()
                    } else {
                        items.pop_front()
                    }
                });
                popped.ok_or_else(|| RuntimeError::index_error("pop from an empty deque", location))
            }
            "extend" | "extendleft" => {
                arity(name, &args, 1, 1, location)?;
                let incoming = self.collect_items(&args[0], location)?;
                if let Some(items) = self.deque_mut(id) {
                    for item in incoming {
                        if name == "extend" {
                            items.push_back(item);
                        } else {
                            items.push_front(item);
                        }
                    }
                }
                Ok(Value::None)
            }
            "clear" => {
                arity(name, &args, 0, 0, location)?;
                if let Some(items) = self.deque_mut(id) {
                    items.clear();
                }
                Ok(Value::None)
            }
            "rotate" => {
                arity(name, &args, 0, 1, location)?;
                let n = match args.first() {
                    Some(n) => self.int_param(name, n, location)?,
                    None => 1,
                };
                if let Some(items) = self.deque_mut(id) {
                    if !items.is_empty() {
                        let len = items.len() as i64;
                        let shift = n.rem_euclid(len) as usize;
                        items.rotate_right(shift);
                    }
                }
                Ok(Value::None)
            }
            _ => Err(RuntimeError::attribute_error(
                format!("'deque' object has no attribute '{}'", name),
                location,
            )),
        }
    }

    fn str_param(&self, method: &str, value: &Value, location: SourceLocation) -> Result<Rc<str>, RuntimeError> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(RuntimeError::type_error(
                format!(
                    "{}() argument must be str, not {}",
                    method,
                    self.heap.type_name(other)
                ),
                location,
            )),
        }
    }

    fn optional_int_param(
        &self,
        method: &str,
        value: Option<&Value>,
        location: SourceLocation,
    ) -> Result<Option<i64>, RuntimeError> {
        match value {
            None | Some(Value::None) => Ok(None),
            Some(v) => self.int_param(method, v, location).map(Some),
        }
    }

    fn fill_char(&self, method: &str, value: Option<&Value>, location: SourceLocation) -> Result<char, RuntimeError> {
        let Some(value) = value else {
            return Ok(' ');
        };
        let fill = self.str_param(method, value, location)?;
        let mut chars = fill.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(RuntimeError::type_error(
                "The fill character must be exactly one character long",
                location,
            )),
        }
    }

    /// Prefixes for `startswith`/`endswith`: a string or a tuple of strings
    fn affixes(&self, method: &str, value: &Value, location: SourceLocation) -> Result<Vec<Rc<str>>, RuntimeError> {
        if let Some(HeapData::Tuple(items)) = self.heap.deref(value) {
            return items
                .iter()
                .map(|item| self.str_param(method, item, location))
                .collect();
        }
        self.str_param(method, value, location).map(|s| vec![s])
    }

    fn str_method(
        &mut self,
        s: Rc<str>,
        name: &str,
        args: Vec<Value>,
        mut kwargs: KeywordArgs,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        match name {
            "format" => {
                let text = str_format(&self.heap, &s, &args, &kwargs.into_entries(), location)?;
                return Ok(Value::str(text));
            }
            "split" => {
                arity(name, &args, 0, 2, location)?;
                let sep = kwargs.take("sep").or_else(|| args.first().cloned());
                let maxsplit = kwargs.take("maxsplit").or_else(|| args.get(1).cloned());
                kwargs.finish(name, location)?;
                let maxsplit = self.optional_int_param(name, maxsplit.as_ref(), location)?.unwrap_or(-1);
                let parts: Vec<String> = match sep {
                    None | Some(Value::None) => split_whitespace(&s, maxsplit),
                    Some(sep) => {
                        let sep = self.str_param(name, &sep, location)?;
                        if sep.is_empty() {
                            return Err(RuntimeError::value_error("empty separator", location));
                        }
                        if maxsplit < 0 {
                            s.split(&*sep).map(str::to_string).collect()
                        } else {
                            s.splitn(maxsplit as usize + 1, &*sep)
                                .map(str::to_string)
                                .collect()
                        }
                    }
                };
                let items = parts.into_iter().map(Value::str).collect();
                return self.alloc_list(items, location);
            }
            _ => kwargs.finish(name, location)?,
        }

        let text = |t: String| -> Result<Value, RuntimeError> { Ok(Value::str(t)) };
        match name {
            "upper" | "lower" | "title" | "capitalize" | "splitlines" | "isdigit" | "isalpha"
            | "isalnum" | "isspace" | "isupper" | "islower" => {
                arity(name, &args, 0, 0, location)?;
                match name {
                    "upper" => text(s.to_uppercase()),
                    "lower" => text(s.to_lowercase()),
                    "title" => text(title_case(&s)),
                    "capitalize" => text(capitalize(&s)),
                    "splitlines" => {
                        let items = s.lines().map(Value::str).collect();
                        self.alloc_list(items, location)
                    }
                    "isdigit" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))),
                    "isalpha" => Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic))),
                    "isalnum" => Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_alphanumeric))),
                    "isspace" => Ok(Value::Bool(!s.is_empty() && s.chars().all(char::is_whitespace))),
                    "isupper" => Ok(Value::Bool(is_cased_as(&s, true))),
                    _ => Ok(Value::Bool(is_cased_as(&s, false))),
                }
            }
            "strip" | "lstrip" | "rstrip" => {
                arity(name, &args, 0, 1, location)?;
                let chars = match args.first() {
                    None | Some(Value::None) => None,
                    Some(v) => Some(self.str_param(name, v, location)?),
                };
                let strip = |c: char| match &chars {
                    Some(set) => set.contains(c),
                    None => c.is_whitespace(),
                };
                let stripped = match name {
                    "strip" => s.trim_matches(strip),
                    "lstrip" => s.trim_start_matches(strip),
                    _ => s.trim_end_matches(strip),
                };
                text(stripped.to_string())
            }
            "join" => {
                arity(name, &args, 1, 1, location)?;
                let items = self.collect_items(&args[0], location)?;
                let mut parts = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::Str(part) => parts.push(part.to_string()),
                        other => {
                            return Err(RuntimeError::type_error(
                                format!(
                                    "sequence item {}: expected str instance, {} found",
                                    i,
                                    self.heap.type_name(other)
                                ),
                                location,
                            ))
                        }
                    }
                }
                text(parts.join(&*s))
            }
            "replace" => {
                arity(name, &args, 2, 3, location)?;
                let old = self.str_param(name, &args[0], location)?;
                let new = self.str_param(name, &args[1], location)?;
                let count = self.optional_int_param(name, args.get(2), location)?.unwrap_or(-1);
                if count < 0 {
                    text(s.replace(&*old, &new))
                } else {
                    text(s.replacen(&*old, &new, count as usize))
                }
            }
            "startswith" | "endswith" => {
                arity(name, &args, 1, 1, location)?;
                let affixes = self.affixes(name, &args[0], location)?;
                let hit = affixes.iter().any(|a| {
                    if name == "startswith" {
                        s.starts_with(&**a)
                    } else {
                        s.ends_with(&**a)
                    }
                });
                Ok(Value::Bool(hit))
            }
            "find" | "rfind" | "index" | "count" => {
                arity(name, &args, 1, 3, location)?;
                let needle = self.str_param(name, &args[0], location)?;
                let start = self.optional_int_param(name, args.get(1), location)?;
                let end = self.optional_int_param(name, args.get(2), location)?;
                let (offset, window) = str_window(&s, start, end, location)?;
                if name == "count" {
                    let count = if needle.is_empty() {
                        window.chars().count() + 1
                    } else {
                        window.matches(&*needle).count()
                    };
                    return Ok(Value::Int(count as i64));
                }
                let found = if name == "rfind" {
                    window.rfind(&*needle)
                } else {
                    window.find(&*needle)
                };
                match found {
                    Some(byte) => Ok(Value::Int(offset + char_offset(&window, byte))),
                    None if name == "index" => {
                        Err(RuntimeError::value_error("substring not found", location))
                    }
                    None => Ok(Value::Int(-1)),
                }
            }
            "center" | "ljust" | "rjust" | "zfill" => {
                let max = if name == "zfill" { 1 } else { 2 };
                arity(name, &args, 1, max, location)?;
                let width = self.int_param(name, &args[0], location)?.max(0) as usize;
                let len = s.chars().count();
                if name == "zfill" {
                    return text(zfill(&s, width));
                }
                let fill = self.fill_char(name, args.get(1), location)?;
                if width <= len {
                    return Ok(Value::Str(s));
                }
                let (left, right) = match name {
                    "center" => center_padding(len, width),
                    "ljust" => (0, width - len),
                    _ => (width - len, 0),
                };
                let pad = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
                text(format!("{}{}{}", pad(left), s, pad(right)))
            }
            _ => Err(RuntimeError::attribute_error(
                format!("'str' object has no attribute '{}'", name),
                location,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_tables() {
        assert!(has_method("list", "append"));
        assert!(has_method("defaultdict", "items"));
        assert!(!has_method("tuple", "append"));
        assert!(!has_method("int", "bit_length"));
    }

    #[test]
    fn test_split_whitespace_with_maxsplit() {
        assert_eq!(split_whitespace("  a  b c ", -1), vec!["a", "b", "c"]);
        assert_eq!(split_whitespace("a b  c d", 2), vec!["a", "b", "c d"]);
        assert!(split_whitespace("   ", -1).is_empty());
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(title_case("hello wORLD-x"), "Hello World-X");
        assert_eq!(capitalize("hELLO"), "Hello");
        assert!(is_cased_as("ABC1", true));
        assert!(!is_cased_as("123", false));
    }

    #[test]
    fn test_padding() {
        assert_eq!(zfill("-42", 5), "-0042");
        assert_eq!(zfill("7", 3), "007");
        // "abc".center(6) == " abc  ", "abc".center(7) == "  abc  "
        assert_eq!(center_padding(3, 6), (1, 2));
        assert_eq!(center_padding(3, 7), (2, 2));
    }
}
