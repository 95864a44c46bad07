//! Operators on runtime values
//!
//! Everything here works on values and the heap alone. Operators that may
//! dispatch to user-defined dunder methods go through the interpreter first
//! (see `expressions.rs`) and fall back to these.
//!
//! Integers are 64-bit. Results that do not fit raise `OverflowError`
//! instead of growing.

use crate::interpreter::errors::RuntimeError;
use crate::interpreter::formatting::percent_format;
use crate::memory::heap::{DictObject, Heap, HeapData, SetObject};
use crate::memory::value::{ObjId, Value};
use crate::parser::ast::{BinOp, SourceLocation, UnOp};
use std::cmp::Ordering;

/// Nesting limit for structural equality and ordering
const MAX_COMPARE_DEPTH: usize = 200;

pub fn truthy(heap: &Heap, value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Builtin(_) => true,
        Value::Ref(id) => match heap.get(*id) {
            Some(HeapData::List(list)) => !list.is_empty(),
            Some(HeapData::Tuple(items)) => !items.is_empty(),
            Some(HeapData::Dict(dict)) => !dict.is_empty(),
            Some(HeapData::Set(set)) => !set.is_empty(),
            Some(HeapData::Deque(items)) => !items.is_empty(),
            Some(HeapData::Range(range)) => !range.is_empty(),
            _ => true,
        },
    }
}

/// `a is b`
pub fn is_same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

/// `a == b`
pub fn values_equal(heap: &Heap, a: &Value, b: &Value) -> bool {
    equal_at(heap, a, b, 0)
}

fn equal_at(heap: &Heap, a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_COMPARE_DEPTH {
        return false;
    }
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Builtin(x), Value::Builtin(y)) => x == y,
        (Value::Ref(x), Value::Ref(y)) if x == y => true,
        (Value::Ref(x), Value::Ref(y)) => match (heap.get(*x), heap.get(*y)) {
            (Some(HeapData::List(l)), Some(HeapData::List(r))) => {
                seq_equal(heap, &l.items, &r.items, depth)
            }
            (Some(HeapData::Tuple(l)), Some(HeapData::Tuple(r))) => seq_equal(heap, l, r, depth),
            (Some(HeapData::Deque(l)), Some(HeapData::Deque(r))) => {
                l.len() == r.len()
                    && l.iter()
                        .zip(r.iter())
                        .all(|(x, y)| equal_at(heap, x, y, depth + 1))
            }
            (Some(HeapData::Dict(l)), Some(HeapData::Dict(r))) => {
                l.len() == r.len()
                    && l.entries.iter().all(|(key, (_, lv))| {
                        r.get(key)
                            .is_some_and(|rv| equal_at(heap, lv, rv, depth + 1))
                    })
            }
            (Some(HeapData::Set(l)), Some(HeapData::Set(r))) => {
                l.len() == r.len() && l.items.keys().all(|k| r.contains(k))
            }
            (Some(HeapData::Range(l)), Some(HeapData::Range(r))) => {
                l.len() == r.len() && (l.is_empty() || (l.start == r.start && l.get(1) == r.get(1)))
            }
            _ => false,
        },
        _ if a.is_numeric() && b.is_numeric() => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_float() == b.as_float(),
        },
        _ => false,
    }
}

fn seq_equal(heap: &Heap, a: &[Value], b: &[Value], depth: usize) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| equal_at(heap, x, y, depth + 1))
}

/// Ordering for `<`, `<=`, `>`, `>=`. `Ok(None)` means unordered (NaN), so
/// every comparison is false.
pub fn compare(
    heap: &Heap,
    a: &Value,
    b: &Value,
    symbol: &str,
    location: SourceLocation,
) -> Result<Option<Ordering>, RuntimeError> {
    compare_at(heap, a, b, symbol, location, 0)
}

fn compare_at(
    heap: &Heap,
    a: &Value,
    b: &Value,
    symbol: &str,
    location: SourceLocation,
    depth: usize,
) -> Result<Option<Ordering>, RuntimeError> {
    if depth > MAX_COMPARE_DEPTH {
        return Err(RuntimeError::RecursionLimit { location });
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        _ if a.is_numeric() && b.is_numeric() => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => Ok(Some(x.cmp(&y))),
            _ => {
                let x = a.as_float().unwrap_or(f64::NAN);
                let y = b.as_float().unwrap_or(f64::NAN);
                Ok(x.partial_cmp(&y))
            }
        },
        (Value::Ref(x), Value::Ref(y)) => {
            let pair = match (heap.get(*x), heap.get(*y)) {
                (Some(HeapData::List(l)), Some(HeapData::List(r))) => Some((&l.items[..], &r.items[..])),
                (Some(HeapData::Tuple(l)), Some(HeapData::Tuple(r))) => Some((&l[..], &r[..])),
                _ => None,
            };
            match pair {
                Some((left, right)) => {
                    for (l, r) in left.iter().zip(right.iter()) {
                        if !equal_at(heap, l, r, depth + 1) {
                            return compare_at(heap, l, r, symbol, location, depth + 1);
                        }
                    }
                    Ok(Some(left.len().cmp(&right.len())))
                }
                None => Err(not_orderable(heap, a, b, symbol, location)),
            }
        }
        _ => Err(not_orderable(heap, a, b, symbol, location)),
    }
}

fn not_orderable(
    heap: &Heap,
    a: &Value,
    b: &Value,
    symbol: &str,
    location: SourceLocation,
) -> RuntimeError {
    RuntimeError::type_error(
        format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            heap.type_name(a),
            heap.type_name(b)
        ),
        location,
    )
}

/// `item in container`
pub fn contains(
    heap: &Heap,
    container: &Value,
    item: &Value,
    location: SourceLocation,
) -> Result<bool, RuntimeError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(RuntimeError::type_error(
                format!(
                    "'in <string>' requires string as left operand, not {}",
                    heap.type_name(other)
                ),
                location,
            )),
        },
        Value::Ref(id) => match heap.get(*id) {
            Some(HeapData::List(list)) => Ok(any_equal(heap, list.items.iter(), item)),
            Some(HeapData::Tuple(items)) => Ok(any_equal(heap, items.iter(), item)),
            Some(HeapData::Deque(items)) => Ok(any_equal(heap, items.iter(), item)),
            Some(HeapData::Dict(dict)) => {
                let key = heap
                    .hash_key(item)
                    .map_err(|e| RuntimeError::from_heap(e, location))?;
                Ok(dict.entries.contains_key(&key))
            }
            Some(HeapData::Set(set)) => {
                let key = heap
                    .hash_key(item)
                    .map_err(|e| RuntimeError::from_heap(e, location))?;
                Ok(set.contains(&key))
            }
            Some(HeapData::Range(range)) => Ok(match item {
                Value::Float(f) if f.fract() == 0.0 => range.contains(*f as i64),
                other => other.as_int().is_some_and(|n| range.contains(n)),
            }),
            _ => Err(not_iterable(heap, container, location)),
        },
        _ => Err(not_iterable(heap, container, location)),
    }
}

fn any_equal<'a>(heap: &Heap, mut values: impl Iterator<Item = &'a Value>, item: &Value) -> bool {
    values.any(|v| is_same(v, item) || values_equal(heap, v, item))
}

pub fn not_iterable(heap: &Heap, value: &Value, location: SourceLocation) -> RuntimeError {
    RuntimeError::type_error(
        format!("'{}' object is not iterable", heap.type_name(value)),
        location,
    )
}

fn overflow(location: SourceLocation) -> RuntimeError {
    RuntimeError::Overflow {
        message: "integer result out of range".to_string(),
        location,
    }
}

fn zero_division(message: &str, location: SourceLocation) -> RuntimeError {
    RuntimeError::DivisionByZero {
        message: message.to_string(),
        location,
    }
}

/// Binary arithmetic, bitwise, sequence and set operators
pub fn binary(
    heap: &mut Heap,
    op: BinOp,
    left: &Value,
    right: &Value,
    location: SourceLocation,
) -> Result<Value, RuntimeError> {
    if let (Value::Bool(x), Value::Bool(y)) = (left, right) {
        match op {
            BinOp::BitAnd => return Ok(Value::Bool(x & y)),
            BinOp::BitOr => return Ok(Value::Bool(x | y)),
            BinOp::BitXor => return Ok(Value::Bool(x ^ y)),
            _ => {}
        }
    }

    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_binary(op, a, b, location);
    }

    if left.is_numeric() && right.is_numeric() {
        let a = left.as_float().unwrap_or(f64::NAN);
        let b = right.as_float().unwrap_or(f64::NAN);
        if let Some(result) = float_binary(op, a, b, location)? {
            return Ok(result);
        }
        return Err(unsupported(heap, op, left, right, location));
    }

    match (left, right) {
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => {
            Ok(Value::str(format!("{}{}", a, b)))
        }
        (Value::Str(s), n) | (n, Value::Str(s)) if op == BinOp::Mul && n.as_int().is_some() => {
            let times = usize::try_from(n.as_int().unwrap_or(0)).unwrap_or(0);
            Ok(Value::str(s.repeat(times)))
        }
        (Value::Str(template), args) if op == BinOp::Mod => {
            percent_format(heap, template, args, location).map(Value::str)
        }
        (Value::Ref(a), Value::Ref(b)) => {
            container_binary(heap, op, *a, *b, location)?
                .ok_or_else(|| unsupported(heap, op, left, right, location))
        }
        (Value::Ref(id), n) | (n, Value::Ref(id)) if op == BinOp::Mul && n.as_int().is_some() => {
            let times = usize::try_from(n.as_int().unwrap_or(0)).unwrap_or(0);
            repeat_sequence(heap, *id, times, location)?
                .ok_or_else(|| unsupported(heap, op, left, right, location))
        }
        _ => Err(unsupported(heap, op, left, right, location)),
    }
}

fn int_binary(op: BinOp, a: i64, b: i64, location: SourceLocation) -> Result<Value, RuntimeError> {
    let result = match op {
        BinOp::Add => a.checked_add(b).ok_or_else(|| overflow(location))?,
        BinOp::Sub => a.checked_sub(b).ok_or_else(|| overflow(location))?,
        BinOp::Mul => a.checked_mul(b).ok_or_else(|| overflow(location))?,
        BinOp::Div => {
            if b == 0 {
                return Err(zero_division("division by zero", location));
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(zero_division("integer division or modulo by zero", location));
            }
            floor_div(a, b).ok_or_else(|| overflow(location))?
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(zero_division("integer modulo by zero", location));
            }
            floor_mod(a, b)
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(zero_division(
                        "0.0 cannot be raised to a negative power",
                        location,
                    ));
                }
                return Ok(Value::Float((a as f64).powf(b as f64)));
            }
            let exp = u32::try_from(b).map_err(|_| overflow(location))?;
            a.checked_pow(exp).ok_or_else(|| overflow(location))?
        }
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Shl => {
            if b < 0 {
                return Err(RuntimeError::value_error("negative shift count", location));
            }
            if a == 0 {
                0
            } else if b >= 63 {
                return Err(overflow(location));
            } else {
                let shifted = a << b;
                if shifted >> b != a {
                    return Err(overflow(location));
                }
                shifted
            }
        }
        BinOp::Shr => {
            if b < 0 {
                return Err(RuntimeError::value_error("negative shift count", location));
            }
            if b >= 64 {
                if a < 0 {
                    -1
                } else {
                    0
                }
            } else {
                a >> b
            }
        }
    };
    Ok(Value::Int(result))
}

/// Floor division rounding toward negative infinity
pub fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

/// Modulo taking the sign of the divisor
pub fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a.wrapping_rem(b);
    if r != 0 && ((r < 0) != (b < 0)) {
        r + b
    } else {
        r
    }
}

fn float_binary(
    op: BinOp,
    a: f64,
    b: f64,
    location: SourceLocation,
) -> Result<Option<Value>, RuntimeError> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(zero_division("float division by zero", location));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero_division("float floor division by zero", location));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(zero_division("float modulo", location));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(zero_division(
                    "0.0 cannot be raised to a negative power",
                    location,
                ));
            }
            a.powf(b)
        }
        _ => return Ok(None),
    };
    Ok(Some(Value::Float(result)))
}

fn container_binary(
    heap: &mut Heap,
    op: BinOp,
    a: ObjId,
    b: ObjId,
    location: SourceLocation,
) -> Result<Option<Value>, RuntimeError> {
    let alloc_err = |e| RuntimeError::from_heap(e, location);
    let data = match (heap.get(a), heap.get(b), op) {
        (Some(HeapData::List(l)), Some(HeapData::List(r)), BinOp::Add) => {
            let mut items = l.items.clone();
            items.extend(r.items.iter().cloned());
            return heap.alloc_list(items).map(Some).map_err(alloc_err);
        }
        (Some(HeapData::Tuple(l)), Some(HeapData::Tuple(r)), BinOp::Add) => {
            let mut items = l.clone();
            items.extend(r.iter().cloned());
            HeapData::Tuple(items)
        }
        (Some(HeapData::Deque(l)), Some(HeapData::Deque(r)), BinOp::Add) => {
            let mut items = l.clone();
            items.extend(r.iter().cloned());
            HeapData::Deque(items)
        }
        (Some(HeapData::Set(l)), Some(HeapData::Set(r)), _) => {
            let mut out = SetObject::default();
            match op {
                BinOp::BitOr => {
                    for (k, v) in l.items.iter().chain(r.items.iter()) {
                        out.insert(k.clone(), v.clone());
                    }
                }
                BinOp::BitAnd => {
                    for (k, v) in l.items.iter().filter(|(k, _)| r.contains(k)) {
                        out.insert(k.clone(), v.clone());
                    }
                }
                BinOp::Sub => {
                    for (k, v) in l.items.iter().filter(|(k, _)| !r.contains(k)) {
                        out.insert(k.clone(), v.clone());
                    }
                }
                BinOp::BitXor => {
                    for (k, v) in l.items.iter().filter(|(k, _)| !r.contains(k)) {
                        out.insert(k.clone(), v.clone());
                    }
                    for (k, v) in r.items.iter().filter(|(k, _)| !l.contains(k)) {
                        out.insert(k.clone(), v.clone());
                    }
                }
                _ => return Ok(None),
            }
            HeapData::Set(out)
        }
        (Some(HeapData::Dict(l)), Some(HeapData::Dict(r)), BinOp::BitOr) => {
            let mut out = DictObject {
                entries: l.entries.clone(),
                default_factory: l.default_factory.clone(),
            };
            for (k, (orig, v)) in &r.entries {
                out.insert(k.clone(), orig.clone(), v.clone());
            }
            HeapData::Dict(out)
        }
        _ => return Ok(None),
    };
    heap.alloc(data).map(|id| Some(Value::Ref(id))).map_err(alloc_err)
}

fn repeat_sequence(
    heap: &mut Heap,
    id: ObjId,
    times: usize,
    location: SourceLocation,
) -> Result<Option<Value>, RuntimeError> {
    let repeat = |items: &[Value]| -> Vec<Value> {
        let mut out = Vec::with_capacity(items.len() * times);
        for _ in 0..times {
            out.extend(items.iter().cloned());
        }
        out
    };
    let result = match heap.get(id) {
        Some(HeapData::List(list)) => {
            if list.len().saturating_mul(times) > MAX_REPEAT {
                return Err(repeat_too_large(location));
            }
            let items = repeat(&list.items);
            heap.alloc_list(items)
        }
        Some(HeapData::Tuple(items)) => {
            if items.len().saturating_mul(times) > MAX_REPEAT {
                return Err(repeat_too_large(location));
            }
            let items = repeat(items);
            heap.alloc_tuple(items)
        }
        _ => return Ok(None),
    };
    result
        .map(Some)
        .map_err(|e| RuntimeError::from_heap(e, location))
}

/// Largest sequence a repetition may produce
const MAX_REPEAT: usize = 10_000_000;

fn repeat_too_large(location: SourceLocation) -> RuntimeError {
    RuntimeError::OutOfMemory {
        message: "repeated sequence is too large".to_string(),
        location,
    }
}

fn unsupported(
    heap: &Heap,
    op: BinOp,
    left: &Value,
    right: &Value,
    location: SourceLocation,
) -> RuntimeError {
    let (lt, rt) = (heap.type_name(left), heap.type_name(right));
    let message = match (op, lt.as_str()) {
        (BinOp::Add, "str") | (BinOp::Add, "list") | (BinOp::Add, "tuple") => format!(
            "can only concatenate {} (not \"{}\") to {}",
            lt, rt, lt
        ),
        _ => format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            lt,
            rt
        ),
    };
    RuntimeError::type_error(message, location)
}

/// Unary operators
pub fn unary(
    heap: &Heap,
    op: UnOp,
    value: &Value,
    location: SourceLocation,
) -> Result<Value, RuntimeError> {
    let bad_operand = |symbol: &str| {
        RuntimeError::type_error(
            format!(
                "bad operand type for unary {}: '{}'",
                symbol,
                heap.type_name(value)
            ),
            location,
        )
    };
    match op {
        UnOp::Not => Ok(Value::Bool(!truthy(heap, value))),
        UnOp::Neg => match value {
            Value::Float(f) => Ok(Value::Float(-f)),
            other => match other.as_int() {
                Some(n) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| overflow(location)),
                None => Err(bad_operand("-")),
            },
        },
        UnOp::Pos => match value {
            Value::Float(f) => Ok(Value::Float(*f)),
            other => other.as_int().map(Value::Int).ok_or_else(|| bad_operand("+")),
        },
        UnOp::BitNot => value
            .as_int()
            .map(|n| Value::Int(!n))
            .ok_or_else(|| bad_operand("~")),
    }
}

/// Python-style `(a // b, a % b)` on numbers
pub fn divmod(
    left: &Value,
    right: &Value,
    location: SourceLocation,
) -> Result<(Value, Value), RuntimeError> {
    match (left.as_int(), right.as_int()) {
        (Some(a), Some(b)) => Ok((
            int_binary(BinOp::FloorDiv, a, b, location)?,
            int_binary(BinOp::Mod, a, b, location)?,
        )),
        _ => {
            let (a, b) = (
                left.as_float().unwrap_or(f64::NAN),
                right.as_float().unwrap_or(f64::NAN),
            );
            let q = float_binary(BinOp::FloorDiv, a, b, location)?.unwrap_or(Value::None);
            let r = float_binary(BinOp::Mod, a, b, location)?.unwrap_or(Value::None);
            Ok((q, r))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 1)
    }

    fn eval(op: BinOp, a: Value, b: Value) -> Result<Value, RuntimeError> {
        let mut heap = Heap::new(100);
        binary(&mut heap, op, &a, &b, loc())
    }

    #[test]
    fn test_floor_division_and_modulo_follow_divisor_sign() {
        assert_eq!(eval(BinOp::FloorDiv, Value::Int(-7), Value::Int(2)), Ok(Value::Int(-4)));
        assert_eq!(eval(BinOp::Mod, Value::Int(-7), Value::Int(2)), Ok(Value::Int(1)));
        assert_eq!(eval(BinOp::Mod, Value::Int(7), Value::Int(-2)), Ok(Value::Int(-1)));
        assert_eq!(
            eval(BinOp::Mod, Value::Float(-1.0), Value::Float(3.0)),
            Ok(Value::Float(2.0))
        );
    }

    #[test]
    fn test_true_division_returns_float() {
        assert_eq!(eval(BinOp::Div, Value::Int(7), Value::Int(2)), Ok(Value::Float(3.5)));
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval(BinOp::Div, Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = eval(BinOp::Mul, Value::Int(i64::MAX), Value::Int(2)).unwrap_err();
        assert!(matches!(err, RuntimeError::Overflow { .. }));
        assert_eq!(eval(BinOp::Pow, Value::Int(2), Value::Int(10)), Ok(Value::Int(1024)));
        assert_eq!(eval(BinOp::Pow, Value::Int(2), Value::Int(-1)), Ok(Value::Float(0.5)));
    }

    #[test]
    fn test_bools_are_numbers() {
        assert_eq!(eval(BinOp::Add, Value::Bool(true), Value::Int(1)), Ok(Value::Int(2)));
        assert_eq!(
            eval(BinOp::BitOr, Value::Bool(true), Value::Bool(false)),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(
            eval(BinOp::Add, Value::str("ab"), Value::str("c")),
            Ok(Value::str("abc"))
        );
        assert_eq!(eval(BinOp::Mul, Value::Int(3), Value::str("x")), Ok(Value::str("xxx")));
        let err = eval(BinOp::Add, Value::str("a"), Value::Int(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: can only concatenate str (not \"int\") to str"
        );
    }

    #[test]
    fn test_list_concatenation_is_a_new_list() {
        let mut heap = Heap::new(100);
        let a = heap.alloc_list(vec![Value::Int(1)]).unwrap();
        let b = heap.alloc_list(vec![Value::Int(2)]).unwrap();
        let c = binary(&mut heap, BinOp::Add, &a, &b, loc()).unwrap();

        assert!(!is_same(&a, &c));
        match heap.deref(&c) {
            Some(HeapData::List(list)) => assert_eq!(list.items, vec![Value::Int(1), Value::Int(2)]),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_equality() {
        let mut heap = Heap::new(100);
        let a = heap.alloc_list(vec![Value::Int(1), Value::str("x")]).unwrap();
        let b = heap.alloc_list(vec![Value::Float(1.0), Value::str("x")]).unwrap();
        let t = heap.alloc_tuple(vec![Value::Int(1), Value::str("x")]).unwrap();

        assert!(values_equal(&heap, &a, &b));
        assert!(!values_equal(&heap, &a, &t));
        assert!(values_equal(&heap, &Value::Bool(true), &Value::Int(1)));
    }

    #[test]
    fn test_ordering() {
        let mut heap = Heap::new(100);
        let a = heap.alloc_tuple(vec![Value::Int(1), Value::Int(2)]).unwrap();
        let b = heap.alloc_tuple(vec![Value::Int(1), Value::Int(3)]).unwrap();

        assert_eq!(compare(&heap, &a, &b, "<", loc()), Ok(Some(Ordering::Less)));
        assert_eq!(
            compare(&heap, &Value::Float(f64::NAN), &Value::Int(1), "<", loc()),
            Ok(None)
        );
        let err = compare(&heap, &Value::Int(1), &Value::str("a"), "<", loc()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: '<' not supported between instances of 'int' and 'str'"
        );
    }

    #[test]
    fn test_contains() {
        let mut heap = Heap::new(100);
        let list = heap.alloc_list(vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(contains(&heap, &list, &Value::Int(2), loc()), Ok(true));
        assert_eq!(
            contains(&heap, &Value::str("hello"), &Value::str("ell"), loc()),
            Ok(true)
        );
        assert!(contains(&heap, &Value::Int(1), &Value::Int(1), loc()).is_err());
    }

    #[test]
    fn test_unary() {
        let heap = Heap::new(1);
        assert_eq!(unary(&heap, UnOp::Neg, &Value::Int(3), loc()), Ok(Value::Int(-3)));
        assert_eq!(unary(&heap, UnOp::Not, &Value::str(""), loc()), Ok(Value::Bool(true)));
        assert_eq!(unary(&heap, UnOp::BitNot, &Value::Int(0), loc()), Ok(Value::Int(-1)));
        assert!(unary(&heap, UnOp::Neg, &Value::str("a"), loc()).is_err());
    }
}
