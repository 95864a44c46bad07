//! Built-in function implementations
//!
//! Built-ins are native: they run inside the interpreter and never fire
//! statement boundaries. [`Builtin`] names every native callable, including
//! the built-in types (`int`, `list`, ...), the exception classes and the
//! functions of the importable modules (`math`, `collections`, `heapq`).
//!
//! All built-ins are implemented as methods on the [`Interpreter`] struct.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::formatting::format_value;
use crate::interpreter::ops;
use crate::interpreter::LineHook;
use crate::memory::heap::{DictObject, HeapData, RangeObject, SetObject};
use crate::memory::value::Value;
use crate::parser::ast::{BinOp, SourceLocation};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Exception classes available as built-in names
pub const EXCEPTION_KINDS: &[&str] = &[
    "Exception",
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "IndexError",
    "KeyError",
    "LookupError",
    "NameError",
    "NotImplementedError",
    "OverflowError",
    "RecursionError",
    "RuntimeError",
    "StopIteration",
    "TypeError",
    "ValueError",
    "ZeroDivisionError",
];

/// A native function, type or exception class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Input,
    Len,
    Range,
    Abs,
    Min,
    Max,
    Sum,
    Sorted,
    Reversed,
    Enumerate,
    Zip,
    Map,
    Filter,
    Any,
    All,
    Round,
    Repr,
    Isinstance,
    Hasattr,
    Getattr,
    Ord,
    Chr,
    Divmod,
    Pow,
    Hex,
    Bin,
    Oct,
    Format,
    Super,

    // Types
    Int,
    Float,
    Str,
    Bool,
    List,
    Dict,
    Set,
    Tuple,
    Object,
    Type,
    NoneType,
    Exception(&'static str),

    // math
    MathSqrt,
    MathFloor,
    MathCeil,
    MathGcd,
    MathLog,
    MathLog2,
    MathLog10,
    MathFabs,
    MathIsqrt,
    MathFactorial,
    MathPow,

    // collections
    Deque,
    DefaultDict,

    // heapq
    HeapPush,
    HeapPop,
    Heapify,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Input => "input",
            Builtin::Len => "len",
            Builtin::Range => "range",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Sorted => "sorted",
            Builtin::Reversed => "reversed",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::Map => "map",
            Builtin::Filter => "filter",
            Builtin::Any => "any",
            Builtin::All => "all",
            Builtin::Round => "round",
            Builtin::Repr => "repr",
            Builtin::Isinstance => "isinstance",
            Builtin::Hasattr => "hasattr",
            Builtin::Getattr => "getattr",
            Builtin::Ord => "ord",
            Builtin::Chr => "chr",
            Builtin::Divmod => "divmod",
            Builtin::Pow => "pow",
            Builtin::Hex => "hex",
            Builtin::Bin => "bin",
            Builtin::Oct => "oct",
            Builtin::Format => "format",
            Builtin::Super => "super",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Str => "str",
            Builtin::Bool => "bool",
            Builtin::List => "list",
            Builtin::Dict => "dict",
            Builtin::Set => "set",
            Builtin::Tuple => "tuple",
            Builtin::Object => "object",
            Builtin::Type => "type",
            Builtin::NoneType => "NoneType",
            Builtin::Exception(kind) => kind,
            Builtin::MathSqrt => "sqrt",
            Builtin::MathFloor => "floor",
            Builtin::MathCeil => "ceil",
            Builtin::MathGcd => "gcd",
            Builtin::MathLog => "log",
            Builtin::MathLog2 => "log2",
            Builtin::MathLog10 => "log10",
            Builtin::MathFabs => "fabs",
            Builtin::MathIsqrt => "isqrt",
            Builtin::MathFactorial => "factorial",
            Builtin::MathPow => "pow",
            Builtin::Deque => "deque",
            Builtin::DefaultDict => "defaultdict",
            Builtin::HeapPush => "heappush",
            Builtin::HeapPop => "heappop",
            Builtin::Heapify => "heapify",
        }
    }

    /// Whether this is a class (`type(x)` can return it)
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Builtin::Int
                | Builtin::Float
                | Builtin::Str
                | Builtin::Bool
                | Builtin::List
                | Builtin::Dict
                | Builtin::Set
                | Builtin::Tuple
                | Builtin::Object
                | Builtin::Type
                | Builtin::NoneType
                | Builtin::Range
                | Builtin::Deque
                | Builtin::DefaultDict
                | Builtin::Exception(_)
        )
    }

    /// Resolve a name in the built-in namespace
    pub fn lookup(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "print" => Builtin::Print,
            "input" => Builtin::Input,
            "len" => Builtin::Len,
            "range" => Builtin::Range,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "sum" => Builtin::Sum,
            "sorted" => Builtin::Sorted,
            "reversed" => Builtin::Reversed,
            "enumerate" => Builtin::Enumerate,
            "zip" => Builtin::Zip,
            "map" => Builtin::Map,
            "filter" => Builtin::Filter,
            "any" => Builtin::Any,
            "all" => Builtin::All,
            "round" => Builtin::Round,
            "repr" => Builtin::Repr,
            "isinstance" => Builtin::Isinstance,
            "hasattr" => Builtin::Hasattr,
            "getattr" => Builtin::Getattr,
            "ord" => Builtin::Ord,
            "chr" => Builtin::Chr,
            "divmod" => Builtin::Divmod,
            "pow" => Builtin::Pow,
            "hex" => Builtin::Hex,
            "bin" => Builtin::Bin,
            "oct" => Builtin::Oct,
            "format" => Builtin::Format,
            "super" => Builtin::Super,
            "int" => Builtin::Int,
            "float" => Builtin::Float,
            "str" => Builtin::Str,
            "bool" => Builtin::Bool,
            "list" => Builtin::List,
            "dict" => Builtin::Dict,
            "set" => Builtin::Set,
            "tuple" => Builtin::Tuple,
            "object" => Builtin::Object,
            "type" => Builtin::Type,
            other => {
                return EXCEPTION_KINDS
                    .iter()
                    .find(|kind| **kind == other)
                    .map(|kind| Builtin::Exception(kind))
            }
        };
        Some(builtin)
    }
}

/// Keyword arguments of a native call, consumed by name
#[derive(Debug, Default)]
pub(crate) struct KeywordArgs {
    entries: Vec<(String, Value)>,
}

impl KeywordArgs {
    pub(crate) fn new(entries: Vec<(String, Value)>) -> Self {
        KeywordArgs { entries }
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<Value> {
        let position = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(position).1)
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }

    /// Reject whatever keywords are left
    pub(crate) fn finish(&self, func: &str, location: SourceLocation) -> Result<(), RuntimeError> {
        match self.entries.first() {
            None => Ok(()),
            Some((name, _)) => Err(RuntimeError::type_error(
                format!("{}() got an unexpected keyword argument '{}'", func, name),
                location,
            )),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Check the positional argument count of a native call
pub(crate) fn arity(
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
    location: SourceLocation,
) -> Result<(), RuntimeError> {
    let given = args.len();
    if (min..=max).contains(&given) {
        return Ok(());
    }
    let expected = if min == max {
        match min {
            0 => "no arguments".to_string(),
            1 => "exactly one argument".to_string(),
            n => format!("exactly {} arguments", n),
        }
    } else if given < min {
        format!("at least {} argument{}", min, plural(min))
    } else {
        format!("at most {} argument{}", max, plural(max))
    };
    Err(RuntimeError::type_error(
        format!("{}() takes {} ({} given)", name, expected, given),
        location,
    ))
}

/// `round(f, n)`: decimal formatting is correctly rounded, so ties are
/// decided on the exact binary value (`round(2.675, 2) == 2.67`)
fn round_float(f: f64, n: i64) -> f64 {
    if !f.is_finite() {
        return f;
    }
    if n >= 0 {
        let places = usize::try_from(n.min(340)).unwrap_or(340);
        return format!("{:.*}", places, f).parse().unwrap_or(f);
    }
    let factor = 10f64.powi(i32::try_from(-n).unwrap_or(i32::MAX).min(400));
    if !factor.is_finite() {
        return 0.0 * f;
    }
    (f / factor).round_ties_even() * factor
}

/// `round(i, n)` for negative `n`: nearest multiple of `10**-n`, ties to even
fn round_int(i: i64, n: i64, location: SourceLocation) -> Result<i64, RuntimeError> {
    let Some(step) = u32::try_from(-n).ok().and_then(|e| 10i64.checked_pow(e)) else {
        return Ok(0);
    };
    let (quotient, remainder) = (i.div_euclid(step), i.rem_euclid(step));
    let twice = remainder * 2;
    let rounded = if twice > step || (twice == step && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    };
    rounded.checked_mul(step).ok_or_else(|| RuntimeError::Overflow {
        message: "integer result out of range".to_string(),
        location,
    })
}

/// Stable merge sort with a fallible comparator
pub(crate) fn try_merge_sort<T: Clone, E>(
    items: &mut Vec<T>,
    compare: &mut dyn FnMut(&T, &T) -> Result<Ordering, E>,
) -> Result<(), E> {
    if items.len() <= 1 {
        return Ok(());
    }
    let mut right = items.split_off(items.len() / 2);
    try_merge_sort(items, compare)?;
    try_merge_sort(&mut right, compare)?;

    let left = std::mem::take(items);
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if compare(&right[j], &left[i])? == Ordering::Less {
            merged.push(right[j].clone());
            j += 1;
        } else {
            merged.push(left[i].clone());
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    *items = merged;
    Ok(())
}

fn int_arg(
    interp_heap: &crate::memory::heap::Heap,
    value: &Value,
    location: SourceLocation,
) -> Result<i64, RuntimeError> {
    value.as_int().ok_or_else(|| {
        RuntimeError::type_error(
            format!(
                "'{}' object cannot be interpreted as an integer",
                interp_heap.type_name(value)
            ),
            location,
        )
    })
}

fn number_arg(
    heap: &crate::memory::heap::Heap,
    func: &str,
    value: &Value,
    location: SourceLocation,
) -> Result<f64, RuntimeError> {
    value.as_float().ok_or_else(|| {
        RuntimeError::type_error(
            format!(
                "{}() argument must be a real number, not '{}'",
                func,
                heap.type_name(value)
            ),
            location,
        )
    })
}

fn domain_error(location: SourceLocation) -> RuntimeError {
    RuntimeError::value_error("math domain error", location)
}

fn float_to_int(f: f64, location: SourceLocation) -> Result<i64, RuntimeError> {
    if f.is_nan() {
        return Err(RuntimeError::value_error(
            "cannot convert float NaN to integer",
            location,
        ));
    }
    if f.is_infinite() || f.abs() >= 9.223_372_036_854_775_807e18 {
        return Err(RuntimeError::Overflow {
            message: "cannot convert float infinity to integer".to_string(),
            location,
        });
    }
    Ok(f as i64)
}

/// `int("...", base)`: surrounding whitespace, a sign, underscores between
/// digits and a matching `0x`/`0o`/`0b` prefix are accepted
fn parse_int(text: &str, base: u32) -> Option<i64> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let lowered = digits.to_ascii_lowercase();
    let digits = match base {
        16 => lowered.strip_prefix("0x").unwrap_or(&lowered),
        8 => lowered.strip_prefix("0o").unwrap_or(&lowered),
        2 => lowered.strip_prefix("0b").unwrap_or(&lowered),
        _ => &lowered,
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    let magnitude = i64::from_str_radix(&cleaned, base).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_float(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.contains("__") {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok()
}

impl<H: LineHook> Interpreter<H> {
    /// Call a native function or type
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let name = builtin.name();
        let mut kwargs = KeywordArgs::new(kwargs);

        let result = match builtin {
            Builtin::Print => {
                let sep = self.optional_str(kwargs.take("sep"), " ", location)?;
                let end = self.optional_str(kwargs.take("end"), "\n", location)?;
                kwargs.take("flush");
                let mut pieces = Vec::with_capacity(args.len());
                for arg in &args {
                    pieces.push(self.display_str(arg, location)?);
                }
                self.output.write(&pieces.join(&sep));
                self.output.write(&end);
                Value::None
            }
            Builtin::Input => {
                // The prompt is not echoed; the viewer shows its own input line
                arity(name, &args, 0, 1, location)?;
                match self.inputs.pop() {
                    Some(line) => {
                        tracing::debug!(
                            consumed = self.inputs.consumed(),
                            remaining = self.inputs.remaining(),
                            "input consumed"
                        );
                        Value::str(line)
                    }
                    None => return Err(RuntimeError::NeedsInput { location }),
                }
            }
            Builtin::Len => {
                arity(name, &args, 1, 1, location)?;
                let len = self.len_of(&args[0], location)?;
                Value::Int(len as i64)
            }
            Builtin::Range => {
                arity(name, &args, 1, 3, location)?;
                let numbers = args
                    .iter()
                    .map(|a| int_arg(&self.heap, a, location))
                    .collect::<Result<Vec<_>, _>>()?;
                let (start, stop, step) = match numbers.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => (0, 0, 1),
                };
                if step == 0 {
                    return Err(RuntimeError::value_error(
                        "range() arg 3 must not be zero",
                        location,
                    ));
                }
                self.alloc(HeapData::Range(RangeObject { start, stop, step }), location)?
            }
            Builtin::Abs => {
                arity(name, &args, 1, 1, location)?;
                match &args[0] {
                    Value::Float(f) => Value::Float(f.abs()),
                    other => match other.as_int() {
                        Some(n) => n.checked_abs().map(Value::Int).ok_or_else(|| {
                            RuntimeError::Overflow {
                                message: "integer result out of range".to_string(),
                                location,
                            }
                        })?,
                        None => {
                            return Err(RuntimeError::type_error(
                                format!(
                                    "bad operand type for abs(): '{}'",
                                    self.heap.type_name(other)
                                ),
                                location,
                            ))
                        }
                    },
                }
            }
            Builtin::Min | Builtin::Max => {
                let key = kwargs.take("key");
                let default = kwargs.take("default");
                kwargs.finish(name, location)?;
                self.builtin_extreme(builtin == Builtin::Max, args, key, default, location)?
            }
            Builtin::Sum => {
                arity(name, &args, 1, 2, location)?;
                let start = kwargs
                    .take("start")
                    .or_else(|| args.get(1).cloned())
                    .unwrap_or(Value::Int(0));
                if matches!(start, Value::Str(_)) {
                    return Err(RuntimeError::type_error(
                        "sum() can't sum strings [use ''.join(seq) instead]",
                        location,
                    ));
                }
                let items = self.collect_items(&args[0], location)?;
                let mut total = start;
                for item in items {
                    total = self.binary_op(BinOp::Add, total, item, location)?;
                }
                total
            }
            Builtin::Sorted => {
                arity(name, &args, 1, 1, location)?;
                let key = kwargs.take("key");
                let reverse = kwargs.take("reverse");
                kwargs.finish(name, location)?;
                let mut items = self.collect_items(&args[0], location)?;
                let reverse = reverse.is_some_and(|r| ops::truthy(&self.heap, &r));
                self.sort_values(&mut items, key, reverse, location)?;
                self.alloc_list(items, location)?
            }
            Builtin::Reversed => {
                arity(name, &args, 1, 1, location)?;
                let mut items = self.collect_items(&args[0], location)?;
                items.reverse();
                self.alloc_list(items, location)?
            }
            Builtin::Enumerate => {
                arity(name, &args, 1, 2, location)?;
                let start = match kwargs.take("start").or_else(|| args.get(1).cloned()) {
                    Some(v) => int_arg(&self.heap, &v, location)?,
                    None => 0,
                };
                let items = self.collect_items(&args[0], location)?;
                let mut pairs = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    pairs.push(self.alloc_tuple(vec![Value::Int(start + i as i64), item], location)?);
                }
                self.alloc_list(pairs, location)?
            }
            Builtin::Zip => {
                let mut columns = Vec::with_capacity(args.len());
                for arg in &args {
                    columns.push(self.collect_items(arg, location)?);
                }
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let mut rows = Vec::with_capacity(len);
                for i in 0..len {
                    let row = columns.iter().map(|c| c[i].clone()).collect();
                    rows.push(self.alloc_tuple(row, location)?);
                }
                self.alloc_list(rows, location)?
            }
            Builtin::Map => {
                arity(name, &args, 2, usize::MAX, location)?;
                let func = args[0].clone();
                let mut columns = Vec::with_capacity(args.len() - 1);
                for arg in &args[1..] {
                    columns.push(self.collect_items(arg, location)?);
                }
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let mut out = Vec::with_capacity(len);
                for i in 0..len {
                    let call_args = columns.iter().map(|c| c[i].clone()).collect();
                    out.push(self.call_value(&func, call_args, Vec::new(), location)?);
                }
                self.alloc_list(out, location)?
            }
            Builtin::Filter => {
                arity(name, &args, 2, 2, location)?;
                let items = self.collect_items(&args[1], location)?;
                let mut out = Vec::new();
                for item in items {
                    let keep = if args[0].is_none() {
                        item.clone()
                    } else {
                        self.call_value(&args[0], vec![item.clone()], Vec::new(), location)?
                    };
                    if self.truthy(&keep) {
                        out.push(item);
                    }
                }
                self.alloc_list(out, location)?
            }
            Builtin::Any | Builtin::All => {
                arity(name, &args, 1, 1, location)?;
                let items = self.collect_items(&args[0], location)?;
                let want = builtin == Builtin::Any;
                let found = items.iter().any(|v| ops::truthy(&self.heap, v) == want);
                Value::Bool(if want { found } else { !found })
            }
            Builtin::Round => {
                arity(name, &args, 1, 2, location)?;
                let digits = kwargs.take("ndigits").or_else(|| args.get(1).cloned());
                self.builtin_round(&args[0], digits, location)?
            }
            Builtin::Repr => {
                arity(name, &args, 1, 1, location)?;
                Value::str(self.display_repr(&args[0], location)?)
            }
            Builtin::Isinstance => {
                arity(name, &args, 2, 2, location)?;
                Value::Bool(self.is_instance_of(&args[0], &args[1], location)?)
            }
            Builtin::Hasattr | Builtin::Getattr => {
                let max = if builtin == Builtin::Getattr { 3 } else { 2 };
                arity(name, &args, 2, max, location)?;
                let Value::Str(attr) = &args[1] else {
                    return Err(RuntimeError::type_error(
                        format!("{}(): attribute name must be string", name),
                        location,
                    ));
                };
                match self.get_attr(&args[0], attr, location) {
                    Ok(value) if builtin == Builtin::Getattr => value,
                    Ok(_) => Value::Bool(true),
                    Err(RuntimeError::AttributeError { .. }) if builtin == Builtin::Hasattr => {
                        Value::Bool(false)
                    }
                    Err(err @ RuntimeError::AttributeError { .. }) => match args.get(2) {
                        Some(default) => default.clone(),
                        None => return Err(err),
                    },
                    Err(err) => return Err(err),
                }
            }
            Builtin::Ord => {
                arity(name, &args, 1, 1, location)?;
                let text = args[0].as_str().ok_or_else(|| {
                    RuntimeError::type_error(
                        format!(
                            "ord() expected string of length 1, but {} found",
                            self.heap.type_name(&args[0])
                        ),
                        location,
                    )
                })?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Int(i64::from(u32::from(c))),
                    _ => {
                        return Err(RuntimeError::type_error(
                            format!(
                                "ord() expected a character, but string of length {} found",
                                text.chars().count()
                            ),
                            location,
                        ))
                    }
                }
            }
            Builtin::Chr => {
                arity(name, &args, 1, 1, location)?;
                let code = int_arg(&self.heap, &args[0], location)?;
                let ch = u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        RuntimeError::value_error("chr() arg not in range(0x110000)", location)
                    })?;
                Value::str(ch.to_string())
            }
            Builtin::Divmod => {
                arity(name, &args, 2, 2, location)?;
                if !args[0].is_numeric() || !args[1].is_numeric() {
                    return Err(RuntimeError::type_error(
                        format!(
                            "unsupported operand type(s) for divmod(): '{}' and '{}'",
                            self.heap.type_name(&args[0]),
                            self.heap.type_name(&args[1])
                        ),
                        location,
                    ));
                }
                let (q, r) = ops::divmod(&args[0], &args[1], location)?;
                self.alloc_tuple(vec![q, r], location)?
            }
            Builtin::Pow => {
                arity(name, &args, 2, 3, location)?;
                match args.get(2) {
                    Some(modulus) => {
                        let base = int_arg(&self.heap, &args[0], location)?;
                        let exp = int_arg(&self.heap, &args[1], location)?;
                        let modulus = int_arg(&self.heap, modulus, location)?;
                        Value::Int(modular_pow(base, exp, modulus, location)?)
                    }
                    None => self.binary_op(BinOp::Pow, args[0].clone(), args[1].clone(), location)?,
                }
            }
            Builtin::Hex | Builtin::Bin | Builtin::Oct => {
                arity(name, &args, 1, 1, location)?;
                let n = int_arg(&self.heap, &args[0], location)?;
                let sign = if n < 0 { "-" } else { "" };
                let magnitude = n.unsigned_abs();
                Value::str(match builtin {
                    Builtin::Hex => format!("{}0x{:x}", sign, magnitude),
                    Builtin::Bin => format!("{}0b{:b}", sign, magnitude),
                    _ => format!("{}0o{:o}", sign, magnitude),
                })
            }
            Builtin::Format => {
                arity(name, &args, 1, 2, location)?;
                let spec = match args.get(1) {
                    Some(Value::Str(s)) => s.to_string(),
                    Some(other) => {
                        return Err(RuntimeError::type_error(
                            format!(
                                "format() argument 2 must be str, not {}",
                                self.heap.type_name(other)
                            ),
                            location,
                        ))
                    }
                    None => String::new(),
                };
                if spec.is_empty() {
                    Value::str(self.display_str(&args[0], location)?)
                } else {
                    Value::str(format_value(&self.heap, &args[0], &spec, location)?)
                }
            }
            Builtin::Super => {
                arity(name, &args, 0, 0, location)?;
                let Some((class, receiver)) = self.stack.current().method_of.clone() else {
                    return Err(RuntimeError::Raised {
                        kind: "RuntimeError".to_string(),
                        message: "super(): no arguments".to_string(),
                        location,
                    });
                };
                self.alloc(HeapData::Super { class, receiver }, location)?
            }

            Builtin::Int => self.builtin_int(&args, &mut kwargs, location)?,
            Builtin::Float => {
                arity(name, &args, 0, 1, location)?;
                match args.first() {
                    None => Value::Float(0.0),
                    Some(Value::Str(s)) => Value::Float(parse_float(s).ok_or_else(|| {
                        RuntimeError::value_error(
                            format!(
                                "could not convert string to float: {}",
                                crate::memory::format::quote_str(s)
                            ),
                            location,
                        )
                    })?),
                    Some(v) => Value::Float(number_arg(&self.heap, "float", v, location)?),
                }
            }
            Builtin::Str => {
                arity(name, &args, 0, 1, location)?;
                match args.first() {
                    None => Value::str(""),
                    Some(v) => Value::str(self.display_str(v, location)?),
                }
            }
            Builtin::Bool => {
                arity(name, &args, 0, 1, location)?;
                Value::Bool(args.first().is_some_and(|v| ops::truthy(&self.heap, v)))
            }
            Builtin::List => {
                arity(name, &args, 0, 1, location)?;
                let items = match args.first() {
                    Some(v) => self.collect_items(v, location)?,
                    None => Vec::new(),
                };
                self.alloc_list(items, location)?
            }
            Builtin::Tuple => {
                arity(name, &args, 0, 1, location)?;
                let items = match args.first() {
                    Some(v) => self.collect_items(v, location)?,
                    None => Vec::new(),
                };
                self.alloc_tuple(items, location)?
            }
            Builtin::Set => {
                arity(name, &args, 0, 1, location)?;
                let items = match args.first() {
                    Some(v) => self.collect_items(v, location)?,
                    None => Vec::new(),
                };
                let set = self.build_set(items, location)?;
                self.alloc(HeapData::Set(set), location)?
            }
            Builtin::Dict => {
                arity(name, &args, 0, 1, location)?;
                let mut dict = DictObject::default();
                if let Some(source) = args.first() {
                    self.dict_update(&mut dict, source, location)?;
                }
                for (key, value) in kwargs.into_entries() {
                    let key = Value::str(key);
                    let hashed = self.hash_key(&key, location)?;
                    dict.insert(hashed, key, value);
                }
                return self.alloc(HeapData::Dict(dict), location);
            }
            Builtin::Type => {
                arity(name, &args, 1, 1, location)?;
                self.type_of(&args[0])
            }
            Builtin::Object => {
                return Err(RuntimeError::Unsupported {
                    message: "object() instances are not supported".to_string(),
                    location,
                })
            }
            Builtin::NoneType => {
                return Err(RuntimeError::type_error(
                    "cannot create 'NoneType' instances",
                    location,
                ))
            }
            Builtin::Exception(kind) => {
                let message = match args.as_slice() {
                    [] => String::new(),
                    [single] => self.display_str(single, location)?,
                    many => {
                        let tuple = self.alloc_tuple(many.to_vec(), location)?;
                        self.display_str(&tuple, location)?
                    }
                };
                self.alloc(HeapData::Exception { kind, message }, location)?
            }

            Builtin::MathSqrt => {
                arity(name, &args, 1, 1, location)?;
                let x = number_arg(&self.heap, name, &args[0], location)?;
                if x < 0.0 {
                    return Err(domain_error(location));
                }
                Value::Float(x.sqrt())
            }
            Builtin::MathFloor | Builtin::MathCeil => {
                arity(name, &args, 1, 1, location)?;
                match args[0].as_int() {
                    Some(n) => Value::Int(n),
                    None => {
                        let x = number_arg(&self.heap, name, &args[0], location)?;
                        let rounded = if builtin == Builtin::MathFloor {
                            x.floor()
                        } else {
                            x.ceil()
                        };
                        Value::Int(float_to_int(rounded, location)?)
                    }
                }
            }
            Builtin::MathGcd => {
                let mut acc: i64 = 0;
                for arg in &args {
                    let mut b = int_arg(&self.heap, arg, location)?.unsigned_abs();
                    let mut a = acc.unsigned_abs();
                    while b != 0 {
                        (a, b) = (b, a % b);
                    }
                    acc = i64::try_from(a).map_err(|_| RuntimeError::Overflow {
                        message: "integer result out of range".to_string(),
                        location,
                    })?;
                }
                Value::Int(acc)
            }
            Builtin::MathLog | Builtin::MathLog2 | Builtin::MathLog10 => {
                let max = if builtin == Builtin::MathLog { 2 } else { 1 };
                arity(name, &args, 1, max, location)?;
                let x = number_arg(&self.heap, name, &args[0], location)?;
                if x <= 0.0 {
                    return Err(domain_error(location));
                }
                Value::Float(match (builtin, args.get(1)) {
                    (Builtin::MathLog2, _) => x.log2(),
                    (Builtin::MathLog10, _) => x.log10(),
                    (_, Some(base)) => {
                        let base = number_arg(&self.heap, name, base, location)?;
                        if base <= 0.0 || base == 1.0 {
                            return Err(domain_error(location));
                        }
                        x.ln() / base.ln()
                    }
                    _ => x.ln(),
                })
            }
            Builtin::MathFabs => {
                arity(name, &args, 1, 1, location)?;
                Value::Float(number_arg(&self.heap, name, &args[0], location)?.abs())
            }
            Builtin::MathIsqrt => {
                arity(name, &args, 1, 1, location)?;
                let n = int_arg(&self.heap, &args[0], location)?;
                if n < 0 {
                    return Err(RuntimeError::value_error(
                        "isqrt() argument must be nonnegative",
                        location,
                    ));
                }
                let mut root = (n as f64).sqrt() as i64;
                while root.saturating_mul(root) > n {
                    root -= 1;
                }
                while (root + 1).saturating_mul(root + 1) <= n {
                    root += 1;
                }
                Value::Int(root)
            }
            Builtin::MathFactorial => {
                arity(name, &args, 1, 1, location)?;
                let n = int_arg(&self.heap, &args[0], location)?;
                if n < 0 {
                    return Err(RuntimeError::value_error(
                        "factorial() not defined for negative values",
                        location,
                    ));
                }
                let mut acc: i64 = 1;
                for k in 2..=n {
                    acc = acc.checked_mul(k).ok_or_else(|| RuntimeError::Overflow {
                        message: "integer result out of range".to_string(),
                        location,
                    })?;
                }
                Value::Int(acc)
            }
            Builtin::MathPow => {
                arity(name, &args, 2, 2, location)?;
                let x = number_arg(&self.heap, name, &args[0], location)?;
                let y = number_arg(&self.heap, name, &args[1], location)?;
                Value::Float(x.powf(y))
            }

            Builtin::Deque => {
                arity(name, &args, 0, 1, location)?;
                let items = match args.first() {
                    Some(v) => self.collect_items(v, location)?,
                    None => Vec::new(),
                };
                self.alloc(HeapData::Deque(VecDeque::from(items)), location)?
            }
            Builtin::DefaultDict => {
                arity(name, &args, 0, 1, location)?;
                let factory = args.first().cloned().unwrap_or(Value::None);
                if !factory.is_none() && !self.is_callable(&factory) {
                    return Err(RuntimeError::type_error(
                        "first argument must be callable or None",
                        location,
                    ));
                }
                let dict = DictObject {
                    entries: Default::default(),
                    default_factory: Some(factory),
                };
                self.alloc(HeapData::Dict(dict), location)?
            }

            Builtin::HeapPush => {
                arity(name, &args, 2, 2, location)?;
                self.heap_push(&args[0], args[1].clone(), location)?;
                Value::None
            }
            Builtin::HeapPop => {
                arity(name, &args, 1, 1, location)?;
                self.heap_pop(&args[0], location)?
            }
            Builtin::Heapify => {
                arity(name, &args, 1, 1, location)?;
                self.heapify(&args[0], location)?;
                Value::None
            }
        };

        kwargs.finish(name, location)?;
        Ok(result)
    }

    fn optional_str(
        &self,
        value: Option<Value>,
        default: &str,
        location: SourceLocation,
    ) -> Result<String, RuntimeError> {
        match value {
            None | Some(Value::None) => Ok(default.to_string()),
            Some(Value::Str(s)) => Ok(s.to_string()),
            Some(other) => Err(RuntimeError::type_error(
                format!("must be str or None, not {}", self.heap.type_name(&other)),
                location,
            )),
        }
    }

    /// `len(value)`
    pub(crate) fn len_of(&mut self, value: &Value, location: SourceLocation) -> Result<usize, RuntimeError> {
        let len = match value {
            Value::Str(s) => Some(s.chars().count()),
            Value::Ref(id) => match self.heap.get(*id) {
                Some(HeapData::List(list)) => Some(list.len()),
                Some(HeapData::Tuple(items)) => Some(items.len()),
                Some(HeapData::Dict(dict)) => Some(dict.len()),
                Some(HeapData::Set(set)) => Some(set.len()),
                Some(HeapData::Deque(items)) => Some(items.len()),
                Some(HeapData::Range(range)) => Some(range.len()),
                _ => None,
            },
            _ => None,
        };
        if let Some(len) = len {
            return Ok(len);
        }
        if let Some(result) = self.call_dunder(value, "__len__", Vec::new(), location)? {
            return match result.as_int() {
                Some(n) if n >= 0 => Ok(n as usize),
                _ => Err(RuntimeError::type_error(
                    "__len__() should return a non-negative int",
                    location,
                )),
            };
        }
        Err(RuntimeError::type_error(
            format!("object of type '{}' has no len()", self.heap.type_name(value)),
            location,
        ))
    }

    fn builtin_int(
        &mut self,
        args: &[Value],
        kwargs: &mut KeywordArgs,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        arity("int", args, 0, 2, location)?;
        let base = kwargs.take("base").or_else(|| args.get(1).cloned());
        let Some(value) = args.first() else {
            return Ok(Value::Int(0));
        };
        match (value, base) {
            (Value::Str(s), base) => {
                let base = match base {
                    Some(b) => int_arg(&self.heap, &b, location)?,
                    None => 10,
                };
                let radix = u32::try_from(base)
                    .ok()
                    .filter(|b| (2..=36).contains(b))
                    .ok_or_else(|| {
                        RuntimeError::value_error("int() base must be >= 2 and <= 36", location)
                    })?;
                parse_int(s, radix).map(Value::Int).ok_or_else(|| {
                    RuntimeError::value_error(
                        format!(
                            "invalid literal for int() with base {}: {}",
                            base,
                            crate::memory::format::quote_str(s)
                        ),
                        location,
                    )
                })
            }
            (_, Some(_)) => Err(RuntimeError::type_error(
                "int() can't convert non-string with explicit base",
                location,
            )),
            (Value::Float(f), None) => float_to_int(f.trunc(), location).map(Value::Int),
            (other, None) => other.as_int().map(Value::Int).ok_or_else(|| {
                RuntimeError::type_error(
                    format!(
                        "int() argument must be a string, a bytes-like object or a real number, not '{}'",
                        self.heap.type_name(other)
                    ),
                    location,
                )
            }),
        }
    }

    fn builtin_round(
        &mut self,
        value: &Value,
        digits: Option<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let digits = match digits {
            None | Some(Value::None) => None,
            Some(d) => Some(int_arg(&self.heap, &d, location)?),
        };
        match (value, digits) {
            (Value::Float(f), None) => float_to_int(f.round_ties_even(), location).map(Value::Int),
            (Value::Float(f), Some(n)) => Ok(Value::Float(round_float(*f, n))),
            (other, digits) => match (other.as_int(), digits) {
                (Some(i), Some(n)) if n < 0 => round_int(i, n, location).map(Value::Int),
                (Some(i), _) => Ok(Value::Int(i)),
                (None, _) => Err(RuntimeError::type_error(
                    format!(
                        "type {} doesn't define __round__ method",
                        self.heap.type_name(other)
                    ),
                    location,
                )),
            },
        }
    }

    fn builtin_extreme(
        &mut self,
        want_max: bool,
        args: Vec<Value>,
        key: Option<Value>,
        default: Option<Value>,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let name = if want_max { "max" } else { "min" };
        let items = match args.len() {
            0 => {
                return Err(RuntimeError::type_error(
                    format!("{} expected at least 1 argument, got 0", name),
                    location,
                ))
            }
            1 => self.collect_items(&args[0], location)?,
            _ => args,
        };

        let mut best: Option<(Value, Value)> = None;
        for item in items {
            let rank = match &key {
                Some(k) if !k.is_none() => self.call_value(k, vec![item.clone()], Vec::new(), location)?,
                _ => item.clone(),
            };
            let replace = match &best {
                None => true,
                Some((_, best_rank)) => {
                    let ord = self.compare_values(&rank, best_rank, location)?;
                    if want_max {
                        ord == Ordering::Greater
                    } else {
                        ord == Ordering::Less
                    }
                }
            };
            if replace {
                best = Some((item, rank));
            }
        }

        match (best, default) {
            (Some((item, _)), _) => Ok(item),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(RuntimeError::value_error(
                format!("{}() arg is an empty sequence", name),
                location,
            )),
        }
    }

    /// Stable sort by `key(item)` (or the items themselves)
    pub(crate) fn sort_values(
        &mut self,
        items: &mut Vec<Value>,
        key: Option<Value>,
        reverse: bool,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let keys: Vec<Value> = match key {
            Some(k) if !k.is_none() => {
                let mut keys = Vec::with_capacity(items.len());
                for item in items.iter() {
                    keys.push(self.call_value(&k, vec![item.clone()], Vec::new(), location)?);
                }
                keys
            }
            _ => items.clone(),
        };

        let mut order: Vec<usize> = (0..items.len()).collect();
        try_merge_sort::<usize, RuntimeError>(&mut order, &mut |a: &usize, b: &usize| {
            let ord = self.compare_values(&keys[*a], &keys[*b], location)?;
            Ok(if reverse { ord.reverse() } else { ord })
        })?;
        *items = order.into_iter().map(|i| items[i].clone()).collect();
        Ok(())
    }

    pub(crate) fn build_set(
        &mut self,
        items: Vec<Value>,
        location: SourceLocation,
    ) -> Result<SetObject, RuntimeError> {
        let mut set = SetObject::default();
        for item in items {
            let key = self.hash_key(&item, location)?;
            set.insert(key, item);
        }
        Ok(set)
    }

    /// `dict.update(source)`: another dict or an iterable of pairs
    pub(crate) fn dict_update(
        &mut self,
        dict: &mut DictObject,
        source: &Value,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        if let Some(HeapData::Dict(other)) = self.heap.deref(source) {
            for (key, (original, value)) in &other.entries {
                dict.insert(key.clone(), original.clone(), value.clone());
            }
            return Ok(());
        }
        let pairs = self.collect_items(source, location)?;
        for (i, pair) in pairs.iter().enumerate() {
            let parts = self.collect_items(pair, location)?;
            let [key, value] = <[Value; 2]>::try_from(parts).map_err(|parts| {
                RuntimeError::value_error(
                    format!(
                        "dictionary update sequence element #{} has length {}; 2 is required",
                        i,
                        parts.len()
                    ),
                    location,
                )
            })?;
            let hashed = self.hash_key(&key, location)?;
            dict.insert(hashed, key, value);
        }
        Ok(())
    }

    /// `type(value)`
    pub(crate) fn type_of(&self, value: &Value) -> Value {
        let builtin = match value {
            Value::None => Builtin::NoneType,
            Value::Bool(_) => Builtin::Bool,
            Value::Int(_) => Builtin::Int,
            Value::Float(_) => Builtin::Float,
            Value::Str(_) => Builtin::Str,
            Value::Builtin(b) if b.is_type() => Builtin::Type,
            Value::Builtin(_) => Builtin::Object,
            Value::Ref(id) => match self.heap.get(*id) {
                Some(HeapData::List(_)) => Builtin::List,
                Some(HeapData::Tuple(_)) => Builtin::Tuple,
                Some(HeapData::Dict(d)) if d.default_factory.is_some() => Builtin::DefaultDict,
                Some(HeapData::Dict(_)) => Builtin::Dict,
                Some(HeapData::Set(_)) => Builtin::Set,
                Some(HeapData::Deque(_)) => Builtin::Deque,
                Some(HeapData::Range(_)) => Builtin::Range,
                Some(HeapData::Instance(inst)) => return Value::Ref(inst.class),
                Some(HeapData::Class(_)) => Builtin::Type,
                Some(HeapData::Exception { kind, .. }) => Builtin::Exception(kind),
                _ => Builtin::Object,
            },
        };
        Value::Builtin(builtin)
    }

    /// `isinstance(value, class_or_types)`
    pub(crate) fn is_instance_of(
        &self,
        value: &Value,
        class_or_types: &Value,
        location: SourceLocation,
    ) -> Result<bool, RuntimeError> {
        let instance_class = match self.heap.deref(value) {
            Some(HeapData::Instance(inst)) => Some(inst.class),
            _ => None,
        };
        match class_or_types {
            Value::Builtin(Builtin::Object) => Ok(true),
            Value::Builtin(Builtin::Int) if matches!(value, Value::Bool(_)) => Ok(true),
            Value::Builtin(Builtin::Dict) if self.type_of(value) == Value::Builtin(Builtin::DefaultDict) => {
                Ok(true)
            }
            Value::Builtin(b @ Builtin::Exception(kind)) => {
                let derived = instance_class.and_then(|c| self.heap.exception_base(c));
                let own_kind = match (self.heap.deref(value), derived) {
                    (Some(HeapData::Exception { kind, .. }), _) => Some(*kind),
                    (_, Some(base)) => Some(base.name()),
                    _ => None,
                };
                Ok(own_kind.is_some_and(|k| k == *kind || *b == Builtin::Exception("Exception")))
            }
            Value::Builtin(b) if b.is_type() => Ok(self.type_of(value) == Value::Builtin(*b)),
            Value::Ref(id) => match self.heap.get(*id) {
                Some(HeapData::Class(_)) => {
                    Ok(instance_class.is_some_and(|c| self.heap.is_subclass(c, *id)))
                }
                Some(HeapData::Tuple(options)) => {
                    for option in options {
                        if self.is_instance_of(value, option, location)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                _ => Err(isinstance_arg_error(location)),
            },
            _ => Err(isinstance_arg_error(location)),
        }
    }

    fn with_heap_list<T>(
        &mut self,
        list: &Value,
        func: &str,
        location: SourceLocation,
        op: impl FnOnce(&mut Self, &mut Vec<Value>) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let id = match self.heap.deref(list) {
            Some(HeapData::List(_)) => list.as_ref_id(),
            _ => None,
        }
        .ok_or_else(|| {
            RuntimeError::type_error(
                format!("{}() argument 1 must be list, not {}", func, self.heap.type_name(list)),
                location,
            )
        })?;
        let mut items = match self.heap.get_mut(id) {
            Some(HeapData::List(l)) => std::mem::take(&mut l.items),
            _ => Vec::new(),
        };
        let result = op(self, &mut items);
        if let Some(HeapData::List(l)) = self.heap.get_mut(id) {
            l.items = items;
        }
        result
    }

    fn heap_less(&mut self, a: &Value, b: &Value, location: SourceLocation) -> Result<bool, RuntimeError> {
        Ok(self.compare_values(a, b, location)? == Ordering::Less)
    }

    fn sift_down(
        &mut self,
        items: &mut [Value],
        mut pos: usize,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let len = items.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                return Ok(());
            }
            let right = left + 1;
            let mut child = left;
            if right < len && self.heap_less(&items[right], &items[left], location)? {
                child = right;
            }
            if self.heap_less(&items[child], &items[pos], location)? {
                items.swap(child, pos);
                pos = child;
            } else {
                return Ok(());
            }
        }
    }

    fn heap_push(&mut self, list: &Value, item: Value, location: SourceLocation) -> Result<(), RuntimeError> {
        self.with_heap_list(list, "heappush", location, |this, items| {
            items.push(item);
            let mut pos = items.len() - 1;
            while pos > 0 {
                let parent = (pos - 1) / 2;
                if this.heap_less(&items[pos], &items[parent], location)? {
                    items.swap(pos, parent);
                    pos = parent;
                } else {
                    break;
                }
            }
            Ok(())
        })
    }

    fn heap_pop(&mut self, list: &Value, location: SourceLocation) -> Result<Value, RuntimeError> {
        self.with_heap_list(list, "heappop", location, |this, items| {
            let last = items
                .pop()
                .ok_or_else(|| RuntimeError::index_error("index out of range", location))?;
            if items.is_empty() {
                return Ok(last);
            }
            let top = std::mem::replace(&mut items[0], last);
            this.sift_down(items, 0, location)?;
            Ok(top)
        })
    }

    fn heapify(&mut self, list: &Value, location: SourceLocation) -> Result<(), RuntimeError> {
        self.with_heap_list(list, "heapify", location, |this, items| {
            for pos in (0..items.len() / 2).rev() {
                this.sift_down(items, pos, location)?;
            }
            Ok(())
        })
    }
}

fn isinstance_arg_error(location: SourceLocation) -> RuntimeError {
    RuntimeError::type_error(
        "isinstance() arg 2 must be a type, a tuple of types, or a union",
        location,
    )
}

fn modular_pow(base: i64, exp: i64, modulus: i64, location: SourceLocation) -> Result<i64, RuntimeError> {
    if modulus == 0 {
        return Err(RuntimeError::value_error("pow() 3rd argument cannot be 0", location));
    }
    if exp < 0 {
        return Err(RuntimeError::value_error(
            "pow() 2nd argument cannot be negative when 3rd argument specified",
            location,
        ));
    }
    let m = i128::from(modulus);
    let mut result: i128 = 1;
    let mut b = i128::from(base).rem_euclid(m);
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = (result * b).rem_euclid(m);
        }
        b = (b * b).rem_euclid(m);
        e >>= 1;
    }
    // Result takes the sign of the modulus
    let r = i64::try_from(result).unwrap_or(0);
    Ok(if modulus < 0 && r > 0 { r + modulus } else { r })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_names() {
        assert_eq!(Builtin::lookup("len"), Some(Builtin::Len));
        assert_eq!(
            Builtin::lookup("ValueError"),
            Some(Builtin::Exception("ValueError"))
        );
        assert_eq!(Builtin::lookup("sqrt"), None);
        assert_eq!(Builtin::Exception("KeyError").name(), "KeyError");
        assert!(Builtin::List.is_type());
        assert!(!Builtin::Print.is_type());
    }

    #[test]
    fn test_merge_sort_is_stable() {
        let mut items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        try_merge_sort::<_, ()>(&mut items, &mut |a, b| Ok(a.0.cmp(&b.0))).unwrap();
        assert_eq!(items, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn test_merge_sort_propagates_errors() {
        let mut items = vec![3, 1, 2];
        let result = try_merge_sort(&mut items, &mut |_, _| Err("boom"));
        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(" 42 ", 10), Some(42));
        assert_eq!(parse_int("-1_000", 10), Some(-1000));
        assert_eq!(parse_int("ff", 16), Some(255));
        assert_eq!(parse_int("0b101", 2), Some(5));
        assert_eq!(parse_int("abc", 10), None);
        assert_eq!(parse_int("", 10), None);
    }

    #[test]
    fn test_modular_pow() {
        let loc = SourceLocation::default();
        assert_eq!(modular_pow(3, 4, 5, loc), Ok(1));
        assert_eq!(modular_pow(-2, 3, 5, loc), Ok(2));
        assert!(modular_pow(2, 3, 0, loc).is_err());
    }
}
