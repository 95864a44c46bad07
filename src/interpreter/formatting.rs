//! String formatting: format specs (`f"{x:>8.2f}"`, `format()`), printf-style
//! `%` formatting and `str.format`.
//!
//! Spec grammar: `[[fill]align][sign][#][0][width][,|_][.precision][type]`

use crate::interpreter::errors::RuntimeError;
use crate::memory::format::{format_float, py_repr, py_str};
use crate::memory::heap::{Heap, HeapData};
use crate::memory::value::Value;
use crate::parser::ast::SourceLocation;

#[derive(Debug, Clone, Default, PartialEq)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

fn parse_spec(spec: &str) -> Option<FormatSpec> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = FormatSpec::default();
    let mut i = 0;
    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');

    if chars.len() >= 2 && is_align(chars[1]) {
        out.fill = Some(chars[0]);
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().copied().is_some_and(is_align) {
        out.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&c) = chars.get(i) {
        if matches!(c, '+' | '-' | ' ') {
            out.sign = Some(c);
            i += 1;
        }
    }
    if chars.get(i) == Some(&'#') {
        out.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        out.zero = true;
        i += 1;
    }
    let start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    if i > start {
        out.width = chars[start..i].iter().collect::<String>().parse().ok()?;
    }
    if let Some(&c) = chars.get(i) {
        if c == ',' || c == '_' {
            out.grouping = Some(c);
            i += 1;
        }
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        if i == start {
            return None;
        }
        out.precision = Some(chars[start..i].iter().collect::<String>().parse().ok()?);
    }
    if let Some(&c) = chars.get(i) {
        out.kind = Some(c);
        i += 1;
    }
    (i == chars.len()).then_some(out)
}

fn invalid_spec(spec: &str, heap: &Heap, value: &Value, location: SourceLocation) -> RuntimeError {
    RuntimeError::value_error(
        format!(
            "Invalid format specifier '{}' for object of type '{}'",
            spec,
            heap.type_name(value)
        ),
        location,
    )
}

/// `format(value, spec)`; an empty spec is `str(value)`
pub fn format_value(
    heap: &Heap,
    value: &Value,
    spec: &str,
    location: SourceLocation,
) -> Result<String, RuntimeError> {
    if spec.is_empty() {
        return Ok(py_str(heap, value));
    }
    let parsed = parse_spec(spec).ok_or_else(|| invalid_spec(spec, heap, value, location))?;
    apply_spec(heap, value, &parsed, spec, location)
}

fn apply_spec(
    heap: &Heap,
    value: &Value,
    spec: &FormatSpec,
    raw: &str,
    location: SourceLocation,
) -> Result<String, RuntimeError> {
    let numeric = value.is_numeric();
    let (negative, body) = match (spec.kind, value) {
        (Some('s') | None, Value::Str(s)) => {
            let text: String = match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.to_string(),
            };
            return Ok(pad(text, spec, false, ""));
        }
        (None, v) if !numeric => return Ok(pad(py_str(heap, v), spec, false, "")),
        (Some('d' | 'x' | 'X' | 'o' | 'b' | 'c'), v) if v.as_int().is_some() => {
            let n = v.as_int().unwrap_or(0);
            let digits = match spec.kind {
                Some('x') => format!("{:x}", n.unsigned_abs()),
                Some('X') => format!("{:X}", n.unsigned_abs()),
                Some('o') => format!("{:o}", n.unsigned_abs()),
                Some('b') => format!("{:b}", n.unsigned_abs()),
                Some('c') => {
                    let ch = u32::try_from(n)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| RuntimeError::Overflow {
                            message: "%c arg not in range(0x110000)".to_string(),
                            location,
                        })?;
                    return Ok(pad(ch.to_string(), spec, false, ""));
                }
                _ => group(&n.unsigned_abs().to_string(), spec.grouping),
            };
            let prefix = match (spec.alternate, spec.kind) {
                (true, Some('x')) => "0x",
                (true, Some('X')) => "0X",
                (true, Some('o')) => "0o",
                (true, Some('b')) => "0b",
                _ => "",
            };
            (n < 0, format!("{}{}", prefix, digits))
        }
        (None, v) if v.as_int().is_some() && spec.precision.is_none() => {
            let n = v.as_int().unwrap_or(0);
            (n < 0, group(&n.unsigned_abs().to_string(), spec.grouping))
        }
        (Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%') | None, v) if numeric => {
            let f = v.as_float().unwrap_or(f64::NAN);
            let abs = f.abs();
            let body = match spec.kind {
                Some('f' | 'F') => fixed(abs, spec.precision.unwrap_or(6), spec.grouping),
                Some('%') => format!("{}%", fixed(abs * 100.0, spec.precision.unwrap_or(6), spec.grouping)),
                Some('e' | 'E') => {
                    let text = exponent(abs, spec.precision.unwrap_or(6));
                    if spec.kind == Some('E') {
                        text.to_uppercase()
                    } else {
                        text
                    }
                }
                Some('g' | 'G') => general(abs, spec.precision.unwrap_or(6)),
                _ => match spec.precision {
                    Some(p) => general(abs, p.max(1)),
                    None => format_float(abs),
                },
            };
            (f.is_sign_negative() && !f.is_nan() && f != 0.0, body)
        }
        _ => return Err(invalid_spec(raw, heap, value, location)),
    };

    let sign = if negative {
        "-"
    } else {
        match spec.sign {
            Some('+') => "+",
            Some(' ') => " ",
            _ => "",
        }
    };
    Ok(pad(body, spec, true, sign))
}

fn fixed(abs: f64, precision: usize, grouping: Option<char>) -> String {
    let text = format!("{:.*}", precision, abs);
    match text.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", group(int_part, grouping), frac),
        None => group(&text, grouping),
    }
}

fn exponent(abs: f64, precision: usize) -> String {
    let text = format!("{:.*e}", precision, abs);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

/// `g` presentation: `precision` significant digits, trailing zeros removed
fn general(abs: f64, precision: usize) -> String {
    if abs == 0.0 {
        return "0".to_string();
    }
    if !abs.is_finite() {
        return format_float(abs);
    }
    let precision = precision.max(1);
    let exp = abs.log10().floor() as i64;
    let strip = |s: String| -> String {
        if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    };
    if exp < -4 || exp >= precision as i64 {
        let text = exponent(abs, precision - 1);
        match text.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", strip(mantissa.to_string()), exp),
            None => text,
        }
    } else {
        let decimals = usize::try_from(precision as i64 - 1 - exp).unwrap_or(0);
        strip(format!("{:.*}", decimals, abs))
    }
}

fn group(digits: &str, separator: Option<char>) -> String {
    let Some(sep) = separator else {
        return digits.to_string();
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

fn pad(body: String, spec: &FormatSpec, numeric: bool, sign: &str) -> String {
    let len = body.chars().count() + sign.chars().count();
    if len >= spec.width {
        return format!("{}{}", sign, body);
    }
    let fill_count = spec.width - len;
    let (fill, align) = match (spec.fill, spec.align) {
        (fill, Some(align)) => (fill.unwrap_or(' '), align),
        (_, None) if spec.zero && numeric => ('0', '='),
        (_, None) if numeric => (' ', '>'),
        _ => (' ', '<'),
    };
    let filler = |n: usize| fill.to_string().repeat(n);
    match align {
        '<' => format!("{}{}{}", sign, body, filler(fill_count)),
        '^' => {
            let left = fill_count / 2;
            format!("{}{}{}{}", filler(left), sign, body, filler(fill_count - left))
        }
        '=' => format!("{}{}{}", sign, filler(fill_count), body),
        _ => format!("{}{}{}", filler(fill_count), sign, body),
    }
}

/// `template % args`
pub fn percent_format(
    heap: &Heap,
    template: &str,
    args: &Value,
    location: SourceLocation,
) -> Result<String, RuntimeError> {
    let values: Vec<Value> = match heap.deref(args) {
        Some(HeapData::Tuple(items)) => items.clone(),
        _ => vec![args.clone()],
    };
    let mut next = values.iter();
    let mut out = String::new();
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let mut spec = FormatSpec::default();
        let mut width = String::new();
        let mut precision: Option<String> = None;
        while let Some(&c) = chars.peek() {
            match c {
                '-' => spec.align = Some('<'),
                '+' | ' ' => spec.sign = Some(c),
                '0' if width.is_empty() && precision.is_none() => spec.zero = true,
                '#' => spec.alternate = true,
                '.' => precision = Some(String::new()),
                d if d.is_ascii_digit() => match precision.as_mut() {
                    Some(p) => p.push(d),
                    None => width.push(d),
                },
                _ => break,
            }
            chars.next();
        }
        spec.width = width.parse().unwrap_or(0);
        spec.precision = precision.map(|p| p.parse().unwrap_or(0));
        if spec.align.is_some() {
            spec.zero = false;
        }

        let Some(conversion) = chars.next() else {
            return Err(RuntimeError::value_error("incomplete format", location));
        };
        if conversion == '%' {
            out.push('%');
            continue;
        }
        let value = next.next().ok_or_else(|| {
            RuntimeError::type_error("not enough arguments for format string", location)
        })?;
        let piece = match conversion {
            's' => pad(py_str(heap, value), &spec, false, ""),
            'r' => pad(py_repr(heap, value), &spec, false, ""),
            'd' | 'i' | 'u' => {
                let as_int = match value {
                    Value::Float(f) => Value::Int(f.trunc() as i64),
                    other => other.clone(),
                };
                if as_int.as_int().is_none() {
                    return Err(RuntimeError::type_error(
                        format!("%d format: a real number is required, not {}", heap.type_name(value)),
                        location,
                    ));
                }
                spec.kind = Some('d');
                spec.precision = None;
                apply_spec(heap, &as_int, &spec, "d", location)?
            }
            'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'x' | 'X' | 'o' | 'c' => {
                spec.kind = Some(conversion);
                apply_spec(heap, value, &spec, &conversion.to_string(), location).map_err(|_| {
                    RuntimeError::type_error(
                        format!(
                            "%{} format: a number is required, not {}",
                            conversion,
                            heap.type_name(value)
                        ),
                        location,
                    )
                })?
            }
            other => {
                return Err(RuntimeError::value_error(
                    format!("unsupported format character '{}'", other),
                    location,
                ))
            }
        };
        out.push_str(&piece);
    }

    if next.next().is_some() {
        return Err(RuntimeError::type_error(
            "not all arguments converted during string formatting",
            location,
        ));
    }
    Ok(out)
}

/// `template.format(*args, **kwargs)`: `{}`, `{0}`, `{name}`, each with an
/// optional `!r`/`!s` conversion and `:spec`
pub fn str_format(
    heap: &Heap,
    template: &str,
    args: &[Value],
    kwargs: &[(String, Value)],
    location: SourceLocation,
) -> Result<String, RuntimeError> {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    let mut auto_index = 0;

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => {
                            return Err(RuntimeError::value_error(
                                "expected '}' before end of string",
                                location,
                            ))
                        }
                    }
                }
                let (head, spec) = match field.split_once(':') {
                    Some((h, s)) => (h.to_string(), s.to_string()),
                    None => (field, String::new()),
                };
                let (name, conversion) = match head.split_once('!') {
                    Some((n, c)) => (n.to_string(), Some(c.to_string())),
                    None => (head, None),
                };

                let value = if name.is_empty() {
                    let value = args.get(auto_index);
                    auto_index += 1;
                    value
                } else if let Ok(index) = name.parse::<usize>() {
                    args.get(index)
                } else {
                    kwargs.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
                };
                let value = value.ok_or_else(|| {
                    if name.is_empty() || name.parse::<usize>().is_ok() {
                        RuntimeError::index_error(
                            "Replacement index out of range for positional args tuple",
                            location,
                        )
                    } else {
                        RuntimeError::KeyError {
                            key: format!("'{}'", name),
                            location,
                        }
                    }
                })?;

                let text = match conversion.as_deref() {
                    Some("r") => Value::str(py_repr(heap, value)),
                    Some("s") => Value::str(py_str(heap, value)),
                    _ => value.clone(),
                };
                out.push_str(&format_value(heap, &text, &spec, location)?);
            }
            '}' => {
                return Err(RuntimeError::value_error(
                    "Single '}' encountered in format string",
                    location,
                ))
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new(1, 1)
    }

    fn fmt(value: Value, spec: &str) -> String {
        let heap = Heap::new(10);
        format_value(&heap, &value, spec, loc()).unwrap()
    }

    #[test]
    fn test_float_specs() {
        assert_eq!(fmt(Value::Float(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(Value::Float(3.14159), "8.3f"), "   3.142");
        assert_eq!(fmt(Value::Float(-2.5), "+.1f"), "-2.5");
        assert_eq!(fmt(Value::Float(0.25), ".0%"), "25%");
        assert_eq!(fmt(Value::Float(1234.0), ".3e"), "1.234e+03");
        assert_eq!(fmt(Value::Int(5), ".1f"), "5.0");
    }

    #[test]
    fn test_int_specs() {
        assert_eq!(fmt(Value::Int(42), "05d"), "00042");
        assert_eq!(fmt(Value::Int(-42), "05d"), "-0042");
        assert_eq!(fmt(Value::Int(1234567), ","), "1,234,567");
        assert_eq!(fmt(Value::Int(255), "#x"), "0xff");
        assert_eq!(fmt(Value::Int(5), "b"), "101");
    }

    #[test]
    fn test_alignment() {
        assert_eq!(fmt(Value::str("ab"), ">5"), "   ab");
        assert_eq!(fmt(Value::str("ab"), "*^6"), "**ab**");
        assert_eq!(fmt(Value::str("ab"), "5"), "ab   ");
        assert_eq!(fmt(Value::Int(7), "<3"), "7  ");
    }

    #[test]
    fn test_invalid_spec() {
        let heap = Heap::new(10);
        assert!(format_value(&heap, &Value::str("a"), "d", loc()).is_err());
        assert!(format_value(&heap, &Value::Int(1), "..", loc()).is_err());
    }

    #[test]
    fn test_percent_format() {
        let mut heap = Heap::new(10);
        let args = heap
            .alloc_tuple(vec![Value::str("x"), Value::Int(3), Value::Float(2.5)])
            .unwrap();
        assert_eq!(
            percent_format(&heap, "%s=%03d (%.2f) 100%%", &args, loc()).unwrap(),
            "x=003 (2.50) 100%"
        );
        assert!(percent_format(&heap, "%s %s", &Value::Int(1), loc()).is_err());
    }

    #[test]
    fn test_str_format() {
        let heap = Heap::new(10);
        let out = str_format(
            &heap,
            "{} + {0} = {total:>3} {{ok}}",
            &[Value::Int(1)],
            &[("total".to_string(), Value::Int(2))],
            loc(),
        )
        .unwrap();
        assert_eq!(out, "1 + 1 =   2 {ok}");
    }
}
