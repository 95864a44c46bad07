//! `str()` / `repr()` rendering of runtime values
//!
//! Containers print their elements with `repr`, and self-referencing
//! containers print `[...]` / `{...}` at the point of recursion.

use super::heap::{FunctionBody, Heap, HeapData};
use super::value::{ObjId, Value};

/// Render a float the way the script language does: integral values keep a
/// trailing `.0`, very large or small magnitudes use exponent notation.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let formatted = format!("{:e}", f);
        // Rust prints `1e20` / `1.5e-7`; normalize to `1e+20` / `1.5e-07`
        if let Some((mantissa, exponent)) = formatted.split_once('e') {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            return format!("{}e{}{:0>2}", mantissa, sign, digits);
        }
        return formatted;
    }

    if f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// Quote a string with single quotes unless it contains one and no double
/// quote
pub fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// `str(value)`
pub fn py_str(heap: &Heap, value: &Value) -> String {
    match value {
        Value::Str(s) => s.to_string(),
        other => py_repr(heap, other),
    }
}

/// `repr(value)`
pub fn py_repr(heap: &Heap, value: &Value) -> String {
    let mut out = String::new();
    Renderer {
        heap,
        active: Vec::new(),
    }
    .repr(value, &mut out);
    out
}

struct Renderer<'h> {
    heap: &'h Heap,
    /// Containers currently being rendered (recursion guard)
    active: Vec<ObjId>,
}

impl Renderer<'_> {
    fn repr(&mut self, value: &Value, out: &mut String) {
        match value {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::Str(s) => out.push_str(&quote_str(s)),
            Value::Builtin(b) if b.is_type() => {
                out.push_str(&format!("<class '{}'>", b.name()))
            }
            Value::Builtin(b) => out.push_str(&format!("<built-in function {}>", b.name())),
            Value::Ref(id) => self.repr_object(*id, out),
        }
    }

    fn repr_object(&mut self, id: ObjId, out: &mut String) {
        let heap = self.heap;
        let Some(data) = heap.get(id) else {
            out.push_str("<invalid reference>");
            return;
        };

        if self.active.contains(&id) {
            out.push_str(match data {
                HeapData::List(_) => "[...]",
                HeapData::Dict(_) => "{...}",
                _ => "...",
            });
            return;
        }

        self.active.push(id);
        match data {
            HeapData::List(list) => self.sequence("[", &list.items, "]", out),
            HeapData::Tuple(items) if items.len() == 1 => {
                out.push('(');
                self.repr(&items[0], out);
                out.push_str(",)");
            }
            HeapData::Tuple(items) => self.sequence("(", items, ")", out),
            HeapData::Set(set) if set.is_empty() => out.push_str("set()"),
            HeapData::Set(set) => {
                let items: Vec<Value> = set.values().cloned().collect();
                self.sequence("{", &items, "}", out);
            }
            HeapData::Deque(items) => {
                let items: Vec<Value> = items.iter().cloned().collect();
                self.sequence("deque([", &items, "])", out);
            }
            HeapData::Dict(dict) => {
                let defaulted = dict.default_factory.is_some();
                if defaulted {
                    out.push_str("defaultdict(");
                    if let Some(factory) = &dict.default_factory {
                        self.repr(factory, out);
                    }
                    out.push_str(", ");
                }
                out.push('{');
                for (i, (key, val)) in dict.entries.values().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.repr(key, out);
                    out.push_str(": ");
                    self.repr(val, out);
                }
                out.push('}');
                if defaulted {
                    out.push(')');
                }
            }
            HeapData::Range(r) if r.step == 1 => {
                out.push_str(&format!("range({}, {})", r.start, r.stop))
            }
            HeapData::Range(r) => {
                out.push_str(&format!("range({}, {}, {})", r.start, r.stop, r.step))
            }
            HeapData::Instance(inst) => {
                out.push_str(&format!("<{} object>", heap.class_name(inst.class)))
            }
            HeapData::Class(class) => out.push_str(&format!("<class '{}'>", class.name)),
            HeapData::Function(func) => match func.body {
                FunctionBody::Lambda(_) => out.push_str("<function <lambda>>"),
                FunctionBody::Block(_) => out.push_str(&format!("<function {}>", func.name)),
            },
            HeapData::BoundMethod { function, .. } => {
                let name = match heap.get(*function) {
                    Some(HeapData::Function(f)) => f.name.clone(),
                    _ => "?".to_string(),
                };
                out.push_str(&format!("<bound method {}>", name));
            }
            HeapData::BuiltinMethod { name, .. } => {
                out.push_str(&format!("<built-in method {}>", name))
            }
            HeapData::Module(module) => out.push_str(&format!("<module '{}'>", module.name)),
            HeapData::Super { class, .. } => {
                out.push_str(&format!("<super: <class '{}'>>", heap.class_name(*class)))
            }
            HeapData::Exception { kind, message } => {
                out.push_str(&format!("{}({})", kind, quote_str(message)))
            }
        }
        self.active.pop();
    }

    fn sequence(&mut self, open: &str, items: &[Value], close: &str, out: &mut String) {
        out.push_str(open);
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.repr(item, out);
        }
        out.push_str(close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::heap::HeapData;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-2.5), "-2.5");
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_quote_str() {
        assert_eq!(quote_str("abc"), "'abc'");
        assert_eq!(quote_str("it's"), "\"it's\"");
        assert_eq!(quote_str("a\nb"), "'a\\nb'");
    }

    #[test]
    fn test_nested_containers() {
        let mut heap = Heap::new(100);
        let inner = heap.alloc_tuple(vec![Value::Int(1)]).unwrap();
        let list = heap
            .alloc_list(vec![Value::str("a"), inner, Value::None])
            .unwrap();
        assert_eq!(py_repr(&heap, &list), "['a', (1,), None]");
        assert_eq!(py_str(&heap, &Value::str("a")), "a");
    }

    #[test]
    fn test_self_referencing_list() {
        let mut heap = Heap::new(100);
        let list = heap.alloc_list(vec![Value::Int(1)]).unwrap();
        if let Some(HeapData::List(l)) = heap.get_mut(0) {
            l.items.push(list.clone());
        }
        assert_eq!(py_repr(&heap, &list), "[1, [...]]");
    }
}
