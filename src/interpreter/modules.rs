//! Importable standard modules
//!
//! Only a handful of modules exist: `math`, `collections`, `heapq` and
//! `typing`. Their functions are [`Builtin`] variants; a module object is a
//! namespace built on first import and cached on the interpreter, so every
//! `import math` in a run yields the same object.
//!
//! `typing` exists so annotated scripts import cleanly. Its names are bound
//! to `None`; annotations are never evaluated.

use crate::interpreter::builtins::Builtin;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::LineHook;
use crate::memory::heap::{HeapData, ModuleObject};
use crate::memory::stack::Namespace;
use crate::memory::value::Value;
use crate::parser::ast::SourceLocation;

const TYPING_NAMES: &[&str] = &[
    "List",
    "Dict",
    "Set",
    "Tuple",
    "Optional",
    "Any",
    "Union",
    "Deque",
    "DefaultDict",
    "Callable",
    "Iterable",
];

/// Attributes of a known module, or `None` for an unknown name
fn module_attrs(name: &str) -> Option<Namespace> {
    let mut attrs = Namespace::default();
    let mut function = |b: Builtin| {
        attrs.insert(b.name().to_string(), Value::Builtin(b));
    };
    match name {
        "math" => {
            for b in [
                Builtin::MathSqrt,
                Builtin::MathFloor,
                Builtin::MathCeil,
                Builtin::MathGcd,
                Builtin::MathLog,
                Builtin::MathLog2,
                Builtin::MathLog10,
                Builtin::MathFabs,
                Builtin::MathIsqrt,
                Builtin::MathFactorial,
                Builtin::MathPow,
            ] {
                function(b);
            }
            attrs.insert("pi".into(), Value::Float(std::f64::consts::PI));
            attrs.insert("e".into(), Value::Float(std::f64::consts::E));
            attrs.insert("inf".into(), Value::Float(f64::INFINITY));
            attrs.insert("nan".into(), Value::Float(f64::NAN));
        }
        "collections" => {
            function(Builtin::Deque);
            function(Builtin::DefaultDict);
        }
        "heapq" => {
            function(Builtin::HeapPush);
            function(Builtin::HeapPop);
            function(Builtin::Heapify);
        }
        "typing" => {
            for name in TYPING_NAMES {
                attrs.insert(name.to_string(), Value::None);
            }
        }
        _ => return None,
    }
    Some(attrs)
}

impl<H: LineHook> Interpreter<H> {
    /// `import name`: the cached module object, built on first use
    pub(crate) fn import_module(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        if let Some(module) = self.modules.get(name) {
            return Ok(module.clone());
        }
        let attrs = module_attrs(name).ok_or_else(|| RuntimeError::ModuleNotFound {
            name: name.to_string(),
            location,
        })?;
        tracing::debug!(module = name, "importing module");
        let module = self.alloc(
            HeapData::Module(ModuleObject {
                name: name.to_string(),
                attrs,
            }),
            location,
        )?;
        self.modules.insert(name.to_string(), module.clone());
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_modules() {
        let math = module_attrs("math").unwrap();
        assert_eq!(math.get("sqrt"), Some(&Value::Builtin(Builtin::MathSqrt)));
        assert!(matches!(math.get("pi"), Some(Value::Float(_))));

        let collections = module_attrs("collections").unwrap();
        assert!(collections.contains_key("deque"));
        assert_eq!(module_attrs("typing").unwrap().get("List"), Some(&Value::None));
    }

    #[test]
    fn test_unknown_module() {
        assert!(module_attrs("os").is_none());
        assert!(module_attrs("numpy").is_none());
    }
}
