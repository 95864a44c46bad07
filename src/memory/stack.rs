//! Call stack implementation
//!
//! - [`Scope`]: a namespace plus a link to the enclosing function's scope
//!   (closures and lambdas capture it)
//! - [`Frame`]: one activation record (module body, function call or class
//!   body) with its scope and `global` declarations
//! - [`Stack`]: the frames of the running script, module frame at the bottom
//!
//! Namespaces preserve insertion order so variables are reported in the
//! order the script first bound them.

use super::value::{ObjId, Value};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Name → value bindings in first-binding order
pub type Namespace = IndexMap<String, Value, FxBuildHasher>;

/// A namespace that closures can share
#[derive(Debug, Default)]
pub struct Scope {
    vars: RefCell<Namespace>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn new(parent: Option<Rc<Scope>>) -> Rc<Self> {
        Rc::new(Scope {
            vars: RefCell::new(Namespace::default()),
            parent,
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.vars.borrow().get(name).cloned()
    }

    /// Look the name up here and then in enclosing function scopes
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
    }

    pub fn set(&self, name: &str, value: Value) {
        let mut vars = self.vars.borrow_mut();
        if let Some(slot) = vars.get_mut(name) {
            *slot = value;
        } else {
            vars.insert(name.to_string(), value);
        }
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.vars.borrow_mut().shift_remove(name)
    }

    pub fn vars(&self) -> Ref<'_, Namespace> {
        self.vars.borrow()
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }
}

/// What kind of code a frame is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Module,
    Function(String),
    Class(String),
}

/// Stack frame for a module body, function call or class body
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub scope: Rc<Scope>,
    pub globals_declared: FxHashSet<String>,
    /// For method calls: the defining class and the bound `self`
    pub method_of: Option<(ObjId, Value)>,
    /// Line of the statement this frame is currently executing
    pub line: usize,
}

impl Frame {
    pub fn new(kind: FrameKind, scope: Rc<Scope>) -> Self {
        Frame {
            kind,
            scope,
            globals_declared: FxHashSet::default(),
            method_of: None,
            line: 0,
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self.kind, FrameKind::Module)
    }
}

/// The call stack
#[derive(Debug, Clone)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Stack {
    /// A stack holding only the module frame
    pub fn new(globals: Rc<Scope>) -> Self {
        Stack {
            frames: vec![Frame::new(FrameKind::Module, globals)],
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pop the innermost frame; the module frame is never popped
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> &Frame {
        // The module frame is pushed at construction and never popped
        &self.frames[self.frames.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn module(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn globals(&self) -> &Rc<Scope> {
        &self.frames[0].scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_preserves_insertion_order() {
        let scope = Scope::new(None);
        scope.set("b", Value::Int(1));
        scope.set("a", Value::Int(2));
        scope.set("b", Value::Int(3));

        let names: Vec<_> = scope.vars().keys().cloned().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(scope.get("b"), Some(Value::Int(3)));
    }

    #[test]
    fn test_lookup_walks_enclosing_scopes() {
        let outer = Scope::new(None);
        outer.set("x", Value::Int(1));
        let inner = Scope::new(Some(outer));

        assert_eq!(inner.get("x"), None);
        assert_eq!(inner.lookup("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_module_frame_is_never_popped() {
        let mut stack = Stack::new(Scope::new(None));
        stack.push(Frame::new(FrameKind::Function("f".into()), Scope::new(None)));

        assert!(stack.pop().is_some());
        assert!(stack.pop().is_none());
        assert!(stack.current().is_module());
    }
}
