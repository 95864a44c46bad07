//! Script interpreter
//!
//! This module provides the core execution logic:
//! - [`engine`]: Interpreter state, name resolution and statement dispatch
//! - [`statements`]: Assignment, definitions, `raise`, `assert`, imports
//! - [`loops`]: `while` / `for` and the iteration protocol
//! - [`expressions`]: Expression evaluation and dunder dispatch
//! - [`calls`]: Calling functions, classes, methods and built-ins
//! - [`memory_ops`]: Subscripts, slices and attributes
//! - [`builtins`], [`methods`], [`modules`]: The native library
//! - [`ops`], [`formatting`]: Operators and string formatting on plain values
//! - [`input`]: The queue `input()` reads from
//! - [`errors`]: Runtime error types
//!
//! # Execution Model
//!
//! The interpreter walks the AST. Before each statement (and before each
//! re-evaluation of a loop header) it reports a *statement boundary* to its
//! [`LineHook`], passing a read-only [`FrameView`] of the current frame. The
//! hook decides whether execution continues; the step tracer in
//! [`crate::snapshot::tracer`] is the hook used for real runs.
//!
//! Built-ins and methods of built-in types are native and never fire
//! boundaries. Only code from the traced script does.

pub mod builtins;
pub mod calls;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod expressions;
pub mod formatting;
pub mod input;
pub mod loops;
pub mod memory_ops;
pub mod methods;
pub mod modules;
pub mod ops;
pub mod statements;

use crate::memory::heap::Heap;
use crate::memory::stack::{FrameKind, Scope};
use crate::memory::tracked::AccessLog;

pub use engine::{Interpreter, Limits};
pub use errors::RuntimeError;
pub use input::InputQueue;

/// What the hook wants the interpreter to do after a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookControl {
    Continue,
    /// Stop the run quietly (no error, no further boundaries)
    Halt,
}

/// Read-only view of the running frame at a statement boundary
pub struct FrameView<'a> {
    /// Line about to execute (or the last executed line, for the final view)
    pub line: usize,
    pub kind: &'a FrameKind,
    /// Bindings visible in this frame: globals for the module body, locals
    /// for a function call, the class namespace for a class body
    pub scope: &'a Scope,
    pub heap: &'a Heap,
    /// Everything the script has printed so far
    pub stdout: &'a str,
    /// Tracked-list accesses since the last drain
    pub accesses: &'a AccessLog,
}

/// Observer of statement boundaries
pub trait LineHook {
    fn on_line(&mut self, view: &FrameView<'_>) -> HookControl;

    /// Called once after the script ran to completion, with the module frame
    fn on_finish(&mut self, _view: &FrameView<'_>) {}
}

/// Runs scripts without observing them
impl LineHook for () {
    fn on_line(&mut self, _view: &FrameView<'_>) -> HookControl {
        HookControl::Continue
    }
}

#[cfg(test)]
mod tests;
