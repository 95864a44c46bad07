//! Memory model for the interpreter
//!
//! This module provides the core runtime abstractions:
//! - [`value`]: Runtime value representation (scalars inline, objects by id)
//! - [`heap`]: Object arena holding containers, instances, functions, modules
//! - [`stack`]: Scopes, frames and the call stack
//! - [`tracked`]: Access-tracking lists and the step-scoped access log
//! - [`format`]: `str()` / `repr()` rendering
//!
//! # Identity
//!
//! Heap objects are addressed by [`ObjId`](value::ObjId), a dense index that
//! doubles as the container identity reported in snapshots. Because the
//! interpreter is deterministic and ids are allocated monotonically, replaying
//! a script yields identical ids.

pub mod format;
pub mod heap;
pub mod stack;
pub mod tracked;
pub mod value;
