//! # Introduction
//!
//! stepscope runs a short script written in a Python subset and records a
//! snapshot of the visible program state before every statement. Each
//! snapshot holds the line about to run, everything printed so far, a
//! JSON-safe copy of the variables, and which elements of tracked lists were
//! read or written. Viewers step through the snapshots and draw lists,
//! linked lists, trees and graphs from them.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → Rewrite → Interpreter + StepTracer → Trace → Client → TUI
//! ```
//!
//! 1. [`parser`]: tokenises the script, builds an AST, and rewrites list
//!    displays into access-tracked lists.
//! 2. [`interpreter`]: walks the AST and reports each statement boundary to a
//!    [`interpreter::LineHook`].
//! 3. [`memory`]: values, the object heap, scopes and tracked lists.
//! 4. [`snapshot`]: the [`snapshot::Step`] / [`snapshot::Trace`] wire types,
//!    the value serializer and the step tracer.
//! 5. [`transport`]: the request/response boundary. Runs the tracer on a
//!    worker thread and turns its raw output into a client-facing trace.
//! 6. [`client`]: rebuilds structures from steps (shape classification,
//!    per-step diff, access marks, graph layout).
//! 7. [`ui`]: ratatui-based viewer; not part of the stable library API.
//!
//! [`config`] holds the tracer settings shared by all of the above.
//!
//! ## Input
//!
//! `input()` reads from a queue supplied with the request. When the queue
//! runs dry the run stops and the trace is marked `needsInput`; the caller
//! resumes by sending the same request again with one more input. The run is
//! replayed from the start, so resumption is only faithful for scripts that
//! are deterministic given their inputs.

pub mod client;
pub mod config;
pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;
pub mod transport;
pub mod ui;
