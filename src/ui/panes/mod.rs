//! TUI pane rendering modules
//!
//! - [`source`]: script with syntax highlighting and the current-line marker
//! - [`output`]: captured stdout, and the input line while a run waits for
//!   `input()`
//! - [`variables`]: flat inspector, one row per binding
//! - [`structures`]: classified structures with diff and access marks
//! - [`graph`]: popup canvas with the circular graph layout
//! - [`status`]: status bar with keybindings and run state
//!
//! Each pane exports a `render_*` function plus the `*RenderData` and
//! `*ScrollState` types it takes.

mod utils;

pub mod graph;
pub mod output;
pub mod source;
pub mod status;
pub mod structures;
pub mod variables;

pub use graph::render_graph_popup;
pub use output::{render_output_pane, OutputRenderData};
pub use source::{render_source_pane, LineMark, SourceScrollState};
pub use status::{render_status_bar, StatusRenderData};
pub use structures::{render_structures_pane, StructuresRenderData, StructuresScrollState};
pub use variables::{render_variables_pane, VariablesRenderData, VariablesScrollState};
