//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: application state, keyboard event loop, pane focus, input
//!   line and background re-runs
//! - **[`panes`]**: stateless render functions for each visible pane (source,
//!   output, variables, structures, graph popup, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with a
//! [`TraceRequest`] and a [`Sandbox`], then call [`App::run`] to start the
//! event loop.
//!
//! [`TraceRequest`]: crate::transport::TraceRequest
//! [`Sandbox`]: crate::transport::Sandbox
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
