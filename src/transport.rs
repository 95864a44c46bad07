//! Trace transport boundary
//!
//! A [`TraceRequest`] goes to a [`Sandbox`], which runs the script and hands
//! back the raw JSON document `{"steps": [...], "needsInput": bool}`.
//! [`run_code`] turns that document into the client-facing [`Trace`]:
//!
//! - a trailing `Error: ...` step is removed and becomes `Trace.error`
//! - no steps and no input suspension becomes `"No execution steps captured."`
//! - a sandbox that fails or returns nothing usable becomes a generic error
//!
//! Resuming after `needsInput` means sending a new request with the same
//! source and budget and one more input ([`TraceRequest::resumed`]). The run
//! is replayed from the start, so this is only faithful for scripts that are
//! deterministic given their inputs.

use std::any::Any;
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{StepBudget, TracerConfig};
use crate::snapshot::tracer::trace_program;
use crate::snapshot::{RawTrace, Trace};

/// Stack for the worker thread; deep guest recursion nests deeply in the
/// tree-walking interpreter
pub const WORKER_STACK_SIZE: usize = 256 * 1024 * 1024;

pub const NO_STEPS_MESSAGE: &str = "No execution steps captured.";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Execution failed: could not start worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Execution failed: {0}")]
    Panicked(String),

    #[error("Execution returned no output.")]
    EmptyOutput,

    #[error("Execution failed: malformed trace document: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// What the caller sends to the sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRequest {
    pub source: String,
    #[serde(default)]
    pub step_budget: StepBudget,
    #[serde(default)]
    pub inputs: Vec<String>,
}

impl TraceRequest {
    pub fn new(source: impl Into<String>, step_budget: StepBudget, inputs: Vec<String>) -> Self {
        TraceRequest {
            source: source.into(),
            step_budget,
            inputs,
        }
    }

    /// The request that resumes a run suspended on `input()`
    pub fn resumed(&self, input: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.inputs.push(input.into());
        next
    }
}

/// Something that can execute a traced run and return its raw JSON
pub trait Sandbox {
    fn execute(&self, request: &TraceRequest) -> Result<String, TransportError>;
}

/// Runs the tracer in this process, on a dedicated worker thread
#[derive(Debug, Clone, Default)]
pub struct InProcessSandbox {
    config: TracerConfig,
}

impl InProcessSandbox {
    /// `config` supplies everything but the step budget, which comes from
    /// each request
    pub fn new(config: TracerConfig) -> Self {
        InProcessSandbox { config }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "interpreter panicked".to_string()
    }
}

impl Sandbox for InProcessSandbox {
    fn execute(&self, request: &TraceRequest) -> Result<String, TransportError> {
        let config = TracerConfig {
            step_budget: request.step_budget,
            ..self.config.clone()
        };
        let source = request.source.clone();
        let inputs = request.inputs.clone();

        let worker = thread::Builder::new()
            .name("stepscope-trace".into())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let raw = trace_program(&source, &inputs, &config);
                serde_json::to_string(&raw)
            })
            .map_err(TransportError::Spawn)?;

        let document = worker
            .join()
            .map_err(|payload| TransportError::Panicked(panic_message(payload)))?
            .map_err(TransportError::Malformed)?;
        Ok(document)
    }
}

/// Parse a raw trace document and apply the client-facing rules
pub fn finalize(document: &str) -> Result<Trace, TransportError> {
    if document.trim().is_empty() {
        return Err(TransportError::EmptyOutput);
    }
    let RawTrace {
        mut steps,
        needs_input,
    } = serde_json::from_str(document).map_err(TransportError::Malformed)?;

    if steps.last().is_some_and(|step| step.is_error()) {
        let error = steps.pop().map(|step| step.explanation);
        return Ok(Trace {
            steps,
            error,
            needs_input: false,
        });
    }
    if steps.is_empty() && !needs_input {
        return Ok(Trace::failed(NO_STEPS_MESSAGE));
    }
    Ok(Trace {
        steps,
        error: None,
        needs_input,
    })
}

/// Execute `request` through `sandbox` and build the client-facing trace.
/// Never fails: boundary failures are reported in `Trace.error`.
pub fn run_code(sandbox: &dyn Sandbox, request: &TraceRequest) -> Trace {
    tracing::info!(
        budget = request.step_budget.get(),
        inputs = request.inputs.len(),
        "running trace request"
    );
    match sandbox.execute(request).and_then(|document| finalize(&document)) {
        Ok(trace) => trace,
        Err(err) => {
            tracing::warn!(error = %err, "trace transport failed");
            Trace::failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedSandbox(&'static str);

    impl Sandbox for FixedSandbox {
        fn execute(&self, _request: &TraceRequest) -> Result<String, TransportError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenSandbox;

    impl Sandbox for BrokenSandbox {
        fn execute(&self, _request: &TraceRequest) -> Result<String, TransportError> {
            Err(TransportError::Panicked("boom".into()))
        }
    }

    fn request() -> TraceRequest {
        TraceRequest::new("x = 1\n", StepBudget::default(), Vec::new())
    }

    fn step(explanation: &str) -> serde_json::Value {
        json!({"line": 0, "stdout": "", "variables": {}, "accesses": [], "explanation": explanation})
    }

    #[test]
    fn test_error_step_is_promoted() {
        let document = json!({"steps": [step("Line 1"), step("Error: NameError: name 'y' is not defined")], "needsInput": false}).to_string();
        let trace = finalize(&document).unwrap();
        assert_eq!(trace.steps.len(), 1);
        assert_eq!(
            trace.error.as_deref(),
            Some("Error: NameError: name 'y' is not defined")
        );
    }

    #[test]
    fn test_empty_trace_reports_no_steps() {
        let trace = finalize(r#"{"steps": [], "needsInput": false}"#).unwrap();
        assert_eq!(trace.error.as_deref(), Some(NO_STEPS_MESSAGE));

        let suspended = finalize(r#"{"steps": [], "needsInput": true}"#).unwrap();
        assert!(suspended.needs_input);
        assert_eq!(suspended.error, None);
    }

    #[test]
    fn test_boundary_failures() {
        let trace = run_code(&FixedSandbox(""), &request());
        assert_eq!(trace.error.as_deref(), Some("Execution returned no output."));

        let trace = run_code(&FixedSandbox("not json"), &request());
        assert!(trace.error.unwrap().starts_with("Execution failed"));

        let trace = run_code(&BrokenSandbox, &request());
        assert_eq!(trace.error.as_deref(), Some("Execution failed: boom"));
        assert!(trace.steps.is_empty());
    }

    #[test]
    fn test_request_wire_shape_and_resume() {
        let request: TraceRequest =
            serde_json::from_value(json!({"source": "x", "stepBudget": 3, "inputs": ["a"]})).unwrap();
        assert_eq!(request.step_budget.get(), 10);

        let next = request.resumed("b");
        assert_eq!(next.inputs, vec!["a", "b"]);
        assert_eq!(next.source, request.source);
        assert_eq!(next.step_budget, request.step_budget);
    }

    #[test]
    fn test_in_process_round_trip() {
        let sandbox = InProcessSandbox::default();
        let trace = run_code(&sandbox, &request());
        assert_eq!(trace.error, None);
        assert_eq!(trace.steps.last().unwrap().explanation, "Execution Finished");
    }
}
