//! Execution snapshots
//!
//! A traced run produces one [`Step`] per statement boundary. Each step
//! carries everything a viewer needs to render that moment without access to
//! the interpreter: the line, cumulative stdout, a serialized copy of the
//! visible variables, and the tracked-list accesses performed since the
//! previous step.
//!
//! - [`value`]: the [`SerializedValue`] wire shape
//! - [`serializer`]: heap → [`SerializedValue`] conversion with cycle and
//!   depth guards
//! - [`tracer`]: the statement-boundary hook that records steps

pub mod serializer;
pub mod tracer;
pub mod value;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
pub use value::SerializedValue;

/// Captured stdout of the guest program
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    text: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer::default()
    }

    /// Append text exactly as written (no implicit newline)
    pub fn write(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Complete lines, without a trailing empty line for output that ended
    /// with a newline
    pub fn lines(text: &str) -> Vec<String> {
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        if lines.last().is_some_and(|s| s.is_empty()) {
            lines.pop();
        }
        lines
    }
}

/// Whether a tracked-list access read or wrote an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Read,
    Write,
}

/// One integer-index access on a tracked list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEvent {
    pub kind: AccessKind,
    pub container_id: String,
    /// Normalized index (`len + i` for negative `i`); may still be out of
    /// range if the access failed
    pub index: i64,
}

/// A variable as captured in a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBinding {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: SerializedValue,
    /// Identity, present for lists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// The program state at one statement boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub line: usize,
    pub stdout: String,
    pub variables: IndexMap<String, VariableBinding>,
    #[serde(default)]
    pub accesses: Vec<AccessEvent>,
    pub explanation: String,
}

impl Step {
    /// Explanation of the step appended after the script ran to completion
    pub const FINISHED: &'static str = "Execution Finished";

    pub fn is_error(&self) -> bool {
        self.explanation.starts_with("Error:")
    }
}

/// What the sandbox hands back: the raw step list (possibly ending in a
/// synthetic error step) and the input-suspension flag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrace {
    pub steps: Vec<Step>,
    #[serde(default)]
    pub needs_input: bool,
}

/// Final result delivered to clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_input: bool,
}

impl Trace {
    /// A trace with no steps that only reports an error
    pub fn failed(message: impl Into<String>) -> Self {
        Trace {
            steps: Vec::new(),
            error: Some(message.into()),
            needs_input: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_lines() {
        let mut out = OutputBuffer::new();
        out.write("a\nb");
        out.write("c\n");
        assert_eq!(out.as_str(), "a\nbc\n");
        assert_eq!(OutputBuffer::lines(out.as_str()), vec!["a", "bc"]);
    }

    #[test]
    fn test_step_wire_shape() {
        let mut variables = IndexMap::new();
        variables.insert(
            "x".to_string(),
            VariableBinding {
                type_name: "int".into(),
                value: SerializedValue::Int(5),
                id: None,
            },
        );
        let step = Step {
            line: 3,
            stdout: String::new(),
            variables,
            accesses: vec![AccessEvent {
                kind: AccessKind::Read,
                container_id: "4".into(),
                index: 0,
            }],
            explanation: "Line 3".into(),
        };

        assert_eq!(
            serde_json::to_value(&step).unwrap(),
            json!({
                "line": 3,
                "stdout": "",
                "variables": {"x": {"type": "int", "value": 5}},
                "accesses": [{"kind": "read", "containerId": "4", "index": 0}],
                "explanation": "Line 3"
            })
        );
    }

    #[test]
    fn test_trace_omits_unset_fields() {
        let trace = Trace::default();
        assert_eq!(serde_json::to_value(&trace).unwrap(), json!({"steps": []}));

        let trace: Trace =
            serde_json::from_value(json!({"steps": [], "needsInput": true})).unwrap();
        assert!(trace.needs_input);
        assert_eq!(trace.error, None);
    }
}
