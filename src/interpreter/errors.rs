//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], which represents everything that can
//! stop a traced script (as opposed to host-level failures in the transport).
//! Guest-visible errors render as `Kind: message`, the way the script
//! language reports uncaught exceptions.
//!
//! Two variants are control signals rather than failures:
//! [`RuntimeError::NeedsInput`] suspends the run when `input()` finds the
//! queue empty, and [`RuntimeError::Halted`] stops it when the step budget is
//! spent. Neither produces an error step.

use crate::memory::heap::HeapError;
use crate::parser::ast::SourceLocation;
use crate::parser::parser::ParseError;
use thiserror::Error;

fn with_message(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {}", message)
    }
}

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Source failed to tokenize or parse
    #[error("SyntaxError: {message} (line {})", .location.line)]
    Syntax {
        message: String,
        location: SourceLocation,
    },

    #[error("NameError: name '{name}' is not defined")]
    UndefinedName {
        name: String,
        location: SourceLocation,
    },

    #[error("TypeError: {message}")]
    TypeError {
        message: String,
        location: SourceLocation,
    },

    #[error("ValueError: {message}")]
    ValueError {
        message: String,
        location: SourceLocation,
    },

    #[error("IndexError: {message}")]
    IndexError {
        message: String,
        location: SourceLocation,
    },

    /// `key` is the repr of the missing key
    #[error("KeyError: {key}")]
    KeyError {
        key: String,
        location: SourceLocation,
    },

    #[error("AttributeError: {message}")]
    AttributeError {
        message: String,
        location: SourceLocation,
    },

    #[error("ZeroDivisionError: {message}")]
    DivisionByZero {
        message: String,
        location: SourceLocation,
    },

    /// Integers are 64-bit; results outside that range are reported here
    #[error("OverflowError: {message}")]
    Overflow {
        message: String,
        location: SourceLocation,
    },

    #[error("RecursionError: maximum recursion depth exceeded")]
    RecursionLimit { location: SourceLocation },

    #[error("MemoryError: {message}")]
    OutOfMemory {
        message: String,
        location: SourceLocation,
    },

    #[error("ModuleNotFoundError: No module named '{name}'")]
    ModuleNotFound {
        name: String,
        location: SourceLocation,
    },

    #[error("ImportError: cannot import name '{name}' from '{module}'")]
    ImportName {
        name: String,
        module: String,
        location: SourceLocation,
    },

    /// Exception raised by the script itself (`raise`, `assert`)
    #[error("{kind}{}", with_message(.message))]
    Raised {
        kind: String,
        message: String,
        location: SourceLocation,
    },

    /// Valid syntax the interpreter does not implement
    #[error("NotImplementedError: {message}")]
    Unsupported {
        message: String,
        location: SourceLocation,
    },

    /// `input()` was called with no queued input left
    #[error("input required")]
    NeedsInput { location: SourceLocation },

    /// Step budget exhausted; execution stops quietly
    #[error("execution halted")]
    Halted,
}

impl RuntimeError {
    /// Get the source location where this error occurred, if available
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            RuntimeError::Syntax { location, .. }
            | RuntimeError::UndefinedName { location, .. }
            | RuntimeError::TypeError { location, .. }
            | RuntimeError::ValueError { location, .. }
            | RuntimeError::IndexError { location, .. }
            | RuntimeError::KeyError { location, .. }
            | RuntimeError::AttributeError { location, .. }
            | RuntimeError::DivisionByZero { location, .. }
            | RuntimeError::Overflow { location, .. }
            | RuntimeError::RecursionLimit { location }
            | RuntimeError::OutOfMemory { location, .. }
            | RuntimeError::ModuleNotFound { location, .. }
            | RuntimeError::ImportName { location, .. }
            | RuntimeError::Raised { location, .. }
            | RuntimeError::Unsupported { location, .. }
            | RuntimeError::NeedsInput { location } => Some(location),
            RuntimeError::Halted => None,
        }
    }

    /// Whether this is a control signal rather than a guest-visible error
    pub fn is_control_signal(&self) -> bool {
        matches!(self, RuntimeError::NeedsInput { .. } | RuntimeError::Halted)
    }

    pub fn type_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
            location,
        }
    }

    pub fn value_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::ValueError {
            message: message.into(),
            location,
        }
    }

    pub fn index_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::IndexError {
            message: message.into(),
            location,
        }
    }

    pub fn attribute_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::AttributeError {
            message: message.into(),
            location,
        }
    }

    pub fn from_heap(err: HeapError, location: SourceLocation) -> Self {
        match err {
            HeapError::Exhausted { .. } => RuntimeError::OutOfMemory {
                message: err.to_string(),
                location,
            },
            HeapError::Unhashable(_) => RuntimeError::TypeError {
                message: err.to_string(),
                location,
            },
        }
    }
}

impl From<ParseError> for RuntimeError {
    fn from(err: ParseError) -> Self {
        RuntimeError::Syntax {
            message: err.message,
            location: err.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_style_rendering() {
        let loc = SourceLocation::new(3, 1);
        assert_eq!(
            RuntimeError::DivisionByZero {
                message: "division by zero".into(),
                location: loc
            }
            .to_string(),
            "ZeroDivisionError: division by zero"
        );
        assert_eq!(
            RuntimeError::UndefinedName {
                name: "x".into(),
                location: loc
            }
            .to_string(),
            "NameError: name 'x' is not defined"
        );
        assert_eq!(
            RuntimeError::KeyError {
                key: "'a'".into(),
                location: loc
            }
            .to_string(),
            "KeyError: 'a'"
        );
    }

    #[test]
    fn test_raised_without_message() {
        let loc = SourceLocation::new(1, 1);
        let bare = RuntimeError::Raised {
            kind: "AssertionError".into(),
            message: String::new(),
            location: loc,
        };
        assert_eq!(bare.to_string(), "AssertionError");

        let with = RuntimeError::Raised {
            kind: "ValueError".into(),
            message: "bad".into(),
            location: loc,
        };
        assert_eq!(with.to_string(), "ValueError: bad");
    }

    #[test]
    fn test_control_signals() {
        assert!(RuntimeError::Halted.is_control_signal());
        assert!(RuntimeError::NeedsInput {
            location: SourceLocation::default()
        }
        .is_control_signal());
        assert!(RuntimeError::Halted.location().is_none());
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: RuntimeError = ParseError {
            message: "invalid syntax".into(),
            location: SourceLocation::new(2, 5),
        }
        .into();
        assert_eq!(err.to_string(), "SyntaxError: invalid syntax (line 2)");
    }
}
