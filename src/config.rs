//! Tracer configuration
//!
//! [`TracerConfig`] holds every knob of a traced run. Values come from
//! [`Default`], then an optional TOML file, then command-line flags (applied
//! by the binary). The TOML shape mirrors the struct with every key optional:
//!
//! ```toml
//! step_budget = 500
//! max_depth = 10
//! max_call_depth = 500
//!
//! [filter]
//! hidden_prefixes = ["__", "_tmp"]
//! denylist = ["tracer_instance", "TrackedList"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interpreter::constants::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_OBJECTS};
use crate::interpreter::Limits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Number of steps a run may record; never below [`StepBudget::MIN`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct StepBudget(usize);

impl StepBudget {
    pub const MIN: usize = 10;
    pub const DEFAULT: usize = 1000;

    /// Clamp a requested budget up to the minimum
    pub fn new(requested: i64) -> Self {
        let clamped = usize::try_from(requested).unwrap_or(0).max(Self::MIN);
        StepBudget(clamped)
    }

    /// Budget typed by a user: anything non-numeric becomes the minimum
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<i64>() {
            Ok(n) => StepBudget::new(n),
            Err(_) => StepBudget(Self::MIN),
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for StepBudget {
    fn default() -> Self {
        StepBudget(Self::DEFAULT)
    }
}

impl From<i64> for StepBudget {
    fn from(requested: i64) -> Self {
        StepBudget::new(requested)
    }
}

impl From<StepBudget> for i64 {
    fn from(budget: StepBudget) -> Self {
        i64::try_from(budget.0).unwrap_or(i64::MAX)
    }
}

/// Which bindings stay out of step snapshots.
///
/// Names starting with any hidden prefix and names on the denylist are
/// skipped. Functions, classes, modules and built-ins are always skipped by
/// the tracer regardless of this filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableFilter {
    pub hidden_prefixes: Vec<String>,
    pub denylist: Vec<String>,
}

impl Default for VariableFilter {
    fn default() -> Self {
        VariableFilter {
            hidden_prefixes: vec!["__".to_string()],
            denylist: vec!["tracer_instance".to_string(), "TrackedList".to_string()],
        }
    }
}

impl VariableFilter {
    pub fn hides(&self, name: &str) -> bool {
        self.hidden_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
            || self.denylist.iter().any(|denied| denied == name)
    }
}

/// Settings for one traced run
#[derive(Debug, Clone, PartialEq)]
pub struct TracerConfig {
    pub step_budget: StepBudget,
    /// Nesting depth past which serialized values collapse to `"..."`
    pub max_depth: usize,
    pub max_call_depth: usize,
    pub max_objects: usize,
    pub filter: VariableFilter,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            step_budget: StepBudget::default(),
            max_depth: 10,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_objects: DEFAULT_MAX_OBJECTS,
            filter: VariableFilter::default(),
        }
    }
}

/// On-disk form; every key optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlTracerConfig {
    pub step_budget: Option<i64>,
    pub max_depth: Option<usize>,
    pub max_call_depth: Option<usize>,
    pub max_objects: Option<usize>,
    pub filter: Option<VariableFilter>,
}

impl TracerConfig {
    /// Defaults overridden by the keys present in the TOML file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded tracer config");
        Ok(parsed)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let file: TomlTracerConfig = toml::from_str(text)?;
        Ok(Self::default().merged(file))
    }

    fn merged(mut self, file: TomlTracerConfig) -> Self {
        if let Some(budget) = file.step_budget {
            self.step_budget = StepBudget::new(budget);
        }
        if let Some(depth) = file.max_depth {
            self.max_depth = depth;
        }
        if let Some(depth) = file.max_call_depth {
            self.max_call_depth = depth;
        }
        if let Some(objects) = file.max_objects {
            self.max_objects = objects;
        }
        if let Some(filter) = file.filter {
            self.filter = filter;
        }
        self
    }

    /// Interpreter resource limits
    pub fn limits(&self) -> Limits {
        Limits {
            max_call_depth: self.max_call_depth,
            max_objects: self.max_objects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_clamping() {
        assert_eq!(StepBudget::new(3).get(), 10);
        assert_eq!(StepBudget::new(-5).get(), 10);
        assert_eq!(StepBudget::new(250).get(), 250);
        assert_eq!(StepBudget::parse("abc").get(), 10);
        assert_eq!(StepBudget::parse(" 42 ").get(), 42);
        assert_eq!(StepBudget::default().get(), 1000);
    }

    #[test]
    fn test_budget_serde() {
        let budget: StepBudget = serde_json::from_str("4").unwrap();
        assert_eq!(budget.get(), 10);
        assert_eq!(serde_json::to_string(&StepBudget::new(77)).unwrap(), "77");
    }

    #[test]
    fn test_default_filter() {
        let filter = VariableFilter::default();
        assert!(filter.hides("__name__"));
        assert!(filter.hides("tracer_instance"));
        assert!(!filter.hides("_private"));
        assert!(!filter.hides("nodes"));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = TracerConfig::from_toml_str(
            "step_budget = 5\nmax_depth = 4\n[filter]\nhidden_prefixes = [\"_\"]\n",
        )
        .unwrap();
        assert_eq!(config.step_budget.get(), 10);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert!(config.filter.hides("_private"));
        // A filter table without a denylist falls back to the default one
        assert!(config.filter.hides("TrackedList"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(TracerConfig::from_toml_str("budget = 3\n").is_err());
    }
}
