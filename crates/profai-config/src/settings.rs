//! Grader settings (`profai.toml`)
//!
//! ```toml
//! [limits]
//! max_steps = 1000000     # 0 disables the step budget
//! timeout_ms = 2000       # 0 disables the wall-clock budget
//! max_call_depth = 10000
//! max_log_lines = 200
//!
//! [worker]
//! stack_size_mb = 256
//!
//! [output]
//! color = true
//! json = false
//! ```

use crate::{ConfigError, ConfigResult};
use profai_script::ExecutionLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Deepest call nesting a config may request
const MAX_CALL_DEPTH_CEILING: usize = 100_000;

/// Largest worker stack a config may request, in MiB
const MAX_STACK_SIZE_MB: usize = 4096;

/// Default worker stack, in MiB
const DEFAULT_STACK_SIZE_MB: usize = 256;

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GraderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<LimitsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Execution budget per compile step and per test case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_call_depth: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_log_lines: Option<usize>,
}

/// Grading worker thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_size_mb: Option<usize>,
}

/// Report rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    /// Print machine-readable JSON instead of a colored report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl GraderConfig {
    /// Load and validate a config file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(depth) = self.limits.as_ref().and_then(|l| l.max_call_depth) {
            if depth == 0 || depth > MAX_CALL_DEPTH_CEILING {
                return Err(ConfigError::InvalidValue {
                    field: "limits.max_call_depth".to_string(),
                    reason: format!("must be between 1 and {}, got {}", MAX_CALL_DEPTH_CEILING, depth),
                });
            }
        }
        if let Some(size) = self.worker.as_ref().and_then(|w| w.stack_size_mb) {
            if size == 0 || size > MAX_STACK_SIZE_MB {
                return Err(ConfigError::InvalidValue {
                    field: "worker.stack_size_mb".to_string(),
                    reason: format!("must be between 1 and {}, got {}", MAX_STACK_SIZE_MB, size),
                });
            }
        }
        Ok(())
    }

    /// Merge another config into this one
    ///
    /// Fields set in `other` win; unset fields keep this config's value.
    pub fn merge(&mut self, other: &GraderConfig) {
        if let Some(theirs) = &other.limits {
            let ours = self.limits.get_or_insert_with(Default::default);
            merge_field(&mut ours.max_steps, theirs.max_steps);
            merge_field(&mut ours.timeout_ms, theirs.timeout_ms);
            merge_field(&mut ours.max_call_depth, theirs.max_call_depth);
            merge_field(&mut ours.max_log_lines, theirs.max_log_lines);
        }
        if let Some(theirs) = &other.worker {
            let ours = self.worker.get_or_insert_with(Default::default);
            merge_field(&mut ours.stack_size_mb, theirs.stack_size_mb);
        }
        if let Some(theirs) = &other.output {
            let ours = self.output.get_or_insert_with(Default::default);
            merge_field(&mut ours.color, theirs.color);
            merge_field(&mut ours.json, theirs.json);
        }
    }

    /// Execution limits, starting from the restrictive preset
    pub fn into_limits(&self) -> ExecutionLimits {
        let mut limits = ExecutionLimits::restrictive();
        let Some(config) = &self.limits else {
            return limits;
        };
        if let Some(steps) = config.max_steps {
            limits.max_steps = (steps > 0).then_some(steps);
        }
        if let Some(ms) = config.timeout_ms {
            limits.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(depth) = config.max_call_depth {
            limits.max_call_depth = depth;
        }
        if let Some(lines) = config.max_log_lines {
            limits.max_log_lines = lines;
        }
        limits
    }

    /// Worker stack size in bytes
    pub fn stack_size(&self) -> usize {
        self.worker
            .as_ref()
            .and_then(|w| w.stack_size_mb)
            .unwrap_or(DEFAULT_STACK_SIZE_MB)
            * 1024
            * 1024
    }

    pub fn color(&self) -> bool {
        self.output.as_ref().and_then(|o| o.color).unwrap_or(true)
    }

    pub fn json(&self) -> bool {
        self.output.as_ref().and_then(|o| o.json).unwrap_or(false)
    }
}

fn merge_field<T: Copy>(ours: &mut Option<T>, theirs: Option<T>) {
    if theirs.is_some() {
        *ours = theirs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[limits]
max_steps = 5000
timeout_ms = 0
max_call_depth = 50
max_log_lines = 10

[worker]
stack_size_mb = 64

[output]
color = false
json = true
"#;
        let config: GraderConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());

        let limits = config.into_limits();
        assert_eq!(limits.max_steps, Some(5000));
        assert_eq!(limits.timeout, None);
        assert_eq!(limits.max_call_depth, 50);
        assert_eq!(limits.max_log_lines, 10);
        assert_eq!(config.stack_size(), 64 * 1024 * 1024);
        assert!(!config.color());
        assert!(config.json());
    }

    #[test]
    fn test_defaults_are_restrictive() {
        let config = GraderConfig::default();
        assert_eq!(config.into_limits(), ExecutionLimits::restrictive());
        assert_eq!(config.stack_size(), DEFAULT_STACK_SIZE_MB * 1024 * 1024);
        assert!(config.color());
        assert!(!config.json());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<GraderConfig, _> = toml::from_str("[limits]\nmax_stepz = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_call_depth_rejected() {
        let config = GraderConfig {
            limits: Some(LimitsConfig {
                max_call_depth: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "limits.max_call_depth"
        ));
    }

    #[test]
    fn test_merge_is_field_wise() {
        let mut base: GraderConfig =
            toml::from_str("[limits]\nmax_steps = 10\nmax_call_depth = 20\n").unwrap();
        let over: GraderConfig = toml::from_str("[limits]\nmax_steps = 99\n").unwrap();
        base.merge(&over);

        let limits = base.limits.unwrap();
        assert_eq!(limits.max_steps, Some(99));
        assert_eq!(limits.max_call_depth, Some(20));
    }
}
