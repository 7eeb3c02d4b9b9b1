//! ProfAI configuration
//!
//! Settings are merged in the following order (later overrides earlier):
//! 1. Built-in defaults (the restrictive grading budget)
//! 2. User config (`~/.profai/config.toml`)
//! 3. Project config (`profai.toml`, searched upward from the working directory)
//! 4. Environment variables (`PROFAI_*`)
//! 5. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use profai_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! let limits = config.settings.into_limits();
//! ```

pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use loader::{Config, ConfigLoader, PROJECT_CONFIG_FILE};
pub use settings::{GraderConfig, LimitsConfig, OutputConfig, WorkerConfig};
