//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::settings::{GraderConfig, LimitsConfig, OutputConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project config file name, searched upward from the start directory
pub const PROJECT_CONFIG_FILE: &str = "profai.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.profai/config.toml) - lowest priority
/// 2. Project config (./profai.toml) - overrides global
/// 3. Environment variables (PROFAI_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Effective settings after merging every source
    pub settings: GraderConfig,

    /// Project config file that contributed, if any
    pub project_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config path instead of `~/.profai/config.toml`
    pub fn with_global_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find profai.toml and merges it over
    /// the global config when one exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let mut settings = self.load_global_config()?;

        let project_file = find_project_file(start_dir);
        if let Some(path) = &project_file {
            settings.merge(&GraderConfig::load_from_file(path)?);
        }

        let settings = apply_env_overrides(settings)?;
        settings.validate()?;

        Ok(Config {
            settings,
            project_file,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let mut settings = self.load_global_config()?;
        settings.merge(&GraderConfig::load_from_file(config_path)?);

        let settings = apply_env_overrides(settings)?;
        settings.validate()?;

        Ok(Config {
            settings,
            project_file: Some(config_path.to_path_buf()),
        })
    }

    /// Load global configuration from ~/.profai/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GraderConfig> {
        if self.global_config_path.is_none() {
            match Self::global_config_dir() {
                Ok(dir) => self.global_config_path = Some(dir.join("config.toml")),
                // No home directory means no global config
                Err(ConfigError::HomeNotFound) => return Ok(GraderConfig::default()),
                Err(e) => return Err(e),
            }
        }

        match &self.global_config_path {
            Some(path) if path.exists() => GraderConfig::load_from_file(path),
            _ => Ok(GraderConfig::default()),
        }
    }

    /// Get the global configuration directory (~/.profai)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".profai"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn find_project_file(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|path| path.is_file())
}

/// Apply `PROFAI_*` environment variable overrides
///
/// Numeric variables must parse as unsigned integers; `PROFAI_NO_COLOR`
/// (or the conventional `NO_COLOR`) disables colored output when set.
fn apply_env_overrides(mut config: GraderConfig) -> ConfigResult<GraderConfig> {
    if let Some(steps) = env_number::<u64>("PROFAI_MAX_STEPS")? {
        limits_mut(&mut config).max_steps = Some(steps);
    }
    if let Some(ms) = env_number::<u64>("PROFAI_TIMEOUT_MS")? {
        limits_mut(&mut config).timeout_ms = Some(ms);
    }
    if let Some(depth) = env_number::<usize>("PROFAI_MAX_CALL_DEPTH")? {
        limits_mut(&mut config).max_call_depth = Some(depth);
    }
    if let Some(lines) = env_number::<usize>("PROFAI_MAX_LOG_LINES")? {
        limits_mut(&mut config).max_log_lines = Some(lines);
    }
    if env::var_os("PROFAI_NO_COLOR").is_some() || env::var_os("NO_COLOR").is_some() {
        config
            .output
            .get_or_insert_with(OutputConfig::default)
            .color = Some(false);
    }
    Ok(config)
}

fn limits_mut(config: &mut GraderConfig) -> &mut LimitsConfig {
    config.limits.get_or_insert_with(LimitsConfig::default)
}

fn env_number<T: std::str::FromStr>(name: &str) -> ConfigResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name.to_string(),
                reason: format!("expected a non-negative integer, got '{}'", raw),
            }),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Directory holding the project config file
    pub fn project_root(&self) -> Option<&Path> {
        self.project_file.as_deref().and_then(Path::parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_project_file_walks_up() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(PROJECT_CONFIG_FILE), "").unwrap();

        let found = find_project_file(&nested).unwrap();
        assert_eq!(found, temp.path().join(PROJECT_CONFIG_FILE));
    }

    #[test]
    fn test_missing_global_config_is_default() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_config_path(temp.path().join("absent.toml"));
        assert_eq!(loader.load_global_config().unwrap(), GraderConfig::default());
    }
}
