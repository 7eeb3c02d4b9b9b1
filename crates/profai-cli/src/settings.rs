//! Effective CLI settings
//!
//! Config files and `PROFAI_*` variables come from `profai-config`; the
//! global flags parsed by clap are merged on top.

use anyhow::{Context, Result};
use profai_config::{ConfigLoader, GraderConfig, LimitsConfig};
use profai_grader::Grader;
use std::path::PathBuf;

/// Global flags that override the config
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub max_steps: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub no_color: bool,
}

pub struct Settings {
    pub grader: Grader,
    pub color: bool,
    pub json: bool,
}

impl Settings {
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        let config = match &overrides.config {
            Some(path) => loader
                .load_from_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?,
            None => {
                let cwd = std::env::current_dir().context("Failed to read working directory")?;
                loader
                    .load_from_directory(&cwd)
                    .context("Failed to load profai.toml")?
            }
        };
        if let Some(path) = &config.project_file {
            tracing::debug!(path = %path.display(), "loaded project config");
        }
        Ok(Self::from_config(config.settings, overrides))
    }

    fn from_config(mut config: GraderConfig, overrides: &Overrides) -> Self {
        config.merge(&GraderConfig {
            limits: Some(LimitsConfig {
                max_steps: overrides.max_steps,
                timeout_ms: overrides.timeout_ms,
                ..Default::default()
            }),
            ..Default::default()
        });

        Self {
            grader: Grader::new(config.into_limits()).with_stack_size(config.stack_size()),
            color: config.color() && !overrides.no_color,
            json: config.json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_flags_override_config() {
        let config: GraderConfig = GraderConfig {
            limits: Some(LimitsConfig {
                max_steps: Some(10),
                timeout_ms: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overrides = Overrides {
            max_steps: Some(0),
            no_color: true,
            ..Default::default()
        };

        let settings = Settings::from_config(config, &overrides);
        assert_eq!(settings.grader.limits().max_steps, None);
        assert_eq!(
            settings.grader.limits().timeout,
            Some(Duration::from_millis(10))
        );
        assert!(!settings.color);
    }
}
