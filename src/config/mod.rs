//! Configuration module
//!
//! Handles loading and managing configuration.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::output::OutputFormat;
use crate::utils::LogLevel;

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker count used when a definition does not set one
    pub default_threads: i64,

    /// Iterations per worker used when a definition does not set one
    pub default_iterations: i64,

    /// Per-cell script timeout in seconds
    pub timeout_secs: u64,

    /// Shell the sandbox runs scripts with
    pub shell: String,

    /// Output format (table, json, json-pretty, csv, summary)
    pub format: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_threads: 1,
            default_iterations: 1,
            timeout_secs: 30,
            shell: "sh".to_string(),
            format: "table".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Effective configuration: explicit file, else `GRIDRUN_CONFIG`, else the
    /// first file found in the standard locations, then environment overrides.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvConfig::load();

        let file = match (explicit, env.config_file.as_deref()) {
            (Some(path), _) => ConfigFile::load(path)?,
            (None, Some(path)) => ConfigFile::load(path)?,
            (None, None) => ConfigFile::load_default()?,
        };

        let config = file.app.apply_env(&env);
        config
            .validate()
            .context("Invalid configuration after environment overrides")?;
        Ok(config)
    }

    /// Apply environment overrides on top of this config
    pub fn apply_env(mut self, env: &EnvConfig) -> Self {
        if let Some(threads) = env.threads {
            self.default_threads = threads;
        }
        if let Some(iterations) = env.iterations {
            self.default_iterations = iterations;
        }
        if let Some(timeout) = env.timeout {
            self.timeout_secs = timeout;
        }
        if let Some(shell) = &env.shell {
            self.shell = shell.clone();
        }
        if let Some(format) = &env.format {
            self.format = format.clone();
        }
        if let Some(level) = &env.log_level {
            self.log_level = level.clone();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be at least 1");
        }
        if self.shell.trim().is_empty() {
            bail!("shell must not be empty");
        }
        if OutputFormat::from_str(&self.format).is_none() {
            bail!("Unknown output format: {}", self.format);
        }
        if self.log_level.parse::<LogLevel>().is_err() {
            bail!("Unknown log level: {}", self.log_level);
        }
        Ok(())
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_str(&self.format).unwrap_or(OutputFormat::Table)
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or(LogLevel::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_threads, 1);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.shell, "sh");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_overrides() {
        let env = EnvConfig {
            threads: Some(8),
            format: Some("json".to_string()),
            ..Default::default()
        };

        let config = AppConfig::default().apply_env(&env);
        assert_eq!(config.default_threads, 8);
        assert_eq!(config.default_iterations, 1);
        assert_eq!(config.output_format(), OutputFormat::Json);
    }

    #[test]
    fn test_validate_rejects_unknown_format() {
        let config = AppConfig {
            format: "xml".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridrun.yaml");
        std::fs::write(&path, "version: \"1.0\"\napp:\n  shell: bash\n  timeout_secs: 9\n").unwrap();

        let config = AppConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.shell, "bash");
        assert_eq!(config.timeout_secs, 9);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("timeout_secs: 5\n").unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.shell, "sh");
    }
}
