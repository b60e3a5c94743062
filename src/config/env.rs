//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "GRIDRUN";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Default worker count from GRIDRUN_THREADS
    pub threads: Option<i64>,
    /// Default iterations from GRIDRUN_ITERATIONS
    pub iterations: Option<i64>,
    /// Cell timeout from GRIDRUN_TIMEOUT
    pub timeout: Option<u64>,
    /// Sandbox shell from GRIDRUN_SHELL
    pub shell: Option<String>,
    /// Output format from GRIDRUN_FORMAT
    pub format: Option<String>,
    /// Log level from GRIDRUN_LOG_LEVEL
    pub log_level: Option<String>,
    /// Config file from GRIDRUN_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            threads: get_env_parse("THREADS"),
            iterations: get_env_parse("ITERATIONS"),
            timeout: get_env_parse("TIMEOUT"),
            shell: get_env("SHELL"),
            format: get_env("FORMAT"),
            log_level: get_env("LOG_LEVEL"),
            config_file: get_env("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.threads.is_some()
            || self.iterations.is_some()
            || self.timeout.is_some()
            || self.shell.is_some()
            || self.format.is_some()
            || self.log_level.is_some()
            || self.config_file.is_some()
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

/// Print all GRIDRUN environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_THREADS      Default worker count");
    println!("  {ENV_PREFIX}_ITERATIONS   Default iterations per worker");
    println!("  {ENV_PREFIX}_TIMEOUT      Per-cell script timeout in seconds");
    println!("  {ENV_PREFIX}_SHELL        Shell used to run compiled scripts");
    println!("  {ENV_PREFIX}_FORMAT       Output format (table, json, json-pretty, csv, summary)");
    println!("  {ENV_PREFIX}_LOG_LEVEL    Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_THREADS=4");
    println!("  export {ENV_PREFIX}_ITERATIONS=25");
    println!("  gridrun run smoke.yaml");
}
