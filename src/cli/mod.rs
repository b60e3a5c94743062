//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run a test definition across a threads x iterations grid of sandboxes
#[derive(Parser, Debug)]
#[command(name = "gridrun")]
#[command(version)]
#[command(about = "Run one test across a threads x iterations grid of isolated sandboxes")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose (debug) output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a test definition
    Run(RunArgs),

    /// Print the script a test definition compiles to
    Script(ScriptArgs),

    /// Show supported environment variables
    Env,

    /// Show effective or example configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Test definition file (YAML or JSON)
    pub file: PathBuf,

    /// Number of parallel workers (values <= 0 run as 1)
    #[arg(short, long, allow_negative_numbers = true)]
    pub threads: Option<i64>,

    /// Iterations per worker (values <= 0 run as 1)
    #[arg(short, long, allow_negative_numbers = true)]
    pub iterations: Option<i64>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Shell used to run the compiled script
    #[arg(long)]
    pub shell: Option<String>,

    /// Per-cell timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments for script command
#[derive(Parser, Debug)]
pub struct ScriptArgs {
    /// Test definition file (YAML or JSON)
    pub file: PathBuf,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print an example configuration instead of the effective one
    #[arg(short, long)]
    pub example: bool,
}
