//! gridrun - run one test across a threads x iterations grid
//!
//! ## Usage
//!
//! ```bash
//! # Run a definition with the grid size it declares
//! gridrun run smoke.yaml
//!
//! # Override the grid and emit CSV
//! gridrun run smoke.yaml --threads 8 --iterations 25 --format csv
//!
//! # Inspect the compiled script
//! gridrun script smoke.yaml
//!
//! # Show configuration
//! gridrun config --example
//! gridrun env
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use gridrun::cli::{self, Args};
use gridrun::config::{self, AppConfig, ConfigFile};
use gridrun::output::{write_summary_to_file, OutputFormat, ResultFormatter};
use gridrun::utils::{init_logger, LogLevel};
use gridrun::{
    CancelToken, GridDispatcher, ScriptCompiler, ShellCompiler, ShellSandboxFactory,
    TestDefinition,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        cli::Command::Run(run_args) => {
            run_test(run_args, args.config.as_deref(), args.verbose).await
        }
        cli::Command::Script(script_args) => {
            print_script(script_args, args.config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Env => {
            config::print_env_help();
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Config(config_args) => {
            show_config(config_args, args.config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_test(
    args: cli::RunArgs,
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<ExitCode> {
    let config = AppConfig::resolve(config_path)?;
    init_logger(if verbose {
        LogLevel::Debug
    } else {
        config.log_level()
    });

    let mut definition = TestDefinition::load_with_defaults(
        &args.file,
        config.default_threads,
        config.default_iterations,
    )?;
    if let Some(threads) = args.threads {
        definition.thread_count = threads;
    }
    if let Some(iterations) = args.iterations {
        definition.iteration_count = iterations;
    }

    let format = match args.format.as_deref() {
        Some(name) => match OutputFormat::from_str(name) {
            Some(format) => format,
            None => bail!("Unknown output format: {name}"),
        },
        None => config.output_format(),
    };

    let factory = ShellSandboxFactory::new(args.shell.unwrap_or(config.shell))
        .with_timeout(args.timeout.unwrap_or(config.timeout_secs));
    let dispatcher = GridDispatcher::new(Arc::new(ShellCompiler::new()), Arc::new(factory));

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight cells");
                cancel.cancel();
            }
        });
    }

    info!("Running {}, {} cells", definition, definition.cell_count());
    let summary = dispatcher.run_with_cancel(&definition, &cancel).await;
    info!(
        "Test {} completed in {}ms - Success: {}/{} ({:.1}%)",
        summary.name,
        summary.duration_ms,
        summary.success,
        summary.total,
        summary.pass_rate()
    );

    println!("{}", ResultFormatter::new(format).format_summary(&summary)?);

    if let Some(path) = &args.output {
        write_summary_to_file(path, &summary, format)?;
        info!("Results saved to {}", path.display());
    }

    match summary.ensure_all_passed() {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_script(args: cli::ScriptArgs, config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::resolve(config_path)?;
    let definition = TestDefinition::load_with_defaults(
        &args.file,
        config.default_threads,
        config.default_iterations,
    )?;

    print!("{}", ShellCompiler::new().compile(&definition)?);
    Ok(())
}

fn show_config(args: cli::ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    let file = if args.example {
        ConfigFile::example()
    } else {
        ConfigFile {
            app: AppConfig::resolve(config_path)?,
            ..Default::default()
        }
    };

    print!("{}", file.render(Path::new("config.yaml"))?);
    Ok(())
}
