//! gridrun - matrixed test execution engine
//!
//! Runs one test definition across a grid of `threads x iterations` cells.
//! Every cell compiles the test into a script and runs it in a freshly
//! created sandbox; outcomes are aggregated into a [`TestSummary`].
//!
//! ## Contract
//!
//! [`GridDispatcher::run`] always returns a summary. Cell failures are
//! counted in [`TestSummary::failure`] and are never raised as an error of
//! the run itself; call [`TestSummary::ensure_all_passed`] to get one.
//!
//! ```no_run
//! use std::sync::Arc;
//! use gridrun::{GridDispatcher, ShellCompiler, ShellSandboxFactory, TestDefinition, TestStep};
//!
//! # async fn demo() {
//! let definition = TestDefinition::new("smoke")
//!     .with_step(TestStep::new("echo 42"))
//!     .with_threads(3)
//!     .with_iterations(2);
//!
//! let dispatcher = GridDispatcher::new(
//!     Arc::new(ShellCompiler::new()),
//!     Arc::new(ShellSandboxFactory::default()),
//! );
//! let summary = dispatcher.run(&definition).await;
//! assert_eq!(summary.total, 6);
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod executor;
pub mod models;
pub mod output;
pub mod sandbox;
pub mod utils;

pub use executor::{CancelToken, GridDispatcher, ResultAggregator, RunExecutor};
pub use models::{
    CellError, CellResult, GridError, RunCoordinate, RunOutcome, TestDefinition, TestStep,
    TestSummary,
};
pub use sandbox::{Sandbox, SandboxFactory, ScriptCompiler, ShellCompiler, ShellSandboxFactory};
pub use utils::{LogHook, NoopLogger, RunLogger, TracingLogger};
