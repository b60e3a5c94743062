//! Single cell execution
//!
//! Compiles the test, builds a fresh sandbox, runs the script and wraps
//! whatever happened into a [`RunOutcome`].

use futures::FutureExt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::models::{CellError, RunCoordinate, RunOutcome, TestDefinition};
use crate::sandbox::{SandboxFactory, ScriptCompiler};
use crate::utils::{LogHook, Timer};

/// Runs exactly one grid cell
#[derive(Clone)]
pub struct RunExecutor {
    compiler: Arc<dyn ScriptCompiler>,
    factory: Arc<dyn SandboxFactory>,
    log: LogHook,
}

impl RunExecutor {
    pub fn new(compiler: Arc<dyn ScriptCompiler>, factory: Arc<dyn SandboxFactory>) -> Self {
        Self {
            compiler,
            factory,
            log: LogHook::tracing(),
        }
    }

    pub fn with_log(mut self, log: LogHook) -> Self {
        self.log = log;
        self
    }

    pub(crate) fn log(&self) -> &LogHook {
        &self.log
    }

    /// Execute one cell.
    ///
    /// Never fails: compilation, sandbox construction and execution errors
    /// all end up in the returned outcome, and so does a panic in any of
    /// the three collaborators.
    pub async fn execute_one(
        &self,
        definition: &TestDefinition,
        coordinate: RunCoordinate,
    ) -> RunOutcome {
        let timer = Timer::start();
        let thread_name = coordinate.thread_name();
        let iteration_name = coordinate.iteration_name();

        self.log.debug(|| {
            format!(
                "test [{}] [{thread_name}] [{iteration_name}] start",
                definition.name
            )
        });

        let outcome = match self.attempt(definition, &coordinate).await {
            Ok(value) => {
                RunOutcome::success(coordinate, value, timer.started_at(), timer.elapsed_ms())
            }
            Err(error) => {
                RunOutcome::failure(coordinate, error, timer.started_at(), timer.elapsed_ms())
            }
        };

        match outcome.error() {
            Some(error) => self.log.error(|| {
                format!(
                    "test [{}] [{thread_name}] [{iteration_name}] error: {error}",
                    definition.name
                )
            }),
            None => self.log.debug(|| {
                format!(
                    "test [{}] [{thread_name}] [{iteration_name}] end, use: {}ms",
                    definition.name, outcome.duration_ms
                )
            }),
        }

        outcome
    }

    async fn attempt(
        &self,
        definition: &TestDefinition,
        coordinate: &RunCoordinate,
    ) -> Result<serde_json::Value, CellError> {
        let script = catch_unwind(AssertUnwindSafe(|| self.compiler.compile(definition)))
            .map_err(|panic| {
                CellError::Compilation(format!(
                    "compiler panicked: {}",
                    panic_message(panic.as_ref())
                ))
            })?
            .map_err(|e| CellError::Compilation(format!("{e:#}")))?;

        let mut sandbox = catch_unwind(AssertUnwindSafe(|| self.factory.create(coordinate)))
            .map_err(|panic| {
                CellError::SandboxConstruction(format!(
                    "factory panicked: {}",
                    panic_message(panic.as_ref())
                ))
            })?
            .map_err(|e| CellError::SandboxConstruction(format!("{e:#}")))?;

        let script = script.as_str();
        let sandbox_ref = sandbox.as_mut();
        let run = catch_unwind(AssertUnwindSafe(move || {
            let sandbox_ref = sandbox_ref;
            sandbox_ref.run(script)
        }))
        .map_err(|panic| sandbox_panicked(panic.as_ref()))?;

        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CellError::Execution(format!("{e:#}"))),
            Err(panic) => Err(sandbox_panicked(panic.as_ref())),
        }
    }
}

fn sandbox_panicked(payload: &(dyn std::any::Any + Send)) -> CellError {
    CellError::Execution(format!("sandbox panicked: {}", panic_message(payload)))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
