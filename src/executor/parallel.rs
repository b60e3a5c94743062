//! Grid dispatch
//!
//! Fans a test definition out over `threads x iterations` cells: one tokio
//! task per thread, each running its iterations in order.

use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{ResultAggregator, RunExecutor};
use crate::models::{RunCoordinate, TestDefinition, TestSummary};
use crate::sandbox::{SandboxFactory, ScriptCompiler};
use crate::utils::{LogHook, Timer};

/// Cooperative cancellation shared between a caller and a running grid.
///
/// Workers check it before starting each iteration. A sandbox that is
/// already running is left to finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs a test definition across its whole grid.
///
/// `run` always returns a complete [`TestSummary`]; a failing cell is
/// counted in `summary.failure` and never turns into an error of the run
/// itself. Callers that want one should use
/// [`TestSummary::ensure_all_passed`].
#[derive(Clone)]
pub struct GridDispatcher {
    executor: Arc<RunExecutor>,
}

impl GridDispatcher {
    pub fn new(compiler: Arc<dyn ScriptCompiler>, factory: Arc<dyn SandboxFactory>) -> Self {
        Self::from_executor(RunExecutor::new(compiler, factory))
    }

    pub fn from_executor(executor: RunExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    pub fn with_log(self, log: LogHook) -> Self {
        let executor = (*self.executor).clone().with_log(log);
        Self::from_executor(executor)
    }

    pub async fn run(&self, definition: &TestDefinition) -> TestSummary {
        self.run_with_cancel(definition, &CancelToken::new()).await
    }

    pub async fn run_with_cancel(
        &self,
        definition: &TestDefinition,
        cancel: &CancelToken,
    ) -> TestSummary {
        if definition.steps.is_empty() {
            return TestSummary::empty(&definition.name);
        }

        let log = self.executor.log().clone();
        let threads = definition.effective_threads();
        let iterations = definition.effective_iterations();
        let timer = Timer::start();

        log.debug(|| {
            format!(
                "test [{}] start, {threads} threads x {iterations} iterations",
                definition.name
            )
        });

        let definition = Arc::new(definition.clone());
        let aggregator = Arc::new(ResultAggregator::with_capacity(
            &definition.name,
            threads.saturating_mul(iterations),
        ));

        let handles: Vec<_> = (0..threads)
            .map(|thread_index| {
                let executor = self.executor.clone();
                let definition = definition.clone();
                let aggregator = aggregator.clone();
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    for iteration_index in 0..iterations {
                        if cancel.is_cancelled() {
                            return false;
                        }
                        let coordinate = RunCoordinate::new(thread_index, iteration_index);
                        let outcome = executor.execute_one(&definition, coordinate).await;
                        aggregator.record(outcome).await;
                    }
                    true
                })
            })
            .collect();

        let mut completed = true;
        for (thread_index, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(finished) => completed &= finished,
                Err(e) => {
                    completed = false;
                    log.error(|| {
                        format!(
                            "test [{}] [thread-{thread_index}] worker aborted: {e}",
                            definition.name
                        )
                    });
                }
            }
        }

        let mut summary = aggregator.into_summary().await;
        summary.cancelled = cancel.is_cancelled() && !completed;
        summary.duration_ms = timer.elapsed_ms();

        log.debug(|| {
            format!(
                "test [{}] end, use: {}ms",
                definition.name, summary.duration_ms
            )
        });

        summary
    }
}
