//! Cell outcome and grid summary models
//!
//! Defines grid coordinates, per-cell outcomes, and the summary a run
//! produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Position of one cell in the grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunCoordinate {
    pub thread_index: usize,
    pub iteration_index: usize,
}

impl RunCoordinate {
    pub fn new(thread_index: usize, iteration_index: usize) -> Self {
        Self {
            thread_index,
            iteration_index,
        }
    }

    /// Label of the worker, e.g. `thread-0`
    pub fn thread_name(&self) -> String {
        format!("thread-{}", self.thread_index)
    }

    /// Label of the iteration, e.g. `for-1`
    pub fn iteration_name(&self) -> String {
        format!("for-{}", self.iteration_index)
    }
}

impl fmt::Display for RunCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] [{}]", self.thread_name(), self.iteration_name())
    }
}

/// Why a cell failed
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CellError {
    #[error("Compilation failed: {0}")]
    Compilation(String),

    #[error("Sandbox construction failed: {0}")]
    SandboxConstruction(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl CellError {
    pub fn kind(&self) -> &'static str {
        match self {
            CellError::Compilation(_) => "compilation",
            CellError::SandboxConstruction(_) => "sandbox_construction",
            CellError::Execution(_) => "execution",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CellError::Compilation(m)
            | CellError::SandboxConstruction(m)
            | CellError::Execution(m) => m,
        }
    }
}

/// Value or failure of a cell. Exactly one is present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CellResult {
    Success { value: Value },
    Failure { error: CellError },
}

/// Recorded result of one cell
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub coordinate: RunCoordinate,
    pub result: CellResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn success(
        coordinate: RunCoordinate,
        value: Value,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            coordinate,
            result: CellResult::Success { value },
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        }
    }

    pub fn failure(
        coordinate: RunCoordinate,
        error: CellError,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            coordinate,
            result: CellResult::Failure { error },
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, CellResult::Success { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.result {
            CellResult::Success { value } => Some(value),
            CellResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&CellError> {
        match &self.result {
            CellResult::Success { .. } => None,
            CellResult::Failure { error } => Some(error),
        }
    }

    pub fn symbol(&self) -> &'static str {
        if self.is_success() {
            "✓"
        } else {
            "✗"
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.symbol(),
            self.coordinate,
            self.duration_ms
        )?;
        match &self.result {
            CellResult::Success { value } => write!(f, " = {value}"),
            CellResult::Failure { error } => write!(f, " - {error}"),
        }
    }
}

/// Run-level error derived from a finished summary on request
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GridError {
    #[error("{failed} of {total} cells failed in test '{name}'")]
    CellsFailed {
        name: String,
        failed: usize,
        total: usize,
    },

    #[error("test '{name}' was cancelled after {completed} cells")]
    Cancelled { name: String, completed: usize },
}

/// Aggregated counts and outcome records of one grid run.
///
/// A run always yields a summary: individual cell failures are counted in
/// `failure`, never reported as a run-level error. Use
/// [`TestSummary::ensure_all_passed`] to turn them into one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub name: String,
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    #[serde(default)]
    pub cancelled: bool,
    pub duration_ms: u64,
    /// Completion order; not deterministic across threads
    pub records: Vec<RunOutcome>,
}

impl TestSummary {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append one outcome and update the counters
    pub(crate) fn push(&mut self, outcome: RunOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.success += 1;
        } else {
            self.failure += 1;
        }
        self.records.push(outcome);
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failure == 0 && !self.cancelled
    }

    /// Check the counter invariant `total == success + failure == records`
    pub fn is_consistent(&self) -> bool {
        self.total == self.success + self.failure && self.total == self.records.len()
    }

    pub fn coordinates(&self) -> HashSet<RunCoordinate> {
        self.records.iter().map(|r| r.coordinate).collect()
    }

    pub fn get(&self, coordinate: RunCoordinate) -> Option<&RunOutcome> {
        self.records.iter().find(|r| r.coordinate == coordinate)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RunOutcome> {
        self.records.iter().filter(|r| !r.is_success())
    }

    /// Records sorted by `(thread, iteration)` for stable display
    pub fn sorted_records(&self) -> Vec<&RunOutcome> {
        let mut records: Vec<_> = self.records.iter().collect();
        records.sort_by_key(|r| r.coordinate);
        records
    }

    /// Turn cell failures or cancellation into an error
    pub fn ensure_all_passed(&self) -> Result<(), GridError> {
        if self.failure > 0 {
            return Err(GridError::CellsFailed {
                name: self.name.clone(),
                failed: self.failure,
                total: self.total,
            });
        }
        if self.cancelled {
            return Err(GridError::Cancelled {
                name: self.name.clone(),
                completed: self.total,
            });
        }
        Ok(())
    }
}

impl fmt::Display for TestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test {}", self.name)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for record in self.sorted_records() {
            writeln!(f, "  {record}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Success: {} | Failure: {}{}",
            self.total,
            self.success,
            self.failure,
            if self.cancelled { " | CANCELLED" } else { "" }
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.duration_ms
        )
    }
}
