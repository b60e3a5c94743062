//! Test definition models
//!
//! A test definition is the unit the grid runs: a name, ordered steps and
//! the requested grid dimensions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A single step of a test.
///
/// The coordinator never looks inside a step; only the script compiler
/// interprets it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    /// Optional human readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Command text handed to the compiler
    #[serde(default)]
    pub command: String,

    /// Variables exported before the command runs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl TestStep {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            name: None,
            command: command.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// A test to run across a `threads x iterations` grid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub name: String,

    #[serde(default)]
    pub steps: Vec<TestStep>,

    /// Requested worker count. Non-positive values run as 1.
    #[serde(default = "default_count", alias = "threads")]
    pub thread_count: i64,

    /// Requested iterations per worker. Non-positive values run as 1.
    #[serde(default = "default_count", alias = "iterations")]
    pub iteration_count: i64,
}

fn default_count() -> i64 {
    1
}

impl TestDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            thread_count: 1,
            iteration_count: 1,
        }
    }

    pub fn with_step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_threads(mut self, threads: i64) -> Self {
        self.thread_count = threads;
        self
    }

    pub fn with_iterations(mut self, iterations: i64) -> Self {
        self.iteration_count = iterations;
        self
    }

    /// Worker count actually used for a run
    pub fn effective_threads(&self) -> usize {
        clamp_count(self.thread_count)
    }

    /// Iterations per worker actually used for a run
    pub fn effective_iterations(&self) -> usize {
        clamp_count(self.iteration_count)
    }

    /// Number of cells a complete run of this definition executes
    pub fn cell_count(&self) -> usize {
        if self.steps.is_empty() {
            0
        } else {
            self.effective_threads()
                .saturating_mul(self.effective_iterations())
        }
    }

    /// Load a definition from a YAML or JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_defaults(path, 1, 1)
    }

    /// Load a definition, filling in grid dimensions the file leaves out
    pub fn load_with_defaults(
        path: impl AsRef<Path>,
        default_threads: i64,
        default_iterations: i64,
    ) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read test definition: {}", path.display()))?;

        let raw: DefinitionFile = if is_yaml_file(path) {
            serde_yaml::from_str(&content).with_context(|| {
                format!("Failed to parse YAML test definition: {}", path.display())
            })?
        } else {
            serde_json::from_str(&content).with_context(|| {
                format!("Failed to parse JSON test definition: {}", path.display())
            })?
        };

        Ok(Self {
            name: raw.name,
            steps: raw.steps,
            thread_count: raw.thread_count.unwrap_or(default_threads),
            iteration_count: raw.iteration_count.unwrap_or(default_iterations),
        })
    }
}

/// On-disk shape of a definition; grid dimensions are optional
#[derive(Deserialize)]
struct DefinitionFile {
    name: String,
    #[serde(default)]
    steps: Vec<TestStep>,
    #[serde(default, alias = "threads")]
    thread_count: Option<i64>,
    #[serde(default, alias = "iterations")]
    iteration_count: Option<i64>,
}

impl fmt::Display for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} steps, {} threads x {} iterations)",
            self.name,
            self.steps.len(),
            self.effective_threads(),
            self.effective_iterations()
        )
    }
}

fn clamp_count(requested: i64) -> usize {
    if requested <= 0 {
        1
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX)
    }
}

pub(crate) fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
