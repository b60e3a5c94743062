//! Script compilation and execution sandboxes
//!
//! The coordinator consumes these traits only. A compiler turns a test
//! definition into one script; a factory builds a fresh sandbox for every
//! cell, which runs that script once and is dropped afterwards.

mod shell;

pub use shell::{ShellCompiler, ShellSandbox, ShellSandboxFactory};

use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::models::{RunCoordinate, TestDefinition};

/// Translates a test definition into an executable script
pub trait ScriptCompiler: Send + Sync {
    fn compile(&self, definition: &TestDefinition) -> Result<String>;
}

/// Builds one isolated sandbox per cell.
///
/// The coordinate is informational; implementations must not hand out a
/// sandbox that is shared with another cell.
pub trait SandboxFactory: Send + Sync {
    fn create(&self, coordinate: &RunCoordinate) -> Result<Box<dyn Sandbox>>;
}

/// An isolated context that runs one script. Teardown happens on drop.
pub trait Sandbox: Send {
    fn run<'a>(&'a mut self, script: &'a str) -> BoxFuture<'a, Result<Value>>;
}

impl<F> ScriptCompiler for F
where
    F: Fn(&TestDefinition) -> Result<String> + Send + Sync,
{
    fn compile(&self, definition: &TestDefinition) -> Result<String> {
        self(definition)
    }
}
