//! Fake collaborators for executor tests

use anyhow::{anyhow, bail, Result};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::{RunCoordinate, TestDefinition};
use crate::sandbox::{Sandbox, SandboxFactory, ScriptCompiler};
use crate::utils::RunLogger;

pub fn static_compiler() -> Arc<dyn ScriptCompiler> {
    Arc::new(|_: &TestDefinition| -> Result<String> { Ok("fake script".to_string()) })
}

pub fn failing_compiler() -> Arc<dyn ScriptCompiler> {
    Arc::new(|def: &TestDefinition| -> Result<String> {
        Err(anyhow!("cannot translate test '{}'", def.name))
    })
}

pub fn panicking_compiler() -> Arc<dyn ScriptCompiler> {
    Arc::new(|_: &TestDefinition| -> Result<String> { panic!("compiler bug") })
}

/// Compiler that counts how often it is asked
#[derive(Default)]
pub struct CountingCompiler {
    calls: AtomicUsize,
}

impl CountingCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScriptCompiler for CountingCompiler {
    fn compile(&self, _definition: &TestDefinition) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("counted script".to_string())
    }
}

#[derive(Clone, Debug)]
pub enum FakeBehavior {
    Value(Value),
    Error(String),
    Panic,
    Sleep(Duration, Value),
}

/// Factory that counts constructions and drops of its sandboxes
pub struct CountingFactory {
    behavior: FakeBehavior,
    attempts: AtomicUsize,
    created: AtomicUsize,
    dropped: Arc<AtomicUsize>,
    fail_at: HashSet<RunCoordinate>,
    seen: Mutex<Vec<RunCoordinate>>,
}

impl CountingFactory {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            attempts: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            dropped: Arc::new(AtomicUsize::new(0)),
            fail_at: HashSet::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_construction_at(mut self, coordinate: RunCoordinate) -> Self {
        self.fail_at.insert(coordinate);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Coordinates in the order their sandboxes were requested
    pub fn seen(&self) -> Vec<RunCoordinate> {
        self.seen.lock().unwrap().clone()
    }
}

impl SandboxFactory for CountingFactory {
    fn create(&self, coordinate: &RunCoordinate) -> Result<Box<dyn Sandbox>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(*coordinate);

        if self.fail_at.contains(coordinate) {
            bail!("no sandbox for {coordinate}");
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSandbox {
            behavior: self.behavior.clone(),
            runs: 0,
            dropped: self.dropped.clone(),
        }))
    }
}

struct FakeSandbox {
    behavior: FakeBehavior,
    runs: usize,
    dropped: Arc<AtomicUsize>,
}

impl Sandbox for FakeSandbox {
    fn run<'a>(&'a mut self, _script: &'a str) -> BoxFuture<'a, Result<Value>> {
        async move {
            self.runs += 1;
            if self.runs > 1 {
                bail!("sandbox reused");
            }
            match &self.behavior {
                FakeBehavior::Value(value) => Ok(value.clone()),
                FakeBehavior::Error(message) => Err(anyhow!("{message}")),
                FakeBehavior::Panic => panic!("fake sandbox panic"),
                FakeBehavior::Sleep(duration, value) => {
                    tokio::time::sleep(*duration).await;
                    Ok(value.clone())
                }
            }
        }
        .boxed()
    }
}

impl Drop for FakeSandbox {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory whose `create` always panics
pub struct PanickingFactory;

impl SandboxFactory for PanickingFactory {
    fn create(&self, coordinate: &RunCoordinate) -> Result<Box<dyn Sandbox>> {
        panic!("factory bug at {coordinate}")
    }
}

/// Logger that keeps every line, prefixed with its level
#[derive(Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl RunLogger for RecordingLogger {
    fn debug_enabled(&self) -> bool {
        true
    }

    fn debug(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("debug {message}"));
    }

    fn error(&self, message: &str) {
        self.lines.lock().unwrap().push(format!("error {message}"));
    }
}

/// Logger that panics on every call
pub struct PanickingLogger;

impl RunLogger for PanickingLogger {
    fn debug_enabled(&self) -> bool {
        true
    }

    fn debug(&self, _message: &str) {
        panic!("logger exploded");
    }

    fn error(&self, _message: &str) {
        panic!("logger exploded");
    }
}
