//! Shell-backed compiler and sandbox
//!
//! Steps are shell commands. Each cell gets its own temporary working
//! directory that is removed when the sandbox is dropped.

use anyhow::{bail, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use super::{Sandbox, SandboxFactory, ScriptCompiler};
use crate::models::{RunCoordinate, TestDefinition};

/// Compiles steps into a single POSIX shell script
#[derive(Clone, Debug, Default)]
pub struct ShellCompiler;

impl ShellCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptCompiler for ShellCompiler {
    fn compile(&self, definition: &TestDefinition) -> Result<String> {
        let mut script = String::from("set -e\n");

        for (index, step) in definition.steps.iter().enumerate() {
            let position = index + 1;
            if step.command.trim().is_empty() {
                match &step.name {
                    Some(name) => bail!("step {position} ({name}) has an empty command"),
                    None => bail!("step {position} has an empty command"),
                }
            }

            match &step.name {
                Some(name) => script.push_str(&format!("# step {position}: {name}\n")),
                None => script.push_str(&format!("# step {position}\n")),
            }
            for (key, value) in &step.env {
                if !is_valid_env_name(key) {
                    bail!("step {position} exports an invalid variable name: {key:?}");
                }
                script.push_str(&format!("export {key}={}\n", shell_quote(value)));
            }
            script.push_str(step.command.trim_end());
            script.push('\n');
        }

        Ok(script)
    }
}

/// Single-quote a value for `sh`
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Creates one [`ShellSandbox`] per cell
#[derive(Clone, Debug)]
pub struct ShellSandboxFactory {
    shell: String,
    timeout_secs: u64,
}

impl ShellSandboxFactory {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            timeout_secs: 30,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for ShellSandboxFactory {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl SandboxFactory for ShellSandboxFactory {
    fn create(&self, coordinate: &RunCoordinate) -> Result<Box<dyn Sandbox>> {
        let workdir = tempfile::Builder::new()
            .prefix(&format!(
                "gridrun-{}-{}-",
                coordinate.thread_index, coordinate.iteration_index
            ))
            .tempdir()
            .context("Failed to create sandbox working directory")?;

        debug!("Created sandbox {} at {}", coordinate, workdir.path().display());

        Ok(Box::new(ShellSandbox {
            shell: self.shell.clone(),
            timeout_secs: self.timeout_secs,
            coordinate: *coordinate,
            workdir,
        }))
    }
}

/// A shell process confined to its own temporary directory
#[derive(Debug)]
pub struct ShellSandbox {
    shell: String,
    timeout_secs: u64,
    coordinate: RunCoordinate,
    workdir: TempDir,
}

impl ShellSandbox {
    async fn execute(&mut self, script: &str) -> Result<Value> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(script)
            .current_dir(self.workdir.path())
            .env("GRIDRUN_THREAD", self.coordinate.thread_index.to_string())
            .env("GRIDRUN_ITERATION", self.coordinate.iteration_index.to_string())
            .env("GRIDRUN_WORKDIR", self.workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn shell '{}'", self.shell))?;

        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Timeout after {} seconds", self.timeout_secs))?
        .context("Failed to wait for shell")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("script exited with {}: {}", output.status, stderr.trim());
        }

        Ok(parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Sandbox for ShellSandbox {
    fn run<'a>(&'a mut self, script: &'a str) -> BoxFuture<'a, Result<Value>> {
        self.execute(script).boxed()
    }
}

/// Trimmed stdout as JSON when it parses, otherwise as a string
fn parse_output(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestStep;
    use serde_json::json;

    fn definition(steps: Vec<TestStep>) -> TestDefinition {
        steps
            .into_iter()
            .fold(TestDefinition::new("shell"), |def, step| def.with_step(step))
    }

    #[test]
    fn test_compile_orders_steps() {
        let def = definition(vec![
            TestStep::new("echo one").with_name("first"),
            TestStep::new("echo two").with_env("GREETING", "it's"),
        ]);

        let script = ShellCompiler::new().compile(&def).unwrap();
        assert_eq!(
            script,
            "set -e\n# step 1: first\necho one\n# step 2\nexport GREETING='it'\\''s'\necho two\n"
        );
    }

    #[test]
    fn test_compile_rejects_empty_command() {
        let def = definition(vec![TestStep::new("true"), TestStep::new("  ").with_name("blank")]);
        let err = ShellCompiler::new().compile(&def).unwrap_err();
        assert_eq!(err.to_string(), "step 2 (blank) has an empty command");
    }

    #[test]
    fn test_compile_rejects_bad_env_name() {
        let def = definition(vec![TestStep::new("true").with_env("1BAD", "x")]);
        assert!(ShellCompiler::new().compile(&def).is_err());
    }

    #[test]
    fn test_parse_output() {
        assert_eq!(parse_output("42\n"), json!(42));
        assert_eq!(parse_output("{\"ok\":true}"), json!({"ok": true}));
        assert_eq!(parse_output(" hello \n"), json!("hello"));
        assert_eq!(parse_output(""), Value::Null);
    }

    #[tokio::test]
    async fn test_sandbox_runs_in_own_workdir() {
        let factory = ShellSandboxFactory::default();
        let mut sandbox = factory.create(&RunCoordinate::new(1, 2)).unwrap();

        let value = sandbox
            .run(
                "[ \"$(pwd -P)\" = \"$(cd \"$GRIDRUN_WORKDIR\" && pwd -P)\" ] || exit 3\n\
                 echo \"$GRIDRUN_THREAD-$GRIDRUN_ITERATION\"",
            )
            .await
            .unwrap();
        assert_eq!(value, json!("1-2"));
    }

    #[tokio::test]
    async fn test_sandbox_reports_failure() {
        let factory = ShellSandboxFactory::default();
        let mut sandbox = factory.create(&RunCoordinate::new(0, 0)).unwrap();

        let err = sandbox.run("echo nope >&2; exit 4").await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_sandboxes_do_not_share_state() {
        let factory = ShellSandboxFactory::default();

        let mut first = factory.create(&RunCoordinate::new(0, 0)).unwrap();
        first.run("echo leaked > marker").await.unwrap();

        let mut second = factory.create(&RunCoordinate::new(0, 1)).unwrap();
        let value = second
            .run("if [ -e marker ]; then echo shared; else echo isolated; fi")
            .await
            .unwrap();
        assert_eq!(value, json!("isolated"));
    }

    #[tokio::test]
    async fn test_sandbox_timeout() {
        let factory = ShellSandboxFactory::default().with_timeout(1);
        let mut sandbox = factory.create(&RunCoordinate::new(0, 0)).unwrap();

        let err = sandbox.run("sleep 5").await.unwrap_err();
        assert!(err.to_string().contains("Timeout"));
    }
}
