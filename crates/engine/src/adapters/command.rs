//! External command adapter
//!
//! Runs `program args... <file>` with a bounded timeout. The file is
//! snapshotted before the tool starts and only the verified result of a
//! zero exit status is kept.

use super::diff::count_line_changes;
use super::{restore_snapshot, ToolAdapter};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use syntaxfix_config::{CommandSpec, ToolInvocation, ToolSpec};
use syntaxfix_core::{FileTask, FixOutcome, FixStatus, MAX_DIAGNOSTIC_CHARS};
use syntaxfix_utils::FileSnapshot;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CommandAdapter {
    timeout: Duration,
}

impl CommandAdapter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, task: &FileTask, tool: &ToolSpec, command: &CommandSpec) -> FixOutcome {
        let method = tool.role.method_name();

        let program = match which::which(&command.program) {
            Ok(program) => program,
            Err(_) => {
                debug!(tool = %command.program, "correction tool not installed");
                return FixOutcome::new(task, method, FixStatus::ToolNotFound)
                    .with_detail("tool", command.program.as_str());
            }
        };

        let original = match tokio::fs::read(&task.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return FixOutcome::new(task, method, FixStatus::ExecutionError)
                    .with_detail("tool", command.program.as_str())
                    .with_detail("error", format!("failed to read file: {e}"));
            }
        };
        let snapshot = FileSnapshot::from_bytes(&task.path, original);

        let mut cmd = Command::new(&program);
        cmd.args(&command.args)
            .arg(&task.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                restore_snapshot(snapshot);
                return FixOutcome::new(task, method, FixStatus::ExecutionError)
                    .with_detail("tool", command.program.as_str())
                    .with_detail("error", e.to_string());
            }
            Err(_) => {
                restore_snapshot(snapshot);
                warn!(
                    tool = %command.program,
                    path = %task.path.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "correction tool timed out"
                );
                return FixOutcome::new(task, method, FixStatus::ToolFailed)
                    .with_detail("tool", command.program.as_str())
                    .with_detail("error", format!("timed out after {:.1}s", self.timeout.as_secs_f64()));
            }
        };

        if !output.status.success() {
            restore_snapshot(snapshot);
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(MAX_DIAGNOSTIC_CHARS)
                .collect();
            let mut outcome = FixOutcome::new(task, method, FixStatus::ToolFailed)
                .with_detail("tool", command.program.as_str())
                .with_detail("error", stderr);
            if let Some(code) = output.status.code() {
                outcome = outcome.with_detail("exit_code", code);
            }
            return outcome;
        }

        let corrected = match tokio::fs::read(&task.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                restore_snapshot(snapshot);
                return FixOutcome::new(task, method, FixStatus::ExecutionError)
                    .with_detail("tool", command.program.as_str())
                    .with_detail("error", format!("failed to re-read file: {e}"));
            }
        };

        let changes = count_line_changes(
            &String::from_utf8_lossy(snapshot.original()),
            &String::from_utf8_lossy(&corrected),
        );
        snapshot.commit();

        FixOutcome::new(task, method, FixStatus::Success)
            .with_counts(changes.max(1), changes)
            .with_detail("tool", command.program.as_str())
            .with_detail("changes_detected", changes)
    }
}

#[async_trait]
impl ToolAdapter for CommandAdapter {
    async fn attempt(&self, task: &FileTask, tool: &ToolSpec) -> FixOutcome {
        let started = Instant::now();
        let outcome = match &tool.invocation {
            ToolInvocation::Command(command) => self.run(task, tool, command).await,
            _ => FixOutcome::new(task, tool.role.method_name(), FixStatus::ExecutionError)
                .with_detail("error", format!("{tool} is not an external command")),
        };
        outcome.with_elapsed(started.elapsed())
    }
}
