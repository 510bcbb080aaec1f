//! Tool adapters
//!
//! Every correction capability sits behind [`ToolAdapter`]. An adapter never
//! returns an error: missing tools, failures and timeouts are outcome
//! statuses so the chain can move on to the next step.

mod command;
mod diff;
mod pattern;
mod remote;

pub use command::CommandAdapter;
pub use diff::count_line_changes;
pub use pattern::PatternAdapter;
pub use remote::RemoteAdapter;

use async_trait::async_trait;
use std::time::Duration;
use syntaxfix_config::{ToolInvocation, ToolSpec};
use syntaxfix_core::{FileTask, FixOutcome, Result};
use syntaxfix_utils::FileSnapshot;
use tracing::error;

/// One correction attempt against one file
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    async fn attempt(&self, task: &FileTask, tool: &ToolSpec) -> FixOutcome;
}

/// Dispatches each step to the adapter for its invocation kind
#[derive(Debug)]
pub struct ToolRunner {
    command: CommandAdapter,
    remote: RemoteAdapter,
    patterns: PatternAdapter,
}

impl ToolRunner {
    pub fn new(tool_timeout: Duration) -> Result<Self> {
        Ok(Self {
            command: CommandAdapter::new(tool_timeout),
            remote: RemoteAdapter::new(tool_timeout)?,
            patterns: PatternAdapter::new(),
        })
    }
}

#[async_trait]
impl ToolAdapter for ToolRunner {
    async fn attempt(&self, task: &FileTask, tool: &ToolSpec) -> FixOutcome {
        match tool.invocation {
            ToolInvocation::Command(_) => self.command.attempt(task, tool).await,
            ToolInvocation::Remote(_) => self.remote.attempt(task, tool).await,
            ToolInvocation::Patterns(_) => self.patterns.attempt(task, tool).await,
        }
    }
}

pub(crate) fn restore_snapshot(snapshot: FileSnapshot) {
    let path = snapshot.path().to_path_buf();
    if let Err(e) = snapshot.restore() {
        error!(path = %path.display(), error = %e, "failed to restore file after tool failure");
    }
}
