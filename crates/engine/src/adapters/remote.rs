//! Remote correction service adapter
//!
//! Posts `{language, file_name, content}` as JSON and expects the corrected
//! file back as `{content}`.

use super::diff::count_line_changes;
use super::{restore_snapshot, ToolAdapter};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use syntaxfix_config::{RemoteSpec, ToolInvocation, ToolSpec};
use syntaxfix_core::{
    Error, FileTask, FixOutcome, FixStatus, Language, Result, ToolRole, MAX_DIAGNOSTIC_CHARS,
};
use syntaxfix_utils::FileSnapshot;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct CorrectionRequest<'a> {
    language: &'a str,
    file_name: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CorrectionResponse {
    content: String,
}

#[derive(Debug, Clone)]
pub struct RemoteAdapter {
    client: reqwest::Client,
}

impl RemoteAdapter {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("syntaxfix/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn run(&self, task: &FileTask, remote: &RemoteSpec) -> FixOutcome {
        let method = ToolRole::Remote.method_name();

        let original = match tokio::fs::read_to_string(&task.path).await {
            Ok(content) => content,
            Err(e) => {
                return FixOutcome::new(task, method, FixStatus::ExecutionError)
                    .with_detail("endpoint", remote.endpoint.as_str())
                    .with_detail("error", format!("failed to read file: {e}"));
            }
        };

        let file_name = task
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let corrected = match self
            .correct(&remote.endpoint, task.language, &file_name, &original)
            .await
        {
            Ok(corrected) => corrected,
            Err(e) => {
                debug!(endpoint = %remote.endpoint, error = %e, "remote correction failed");
                return FixOutcome::new(task, method, FixStatus::ToolFailed)
                    .with_detail("endpoint", remote.endpoint.as_str())
                    .with_detail("error", truncate(&e.to_string()));
            }
        };

        let snapshot = FileSnapshot::from_bytes(&task.path, original.into_bytes());
        if let Err(e) = tokio::fs::write(&task.path, corrected.as_bytes()).await {
            restore_snapshot(snapshot);
            warn!(path = %task.path.display(), error = %e, "failed to write remote correction");
            return FixOutcome::new(task, method, FixStatus::ExecutionError)
                .with_detail("endpoint", remote.endpoint.as_str())
                .with_detail("error", format!("failed to write file: {e}"));
        }

        let changes = count_line_changes(&String::from_utf8_lossy(snapshot.original()), &corrected);
        snapshot.commit();

        FixOutcome::new(task, method, FixStatus::Success)
            .with_counts(changes.max(1), changes)
            .with_detail("endpoint", remote.endpoint.as_str())
            .with_detail("changes_detected", changes)
    }

    /// Ask `endpoint` for a corrected version of `content`
    ///
    /// Transport failures, non-2xx statuses and malformed bodies all come
    /// back as [`Error::Network`].
    pub async fn correct(
        &self,
        endpoint: &str,
        language: Language,
        file_name: &str,
        content: &str,
    ) -> Result<String> {
        let body = CorrectionRequest {
            language: language.as_str(),
            file_name,
            content,
        };
        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::network(endpoint, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::network(
                endpoint,
                format!("HTTP {}: {}", status.as_u16(), text),
            ));
        }

        let parsed: CorrectionResponse = response
            .json()
            .await
            .map_err(|e| Error::network(endpoint, format!("invalid response body: {e}")))?;
        Ok(parsed.content)
    }
}

fn truncate(message: &str) -> String {
    message.chars().take(MAX_DIAGNOSTIC_CHARS).collect()
}

#[async_trait]
impl ToolAdapter for RemoteAdapter {
    async fn attempt(&self, task: &FileTask, tool: &ToolSpec) -> FixOutcome {
        let started = Instant::now();
        let outcome = match &tool.invocation {
            ToolInvocation::Remote(remote) => self.run(task, remote).await,
            _ => FixOutcome::new(task, tool.role.method_name(), FixStatus::ExecutionError)
                .with_detail("error", format!("{tool} is not a remote endpoint")),
        };
        outcome.with_elapsed(started.elapsed())
    }
}
