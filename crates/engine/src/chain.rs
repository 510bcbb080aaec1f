//! Per-file fallback chain
//!
//! [`FallbackChainExecutor`] walks a language's plan until a step succeeds.
//! It consults the outcome cache first, serializes work on the same path
//! through a per-path lock, and stores the final outcome against the file's
//! post-run modification time.

use crate::adapters::ToolAdapter;
use crate::stats::OrchestrationStats;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use syntaxfix_cache::OutcomeCache;
use syntaxfix_config::ToolRegistry;
use syntaxfix_core::{FileTask, FixOutcome, REMOTE_SIZE_THRESHOLD};
use syntaxfix_utils::tracing::chain_span;
use tokio::sync::Mutex;
use tracing::{debug, Instrument};

/// Something that turns one task into exactly one outcome
#[async_trait]
pub trait FileProcessor: Send + Sync {
    async fn process(&self, task: &FileTask) -> FixOutcome;
}

/// How a run wants each chain walked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainPolicy {
    /// Lead with the remote step for small files when one is configured
    pub prefer_remote: bool,
    /// Keep attempting every step after the first success
    pub exhaustive: bool,
}

impl ChainPolicy {
    pub fn local_only() -> Self {
        Self::default()
    }

    pub fn remote_preferred() -> Self {
        Self {
            prefer_remote: true,
            exhaustive: false,
        }
    }

    pub fn exhaustive() -> Self {
        Self {
            prefer_remote: false,
            exhaustive: true,
        }
    }
}

pub struct FallbackChainExecutor {
    registry: ToolRegistry,
    adapter: Arc<dyn ToolAdapter>,
    cache: Option<OutcomeCache>,
    path_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    stats: Arc<OrchestrationStats>,
    remote_size_threshold: u64,
}

impl std::fmt::Debug for FallbackChainExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChainExecutor")
            .field("languages", &self.registry.len())
            .field("cache_enabled", &self.cache.is_some())
            .field("locked_paths", &self.path_locks.len())
            .field("remote_size_threshold", &self.remote_size_threshold)
            .finish()
    }
}

impl FallbackChainExecutor {
    pub fn new(registry: ToolRegistry, adapter: Arc<dyn ToolAdapter>) -> Self {
        Self {
            registry,
            adapter,
            cache: None,
            path_locks: DashMap::new(),
            stats: Arc::new(OrchestrationStats::new()),
            remote_size_threshold: REMOTE_SIZE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: OutcomeCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_stats(mut self, stats: Arc<OrchestrationStats>) -> Self {
        self.stats = stats;
        self
    }

    #[must_use]
    pub fn with_remote_size_threshold(mut self, bytes: u64) -> Self {
        self.remote_size_threshold = bytes;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn cache(&self) -> Option<&OutcomeCache> {
        self.cache.as_ref()
    }

    pub fn stats(&self) -> &Arc<OrchestrationStats> {
        &self.stats
    }

    /// Produce the outcome for one file
    pub async fn execute(&self, task: &FileTask, policy: ChainPolicy) -> FixOutcome {
        let span = chain_span(&task.path.display().to_string(), task.language.as_str());
        async {
            self.stats.record_request();

            let lock = self.path_lock(&task.path);
            let outcome = {
                let _guard = lock.lock().await;
                self.run_locked(task, policy).await
            };
            drop(lock);
            self.path_locks
                .remove_if(&task.path, |_, lock| Arc::strong_count(lock) == 1);

            debug!(
                method = %outcome.method,
                status = %outcome.status,
                fallback_depth = outcome.fallback_depth,
                "chain finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.path_locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn run_locked(&self, task: &FileTask, policy: ChainPolicy) -> FixOutcome {
        if let Some(hit) = self.cache.as_ref().and_then(|cache| cache.lookup(&task.path)) {
            self.stats.record_cache_hit();
            return hit;
        }

        let started = Instant::now();
        let Some(chain) = self.registry.get(task.language) else {
            return FixOutcome::unsupported(task).with_elapsed(started.elapsed());
        };

        let include_remote = policy.prefer_remote
            && chain.has_remote()
            && task.size_bytes < self.remote_size_threshold;
        let plan = chain.plan(include_remote);

        let mut attempts = Vec::with_capacity(plan.len());
        let mut chosen: Option<(FixOutcome, usize)> = None;
        let mut last_failure: Option<FixOutcome> = None;

        for (depth, step) in plan.iter().enumerate() {
            let outcome = self.adapter.attempt(task, step).await;
            attempts.push(json!({
                "tool": step.id(),
                "role": step.role.to_string(),
                "status": outcome.status.as_str(),
            }));

            if outcome.is_success() {
                if chosen.is_none() {
                    chosen = Some((outcome, depth));
                }
                if !policy.exhaustive {
                    break;
                }
            } else {
                debug!(tool = %step, status = %outcome.status, "chain step did not succeed");
                last_failure = Some(outcome);
            }
        }

        let (mut outcome, depth) = match (chosen, last_failure) {
            (Some(chosen), _) => chosen,
            (None, Some(failure)) => (failure, plan.len()),
            (None, None) => (
                FixOutcome::processing_error(task, "empty correction plan"),
                0,
            ),
        };
        self.stats.record_outcome(&outcome, depth == 0);

        outcome.fallback_depth = depth;
        outcome.elapsed = started.elapsed();
        outcome = outcome.with_detail("attempts", attempts);

        if let Some(cache) = &self.cache {
            cache.store(&task.path, outcome.clone());
        }
        outcome
    }
}

/// An executor bound to one run's policy
#[derive(Debug, Clone)]
pub struct ChainRun {
    executor: Arc<FallbackChainExecutor>,
    policy: ChainPolicy,
}

impl ChainRun {
    pub fn new(executor: Arc<FallbackChainExecutor>, policy: ChainPolicy) -> Self {
        Self { executor, policy }
    }

    pub fn policy(&self) -> ChainPolicy {
        self.policy
    }
}

#[async_trait]
impl FileProcessor for ChainRun {
    async fn process(&self, task: &FileTask) -> FixOutcome {
        self.executor.execute(task, self.policy).await
    }
}
