//! Engine facade
//!
//! [`SyntaxFixEngine`] is the single entry point: it resolves the caller's
//! tier, admits the request, analyzes the repository, schedules the
//! fallback chains and reduces the outcomes to metrics.

use crate::adapters::{ToolAdapter, ToolRunner};
use crate::analyzer::{RepositoryAnalyzer, RepositoryScan};
use crate::chain::{ChainPolicy, ChainRun, FallbackChainExecutor};
use crate::metrics::{MetricsAggregator, RunMetrics};
use crate::scheduler::{RunControl, RunReport, Scheduler};
use crate::stats::{OrchestrationStats, StatsSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use syntaxfix_cache::{CacheStats, OutcomeCache};
use syntaxfix_config::EngineConfig;
use syntaxfix_core::{
    duration_secs, Error, FixOutcome, Language, ProcessingMode, RepoAnalysis, Result,
    Strategy, SERVICE_NAME, SERVICE_VERSION,
};
use syntaxfix_security::tier::FEATURE_DISTRIBUTED_PROCESSING;
use syntaxfix_security::{
    AccessController, AccessStore, Admission, AnalyticsRecord, CallerIdentity, Clock, IssuedKey,
    JsonFileStore, KeyRegistry, KeyRequest, LimitWindow, MemoryStore, SystemClock, Tier,
    TierLimits, UsageSnapshot,
};
use syntaxfix_utils::tracing::run_span;
use tracing::{info, warn, Instrument};

/// Rapid mode stays sequential up to this many files
const RAPID_SEQUENTIAL_LIMIT: usize = 20;

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub api_key: Option<String>,
    /// Rate-limit bucket for callers without a valid key
    pub address: String,
}

impl Caller {
    pub fn anonymous(address: impl Into<String>) -> Self {
        Self {
            api_key: None,
            address: address.into(),
        }
    }

    pub fn with_key(api_key: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            address: address.into(),
        }
    }
}

/// A completed processing run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub root: PathBuf,
    pub requested_mode: ProcessingMode,
    pub mode: ProcessingMode,
    pub tier: Tier,
    pub strategy: Strategy,
    pub analysis: RepoAnalysis,
    pub outcomes: Vec<FixOutcome>,
    pub metrics: RunMetrics,
    pub cancelled: bool,
    pub skipped: usize,
    pub duplicates_removed: usize,
    pub admission: Admission,
    pub orchestration_stats: StatsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessResponse {
    Completed(Box<RunSummary>),
    Denied {
        tier: Tier,
        reason: String,
        window: LimitWindow,
        #[serde(rename = "retry_after_secs", with = "duration_secs")]
        retry_after: Duration,
        upgrade_available: bool,
    },
}

impl ProcessResponse {
    pub fn is_denied(&self) -> bool {
        matches!(self, ProcessResponse::Denied { .. })
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            ProcessResponse::Completed(summary) => Some(summary),
            ProcessResponse::Denied { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierInfo {
    pub tier: Tier,
    #[serde(flatten)]
    pub limits: TierLimits,
}

/// Service description for status endpoints and the CLI
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub service: &'static str,
    pub version: &'static str,
    pub extensions: BTreeMap<Language, Vec<&'static str>>,
    pub configured_languages: Vec<Language>,
    pub tiers: Vec<TierInfo>,
    pub orchestration_stats: StatsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

pub struct SyntaxFixEngine {
    config: EngineConfig,
    executor: Arc<FallbackChainExecutor>,
    scheduler: Scheduler,
    access: AccessController,
    keys: KeyRegistry,
}

impl std::fmt::Debug for SyntaxFixEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxFixEngine")
            .field("executor", &self.executor)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl SyntaxFixEngine {
    /// Engine with real tool adapters, the system clock and the configured
    /// store (in memory when no store path is set)
    pub fn new(config: EngineConfig) -> Result<Self> {
        let store: Arc<dyn AccessStore> = match &config.store_path {
            Some(path) => Arc::new(JsonFileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let adapter = Arc::new(ToolRunner::new(config.tool_timeout)?);
        Ok(Self::with_parts(config, adapter, store, Arc::new(SystemClock)))
    }

    pub fn with_parts(
        config: EngineConfig,
        adapter: Arc<dyn ToolAdapter>,
        store: Arc<dyn AccessStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut executor = FallbackChainExecutor::new(config.tools.clone(), adapter)
            .with_stats(Arc::new(OrchestrationStats::new()))
            .with_remote_size_threshold(
                config
                    .remote_size_threshold
                    .min(config.large_file_threshold),
            );
        if config.cache_enabled {
            executor = executor.with_cache(OutcomeCache::new());
        }

        Self {
            scheduler: Scheduler::new(config.workers, config.batch_size),
            executor: Arc::new(executor),
            access: AccessController::new(Arc::clone(&store), Arc::clone(&clock)),
            keys: KeyRegistry::new(store, clock),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn access(&self) -> &AccessController {
        &self.access
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    /// Process a repository with the configured run deadline
    pub async fn process(
        &self,
        root: &Path,
        caller: &Caller,
        mode: ProcessingMode,
    ) -> Result<ProcessResponse> {
        let control = match self.config.run_timeout {
            Some(timeout) => RunControl::with_timeout(timeout),
            None => RunControl::new(),
        };
        self.process_with_control(root, caller, mode, Arc::new(control))
            .await
    }

    /// Process a repository under a caller-owned [`RunControl`]
    pub async fn process_with_control(
        &self,
        root: &Path,
        caller: &Caller,
        requested_mode: ProcessingMode,
        control: Arc<RunControl>,
    ) -> Result<ProcessResponse> {
        let identity = self.resolve(caller).await?;

        let admission = {
            let access = self.access.clone();
            let identifier = identity.identifier.clone();
            let tier = identity.tier;
            off_runtime(move || access.admit(tier, &identifier)).await?
        };
        if let Admission::Denied {
            tier,
            reason,
            window,
            retry_after,
            upgrade_available,
        } = &admission
        {
            info!(tier = %tier, reason = %reason, "request denied");
            return Ok(ProcessResponse::Denied {
                tier: *tier,
                reason: reason.clone(),
                window: *window,
                retry_after: *retry_after,
                upgrade_available: *upgrade_available,
            });
        }

        let mode = effective_mode(requested_mode, identity.tier);
        let scan = self.scan(root, identity.tier).await?;
        if scan.tasks.is_empty() {
            return Err(Error::no_processable_files(root));
        }
        let RepositoryScan { analysis, tasks } = scan;

        let (strategy, policy) = plan_run(mode, &analysis);
        let processor = Arc::new(ChainRun::new(Arc::clone(&self.executor), policy));
        let span = run_span(&root.display().to_string(), strategy.as_str(), tasks.len());

        let started = Instant::now();
        let RunReport {
            outcomes,
            cancelled,
            skipped,
            duplicates_removed,
        } = self
            .scheduler
            .run(tasks, strategy, processor, &control)
            .instrument(span)
            .await;
        let elapsed = started.elapsed();

        let metrics = MetricsAggregator::reduce(&outcomes, elapsed, &analysis);
        info!(
            files = metrics.total_files_processed,
            fixes = metrics.total_fixes_applied,
            success_rate = metrics.success_rate,
            elapsed_secs = metrics.execution_time_secs,
            cancelled,
            "run finished"
        );

        self.record_usage(&identity, &analysis, &metrics, strategy, elapsed)
            .await;

        Ok(ProcessResponse::Completed(Box::new(RunSummary {
            root: root.to_path_buf(),
            requested_mode,
            mode,
            tier: identity.tier,
            strategy,
            analysis,
            outcomes,
            metrics,
            cancelled,
            skipped,
            duplicates_removed,
            admission,
            orchestration_stats: self.executor.stats().snapshot(),
        })))
    }

    /// Analyze without consuming quota
    pub async fn analyze(&self, root: &Path) -> Result<RepoAnalysis> {
        let analyzer = RepositoryAnalyzer::from_config(&self.config);
        let root = root.to_path_buf();
        off_runtime(move || analyzer.analyze(&root)).await
    }

    pub fn request_quota_upgrade(&self, request: &KeyRequest) -> Result<IssuedKey> {
        self.keys.request_quota_upgrade(request)
    }

    /// Current quota usage for a caller, without consuming any
    pub async fn usage(&self, caller: &Caller) -> Result<UsageSnapshot> {
        let identity = self.resolve(caller).await?;
        let access = self.access.clone();
        off_runtime(move || access.usage(identity.tier, &identity.identifier)).await
    }

    pub fn tiers() -> Vec<TierInfo> {
        Tier::ALL
            .iter()
            .map(|tier| TierInfo {
                tier: *tier,
                limits: *tier.limits(),
            })
            .collect()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            service: SERVICE_NAME,
            version: SERVICE_VERSION,
            extensions: Language::ALL
                .iter()
                .map(|language| (*language, language.extensions().collect()))
                .collect(),
            configured_languages: self.config.tools.languages().collect(),
            tiers: Self::tiers(),
            orchestration_stats: self.executor.stats().snapshot(),
            cache: self.executor.cache().map(OutcomeCache::stats),
        }
    }

    async fn resolve(&self, caller: &Caller) -> Result<CallerIdentity> {
        let keys = self.keys.clone();
        let api_key = caller.api_key.clone();
        let address = caller.address.clone();
        off_runtime(move || keys.resolve(api_key.as_deref(), &address)).await
    }

    async fn scan(&self, root: &Path, tier: Tier) -> Result<RepositoryScan> {
        let analyzer =
            RepositoryAnalyzer::from_config(&self.config).with_size_ceiling(tier.limits().max_file_size);
        let root = root.to_path_buf();
        off_runtime(move || analyzer.scan(&root)).await
    }

    /// Usage tracking never fails a run that already completed
    async fn record_usage(
        &self,
        identity: &CallerIdentity,
        analysis: &RepoAnalysis,
        metrics: &RunMetrics,
        strategy: Strategy,
        elapsed: Duration,
    ) {
        let store = Arc::clone(self.access.store());
        let now = self.access.clock().now();
        let record = AnalyticsRecord {
            identifier: identity.identifier.clone(),
            tier: identity.tier,
            files_processed: metrics.total_files_processed,
            fixes_applied: metrics.total_fixes_applied,
            languages: analysis
                .languages
                .keys()
                .map(|language| language.to_string())
                .collect(),
            elapsed_secs: elapsed.as_secs_f64(),
            strategy: strategy.to_string(),
            success_rate: metrics.success_rate,
            recorded_at: now,
        };
        let api_key = identity.api_key.clone();
        let fixes = metrics.total_fixes_applied;

        let recorded = off_runtime(move || {
            store.record_analytics(record)?;
            if let Some(api_key) = api_key {
                store.record_key_use(&api_key, fixes, now)?;
            }
            Ok(())
        })
        .await;
        if let Err(e) = recorded {
            warn!(error = %e, "failed to record usage");
        }
    }
}

/// Distributed processing is a tier feature; without it the run falls back
/// to intelligent mode
fn effective_mode(requested: ProcessingMode, tier: Tier) -> ProcessingMode {
    if requested == ProcessingMode::Distributed && !tier.has_feature(FEATURE_DISTRIBUTED_PROCESSING) {
        warn!(tier = %tier, "distributed processing not available for tier, using intelligent mode");
        return ProcessingMode::Intelligent;
    }
    requested
}

fn plan_run(mode: ProcessingMode, analysis: &RepoAnalysis) -> (Strategy, ChainPolicy) {
    match mode {
        ProcessingMode::Intelligent => (analysis.strategy, ChainPolicy::remote_preferred()),
        ProcessingMode::Rapid if analysis.total_files <= RAPID_SEQUENTIAL_LIMIT => {
            (Strategy::Sequential, ChainPolicy::local_only())
        }
        ProcessingMode::Rapid => (Strategy::Batched, ChainPolicy::local_only()),
        ProcessingMode::Distributed => (Strategy::ShardedParallel, ChainPolicy::remote_preferred()),
        ProcessingMode::Comprehensive => (Strategy::BoundedConcurrent, ChainPolicy::exhaustive()),
    }
}

async fn off_runtime<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::configuration(format!("background task failed: {e}")))?
}
