//! Correction orchestration engine for syntaxfix
//!
//! ## Key Components
//!
//! - **`adapters`**: one [`ToolAdapter`] per correction capability (external
//!   command, remote HTTP service, in-process pattern heuristic).
//! - **`chain`**: the per-file fallback chain with cache and per-path locks.
//! - **`analyzer`**: tree walk, language classification and strategy choice.
//! - **`scheduler`**: runs the chain over a task set under one of four
//!   concurrency strategies.
//! - **`metrics`**: reduces outcomes to repository-level metrics.
//! - **`engine`**: the [`SyntaxFixEngine`] facade tying access control to a
//!   processing run.

pub mod adapters;
pub mod analyzer;
pub mod chain;
pub mod engine;
pub mod metrics;
pub mod scheduler;
pub mod stats;

pub use adapters::{CommandAdapter, PatternAdapter, RemoteAdapter, ToolAdapter, ToolRunner};
pub use analyzer::{select_strategy, RepoMetrics, RepositoryAnalyzer, RepositoryScan};
pub use chain::{ChainPolicy, ChainRun, FallbackChainExecutor, FileProcessor};
pub use engine::{Caller, EngineStatus, ProcessResponse, RunSummary, SyntaxFixEngine, TierInfo};
pub use metrics::{Breakdown, EstimateAccuracy, MetricsAggregator, RunMetrics};
pub use scheduler::{RunControl, RunReport, Scheduler};
pub use stats::{OrchestrationStats, StatsSnapshot};
