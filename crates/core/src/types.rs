use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{Error, Result};

/// Source languages the engine can classify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Go,
    Rust,
    Java,
    /// C and C++ share one chain and count as one language
    Cpp,
}

/// Static extension table used by the tree walker
pub const EXTENSION_TABLE: &[(&str, Language)] = &[
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("mjs", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("py", Language::Python),
    ("go", Language::Go),
    ("rs", Language::Rust),
    ("java", Language::Java),
    ("c", Language::Cpp),
    ("h", Language::Cpp),
    ("cpp", Language::Cpp),
    ("cc", Language::Cpp),
    ("cxx", Language::Cpp),
    ("c++", Language::Cpp),
    ("hpp", Language::Cpp),
];

impl Language {
    pub const ALL: [Language; 7] = [
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::Cpp,
    ];

    /// Classify a bare extension (without the leading dot), case-insensitively
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        EXTENSION_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, language)| *language)
    }

    /// Classify a path by its extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }

    /// Typical density of fixable issues relative to the 20% baseline.
    /// Flexible, dynamically parsed languages skew high; languages whose
    /// compilers reject most mistakes skew low.
    #[must_use]
    pub fn error_multiplier(&self) -> f64 {
        match self {
            Language::JavaScript => 1.3,
            Language::TypeScript => 1.1,
            Language::Python => 0.8,
            Language::Go => 0.7,
            Language::Rust => 0.6,
            Language::Java => 0.9,
            Language::Cpp => 1.2,
        }
    }

    /// Extensions that classify as this language
    pub fn extensions(&self) -> impl Iterator<Item = &'static str> + '_ {
        EXTENSION_TABLE
            .iter()
            .filter(move |(_, language)| language == self)
            .map(|(ext, _)| *ext)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Language::ALL
            .iter()
            .find(|language| language.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::validation("language", format!("unknown language '{s}'")))
    }
}

/// One file scheduled for correction. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTask {
    pub path: PathBuf,
    pub language: Language,
    pub size_bytes: u64,
}

impl FileTask {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, language: Language, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            language,
            size_bytes,
        }
    }
}

/// Position of a tool inside a language's fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolRole {
    Remote,
    Primary,
    Secondary,
    Fallback,
    PatternBased,
}

impl ToolRole {
    /// Name recorded as the outcome's method when this role produced it
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        match self {
            ToolRole::Remote => "remote_api",
            ToolRole::Primary => "local_primary",
            ToolRole::Secondary => "local_secondary",
            ToolRole::Fallback => "local_fallback",
            ToolRole::PatternBased => "pattern_based",
        }
    }
}

impl fmt::Display for ToolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolRole::Remote => "remote",
            ToolRole::Primary => "primary",
            ToolRole::Secondary => "secondary",
            ToolRole::Fallback => "fallback",
            ToolRole::PatternBased => "pattern_based",
        };
        f.write_str(name)
    }
}

/// Terminal status of one file's correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Success,
    ToolNotFound,
    ToolFailed,
    ExecutionError,
    UnsupportedLanguage,
    CacheHit,
    ProcessingError,
}

impl FixStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FixStatus::Success => "success",
            FixStatus::ToolNotFound => "tool_not_found",
            FixStatus::ToolFailed => "tool_failed",
            FixStatus::ExecutionError => "execution_error",
            FixStatus::UnsupportedLanguage => "unsupported_language",
            FixStatus::CacheHit => "cache_hit",
            FixStatus::ProcessingError => "processing_error",
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, FixStatus::Success)
    }
}

impl fmt::Display for FixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const METHOD_UNSUPPORTED: &str = "unsupported";
pub const METHOD_ERROR: &str = "error";

/// Result of processing one file. Created once per file per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixOutcome {
    pub path: PathBuf,
    pub language: Language,
    pub errors_found: usize,
    pub fixes_applied: usize,
    #[serde(with = "duration_secs", rename = "elapsed_secs")]
    pub elapsed: Duration,
    pub method: String,
    pub status: FixStatus,
    /// How many chain levels were tried before this outcome was produced
    pub fallback_depth: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl FixOutcome {
    #[must_use]
    pub fn new(task: &FileTask, method: impl Into<String>, status: FixStatus) -> Self {
        Self {
            path: task.path.clone(),
            language: task.language,
            errors_found: 0,
            fixes_applied: 0,
            elapsed: Duration::ZERO,
            method: method.into(),
            status,
            fallback_depth: 0,
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn unsupported(task: &FileTask) -> Self {
        Self::new(task, METHOD_UNSUPPORTED, FixStatus::UnsupportedLanguage)
    }

    /// Outcome for a file whose orchestration faulted unexpectedly
    #[must_use]
    pub fn processing_error(task: &FileTask, message: impl Into<String>) -> Self {
        Self::new(task, METHOD_ERROR, FixStatus::ProcessingError)
            .with_detail("error", message.into())
    }

    #[must_use]
    pub fn with_counts(mut self, errors_found: usize, fixes_applied: usize) -> Self {
        self.errors_found = errors_found;
        self.fixes_applied = fixes_applied;
        self
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// How the caller wants the run to be carried out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Engine selects the strategy from the repository analysis
    #[default]
    Intelligent,
    /// Lowest latency on small inputs, local tools only
    Rapid,
    /// Sharded-parallel with remote correction preferred
    Distributed,
    /// Bounded-concurrent, every chain level attempted for reporting
    Comprehensive,
}

impl ProcessingMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Intelligent => "intelligent",
            ProcessingMode::Rapid => "rapid",
            ProcessingMode::Distributed => "distributed",
            ProcessingMode::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intelligent" => Ok(ProcessingMode::Intelligent),
            "rapid" => Ok(ProcessingMode::Rapid),
            "distributed" => Ok(ProcessingMode::Distributed),
            "comprehensive" => Ok(ProcessingMode::Comprehensive),
            other => Err(Error::validation(
                "processing_mode",
                format!("unknown mode '{other}'"),
            )),
        }
    }
}

/// Concurrency shape of a processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Sequential,
    Batched,
    BoundedConcurrent,
    ShardedParallel,
}

impl Strategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Batched => "batched",
            Strategy::BoundedConcurrent => "bounded_concurrent",
            Strategy::ShardedParallel => "sharded_parallel",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projected cost of processing a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    pub estimated_sequential_secs: f64,
    pub estimated_parallel_secs: f64,
    pub speedup_factor: f64,
    pub optimal_workers: usize,
    pub memory_usage_estimate_mb: f64,
    pub complexity_score: f64,
}

/// Computed once per run, read-only thereafter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoAnalysis {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub languages: BTreeMap<Language, usize>,
    pub estimated_errors: usize,
    pub strategy: Strategy,
    pub performance_profile: PerformanceProfile,
    pub orchestration_recommended: bool,
}

/// Serialize a `Duration` as fractional seconds
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
