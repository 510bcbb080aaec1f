//! Engine configuration
//!
//! `EngineConfig` is immutable once built and is shared behind an `Arc` by the
//! engine. It is assembled in layers (defaults, config file, environment,
//! command line) and every layer that contributed is recorded in `sources`.

use crate::tools::ToolRegistry;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use syntaxfix_core::{
    constants::{
        DEFAULT_BATCH_SIZE, DEFAULT_TOOL_TIMEOUT, EXCLUDED_DIRECTORIES, LARGE_FILE_THRESHOLD,
        MAX_ANALYZED_FILE_SIZE, MAX_WORKERS, REMOTE_SIZE_THRESHOLD,
    },
    duration_secs, Error, Result,
};

/// Where a configuration layer came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "origin", rename_all = "snake_case")]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
    Environment(String),
    CommandLine,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Defaults => write!(f, "defaults"),
            ConfigSource::File(path) => write!(f, "file {}", path.display()),
            ConfigSource::Environment(var) => write!(f, "env {var}"),
            ConfigSource::CommandLine => write!(f, "command line"),
        }
    }
}

/// Settings for one engine instance
#[derive(Debug, Clone, Serialize)]
pub struct EngineConfig {
    /// Upper bound for a single tool invocation
    #[serde(rename = "tool_timeout_secs", with = "duration_secs")]
    pub tool_timeout: Duration,
    /// Worker budget for bounded-concurrent and sharded runs
    pub workers: usize,
    pub batch_size: usize,
    pub cache_enabled: bool,
    /// Files larger than this are skipped by the analyzer
    pub max_file_size: u64,
    /// Remote correction is only preferred below this size
    pub remote_size_threshold: u64,
    /// Files above this size are never sent to a remote endpoint
    pub large_file_threshold: u64,
    pub excluded_dirs: Vec<String>,
    /// Durable usage store; `None` keeps usage in memory
    pub store_path: Option<PathBuf>,
    /// Run-level deadline after which no new file tasks are started
    #[serde(rename = "run_timeout_secs", serialize_with = "serialize_optional_secs")]
    pub run_timeout: Option<Duration>,
    pub tools: ToolRegistry,
    pub sources: Vec<ConfigSource>,
}

fn serialize_optional_secs<S: Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

/// `min(8, available parallelism)`, never zero
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_WORKERS)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            workers: default_workers(),
            batch_size: DEFAULT_BATCH_SIZE,
            cache_enabled: true,
            max_file_size: MAX_ANALYZED_FILE_SIZE,
            remote_size_threshold: REMOTE_SIZE_THRESHOLD,
            large_file_threshold: LARGE_FILE_THRESHOLD,
            excluded_dirs: EXCLUDED_DIRECTORIES.iter().map(|d| d.to_string()).collect(),
            store_path: None,
            run_timeout: None,
            tools: ToolRegistry::default(),
            sources: vec![ConfigSource::Defaults],
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tool_timeout.is_zero() {
            return Err(Error::validation("tool_timeout", "must be greater than zero"));
        }
        if self.workers == 0 {
            return Err(Error::validation("workers", "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::validation("batch_size", "must be at least 1"));
        }
        if self.max_file_size == 0 {
            return Err(Error::validation("max_file_size", "must be greater than zero"));
        }
        if matches!(self.run_timeout, Some(t) if t.is_zero()) {
            return Err(Error::validation("run_timeout", "must be greater than zero"));
        }
        self.tools.validate()
    }

    /// Whether `name` is a directory the analyzer never descends into
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }
}

/// Builder for [`EngineConfig`]
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already layered configuration
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache_enabled = enabled;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn remote_size_threshold(mut self, bytes: u64) -> Self {
        self.config.remote_size_threshold = bytes;
        self
    }

    pub fn large_file_threshold(mut self, bytes: u64) -> Self {
        self.config.large_file_threshold = bytes;
        self
    }

    pub fn excluded_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.excluded_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = Some(path.into());
        self
    }

    pub fn in_memory_store(mut self) -> Self {
        self.config.store_path = None;
        self
    }

    pub fn run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.run_timeout = timeout;
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.config.tools = tools;
        self
    }

    /// Record that a layer contributed to the result
    pub fn source(mut self, source: ConfigSource) -> Self {
        if !self.config.sources.contains(&source) {
            self.config.sources.push(source);
        }
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tool_timeout, Duration::from_secs(30));
        assert!(config.workers >= 1 && config.workers <= 8);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_file_size, 1_000_000);
        assert!(config.is_excluded_dir("node_modules"));
        assert!(!config.is_excluded_dir("src"));
        assert!(config.store_path.is_none());
        assert_eq!(config.sources, vec![ConfigSource::Defaults]);
        config.validate().unwrap();
    }

    #[test]
    fn test_builder_rejects_zero_values() {
        assert!(EngineConfig::builder().workers(0).build().is_err());
        assert!(EngineConfig::builder().batch_size(0).build().is_err());
        assert!(EngineConfig::builder()
            .tool_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(EngineConfig::builder()
            .run_timeout(Some(Duration::ZERO))
            .build()
            .is_err());
    }

    #[test]
    fn test_builder_records_sources_once() {
        let config = EngineConfig::builder()
            .workers(3)
            .source(ConfigSource::CommandLine)
            .source(ConfigSource::CommandLine)
            .build()
            .unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(
            config.sources,
            vec![ConfigSource::Defaults, ConfigSource::CommandLine]
        );
    }

    #[test]
    fn test_serializes_durations_as_seconds() {
        let config = EngineConfig::builder()
            .tool_timeout(Duration::from_millis(1500))
            .run_timeout(Some(Duration::from_secs(60)))
            .build()
            .unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["tool_timeout_secs"], 1.5);
        assert_eq!(json["run_timeout_secs"], 60.0);
    }
}
