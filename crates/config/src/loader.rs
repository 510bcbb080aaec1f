//! Layered configuration loading
//!
//! Defaults, then an optional JSON config file, then `SYNTAXFIX_*`
//! environment overrides. Command line flags are applied by the caller on top
//! of the returned builder.

use crate::config::{ConfigSource, EngineConfig, EngineConfigBuilder};
use crate::tools::ToolRegistry;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use syntaxfix_core::{
    constants::{
        SYNTAXFIX_CACHE_VAR, SYNTAXFIX_CONFIG_VAR, SYNTAXFIX_STORE_VAR,
        SYNTAXFIX_TOOL_TIMEOUT_VAR, SYNTAXFIX_WORKERS_VAR,
    },
    Error, Language, Result,
};
use tracing::debug;

/// On-disk shape of the config file; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub tool_timeout_secs: Option<f64>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub cache_enabled: Option<bool>,
    pub max_file_size: Option<u64>,
    pub remote_size_threshold: Option<u64>,
    pub large_file_threshold: Option<u64>,
    pub excluded_dirs: Option<Vec<String>>,
    pub store_path: Option<PathBuf>,
    pub run_timeout_secs: Option<f64>,
    /// Chains replacing the defaults language by language
    pub tools: Option<ToolRegistry>,
    /// Languages whose chains are removed entirely
    #[serde(default)]
    pub disabled_languages: Vec<Language>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read config file", e))?;
        serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    fn apply(self, mut builder: EngineConfigBuilder, base_tools: ToolRegistry) -> Result<EngineConfigBuilder> {
        if let Some(secs) = self.tool_timeout_secs {
            builder = builder.tool_timeout(seconds("tool_timeout_secs", secs)?);
        }
        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
        }
        if let Some(batch_size) = self.batch_size {
            builder = builder.batch_size(batch_size);
        }
        if let Some(enabled) = self.cache_enabled {
            builder = builder.cache_enabled(enabled);
        }
        if let Some(bytes) = self.max_file_size {
            builder = builder.max_file_size(bytes);
        }
        if let Some(bytes) = self.remote_size_threshold {
            builder = builder.remote_size_threshold(bytes);
        }
        if let Some(bytes) = self.large_file_threshold {
            builder = builder.large_file_threshold(bytes);
        }
        if let Some(dirs) = self.excluded_dirs {
            builder = builder.excluded_dirs(dirs);
        }
        if let Some(path) = self.store_path {
            builder = builder.store_path(path);
        }
        if let Some(secs) = self.run_timeout_secs {
            builder = builder.run_timeout(Some(seconds("run_timeout_secs", secs)?));
        }

        let mut tools = base_tools;
        if let Some(overrides) = self.tools {
            tools.merge(overrides);
        }
        for language in self.disabled_languages {
            tools.remove(language);
        }
        Ok(builder.tools(tools))
    }
}

fn seconds(field: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::validation(field, "must be a non-negative number of seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Loads an [`EngineConfig`] from the standard layers
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    read_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            read_env: true,
        }
    }

    /// Use an explicit config file instead of `SYNTAXFIX_CONFIG`
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skip environment overrides
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Apply file and environment layers and return a builder for the caller's
    /// own overrides
    pub fn load_builder(self) -> Result<EngineConfigBuilder> {
        let mut builder = EngineConfigBuilder::new();
        let defaults = EngineConfig::default().tools;

        let file = match self.file {
            Some(path) => Some(path),
            None if self.read_env => std::env::var_os(SYNTAXFIX_CONFIG_VAR).map(PathBuf::from),
            None => None,
        };

        if let Some(path) = file {
            debug!(path = %path.display(), "loading config file");
            let parsed = ConfigFile::read(&path)?;
            builder = parsed
                .apply(builder, defaults)?
                .source(ConfigSource::File(path));
        }

        if self.read_env {
            builder = apply_env(builder)?;
        }

        Ok(builder)
    }

    /// Load and validate
    pub fn load(self) -> Result<EngineConfig> {
        self.load_builder()?.build()
    }
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn apply_env(mut builder: EngineConfigBuilder) -> Result<EngineConfigBuilder> {
    if let Some(raw) = env_value(SYNTAXFIX_TOOL_TIMEOUT_VAR) {
        let secs: f64 = raw.parse().map_err(|_| {
            Error::validation(SYNTAXFIX_TOOL_TIMEOUT_VAR, format!("'{raw}' is not a number"))
        })?;
        builder = builder
            .tool_timeout(seconds(SYNTAXFIX_TOOL_TIMEOUT_VAR, secs)?)
            .source(ConfigSource::Environment(SYNTAXFIX_TOOL_TIMEOUT_VAR.into()));
    }

    if let Some(raw) = env_value(SYNTAXFIX_WORKERS_VAR) {
        let workers: usize = raw.parse().map_err(|_| {
            Error::validation(SYNTAXFIX_WORKERS_VAR, format!("'{raw}' is not a worker count"))
        })?;
        builder = builder
            .workers(workers)
            .source(ConfigSource::Environment(SYNTAXFIX_WORKERS_VAR.into()));
    }

    if let Some(raw) = env_value(SYNTAXFIX_CACHE_VAR) {
        let enabled = parse_flag(&raw).ok_or_else(|| {
            Error::validation(SYNTAXFIX_CACHE_VAR, format!("'{raw}' is not a boolean"))
        })?;
        builder = builder
            .cache_enabled(enabled)
            .source(ConfigSource::Environment(SYNTAXFIX_CACHE_VAR.into()));
    }

    if let Some(raw) = env_value(SYNTAXFIX_STORE_VAR) {
        builder = builder
            .store_path(raw)
            .source(ConfigSource::Environment(SYNTAXFIX_STORE_VAR.into()));
    }

    Ok(builder)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_seconds_rejects_negative() {
        assert!(seconds("x", -1.0).is_err());
        assert!(seconds("x", f64::NAN).is_err());
        assert_eq!(seconds("x", 2.5).unwrap(), Duration::from_millis(2500));
    }
}
