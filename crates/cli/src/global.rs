//! Flags shared by every subcommand and the configuration they produce

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use syntaxfix_config::{ConfigLoader, ConfigSource, EngineConfig, EngineConfigBuilder};
use syntaxfix_core::Result;

/// Usage store used when neither the config nor the command line names one
pub const DEFAULT_STORE_PATH: &str = ".syntaxfix/store.json";

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// JSON config file (defaults to $SYNTAXFIX_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Usage store location
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "ephemeral")]
    pub store: Option<PathBuf>,

    /// Keep usage in memory for this invocation only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Worker budget for concurrent strategies
    #[arg(long, global = true, value_name = "N")]
    pub workers: Option<usize>,

    /// Disable the outcome cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Per-tool timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// Stop starting new files after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub run_timeout: Option<u64>,
}

impl GlobalArgs {
    pub fn load_config(&self) -> Result<EngineConfig> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }
        self.apply(loader)
    }

    /// Layer the command-line overrides over whatever `loader` produces
    pub fn apply(&self, loader: ConfigLoader) -> Result<EngineConfig> {
        let mut builder = loader.load_builder()?;
        let mut overridden = false;

        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
            overridden = true;
        }
        if self.no_cache {
            builder = builder.cache_enabled(false);
            overridden = true;
        }
        if let Some(secs) = self.tool_timeout {
            builder = builder.tool_timeout(Duration::from_secs(secs));
            overridden = true;
        }
        if let Some(secs) = self.run_timeout {
            builder = builder.run_timeout(Some(Duration::from_secs(secs)));
            overridden = true;
        }
        if overridden {
            builder = builder.source(ConfigSource::CommandLine);
        }

        let config = builder.build()?;
        let builder = EngineConfigBuilder::from_config(config);
        let builder = if self.ephemeral {
            builder.in_memory_store().source(ConfigSource::CommandLine)
        } else if let Some(path) = &self.store {
            builder.store_path(path).source(ConfigSource::CommandLine)
        } else {
            builder
        };

        let mut config = builder.build()?;
        if config.store_path.is_none() && !self.ephemeral {
            config.store_path = Some(PathBuf::from(DEFAULT_STORE_PATH));
        }
        Ok(config)
    }
}
