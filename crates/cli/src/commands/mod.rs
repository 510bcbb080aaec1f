use clap::{Args, Subcommand};
use std::path::PathBuf;
use syntaxfix_core::ProcessingMode;
use syntaxfix_engine::Caller;

pub mod analyze;
pub mod keys;
pub mod process;
pub mod status;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured correction tools over a repository
    Process {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Processing mode (intelligent, rapid, distributed, comprehensive)
        #[arg(short, long, default_value = "intelligent")]
        mode: ProcessingMode,

        #[command(flatten)]
        caller: CallerArgs,

        /// List every file outcome, not only failures
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze a repository without running any tools
    Analyze {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Request a free-tier API key
    RequestKey {
        /// Company or project name
        #[arg(long)]
        company: String,

        /// Contact e-mail address
        #[arg(long)]
        email: String,

        /// What the key will be used for
        #[arg(long)]
        use_case: Option<String>,
    },

    /// Show remaining quota for a caller
    Usage {
        #[command(flatten)]
        caller: CallerArgs,
    },

    /// List the tier catalog
    Tiers,

    /// Show supported languages, configured chains and statistics
    Status,
}

/// Who is making the request
#[derive(Debug, Clone, Args)]
pub struct CallerArgs {
    /// API key issued by `request-key`
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Caller address used to bucket requests without a valid key
    #[arg(long, default_value = "local")]
    pub address: String,
}

impl CallerArgs {
    pub fn caller(&self) -> Caller {
        match &self.api_key {
            Some(key) => Caller::with_key(key.clone(), self.address.clone()),
            None => Caller::anonymous(self.address.clone()),
        }
    }
}
