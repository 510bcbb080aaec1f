/// Constants used throughout the syntaxfix codebase
use std::time::Duration;

// Environment variable names
pub const SYNTAXFIX_CONFIG_VAR: &str = "SYNTAXFIX_CONFIG";
pub const SYNTAXFIX_STORE_VAR: &str = "SYNTAXFIX_STORE";
pub const SYNTAXFIX_TOOL_TIMEOUT_VAR: &str = "SYNTAXFIX_TOOL_TIMEOUT_SECS";
pub const SYNTAXFIX_WORKERS_VAR: &str = "SYNTAXFIX_WORKERS";
pub const SYNTAXFIX_CACHE_VAR: &str = "SYNTAXFIX_CACHE";

// Per-invocation ceiling for any correction tool
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

// Tree walk limits
pub const MAX_ANALYZED_FILE_SIZE: u64 = 1_000_000;
pub const EXCLUDED_DIRECTORIES: &[&str] = &[
    "node_modules",
    "__pycache__",
    "target",
    "build",
    "dist",
    "vendor",
];

// Remote correction is only attempted on small files
pub const REMOTE_SIZE_THRESHOLD: u64 = 10_000;
pub const LARGE_FILE_THRESHOLD: u64 = 50_000;

// Scheduler shape
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const MAX_WORKERS: usize = 8;

// Pattern-based heuristic
pub const PATTERN_MATCHES_PER_FIX: usize = 3;
pub const PATTERN_MAX_ESTIMATED_FIXES: usize = 5;

// Rate limiting windows
pub const DAILY_WINDOW: Duration = Duration::from_secs(86_400);
pub const HOURLY_WINDOW: Duration = Duration::from_secs(3_600);

// Tool diagnostics kept in outcome details
pub const MAX_DIAGNOSTIC_CHARS: usize = 200;

pub const SERVICE_NAME: &str = "syntaxfix";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
