use ::tracing::{span, Level, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing system
///
/// Honors `RUST_LOG`, defaulting to `info`. Output goes to stderr so JSON
/// reports on stdout stay machine readable; ANSI colors only on a TTY.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    init_with_default("info")
}

/// Initialize tracing with an explicit fallback directive
pub fn init_with_default(
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one processing run
pub fn run_span(root: &str, strategy: &str, total_files: usize) -> Span {
    span!(Level::INFO, "run", root = %root, strategy = %strategy, total_files = %total_files)
}

/// Span covering one file's fallback chain
pub fn chain_span(path: &str, language: &str) -> Span {
    span!(Level::DEBUG, "chain", path = %path, language = %language)
}

/// Span covering one shard of a sharded run
pub fn shard_span(shard: usize, files: usize) -> Span {
    span!(Level::DEBUG, "shard", shard = %shard, files = %files)
}

/// Span covering one batch of a batched run
pub fn batch_span(batch: usize, files: usize) -> Span {
    span!(Level::DEBUG, "batch", batch = %batch, files = %files)
}
