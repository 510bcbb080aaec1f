use std::path::PathBuf;

/// Result type alias for syntaxfix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for syntaxfix operations
///
/// Per-file problems (missing tools, failed tools, timeouts) are never
/// reported through this type; they are recorded as outcome statuses. This
/// enum covers the failures that abort a whole request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The repository root handed to the engine does not exist
    #[error("repository path does not exist: '{path}'")]
    RepositoryNotFound { path: PathBuf },

    /// The tree walk could not proceed
    #[error("failed to walk '{path}': {message}")]
    Walk { path: PathBuf, message: String },

    /// No eligible source files after filtering
    #[error("no processable files found in '{path}'")]
    NoProcessableFiles { path: PathBuf },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Invalid caller-supplied input
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Persistence layer errors
    #[error("usage store error: {message}")]
    Store { message: String },

    /// Network-related errors
    #[error("network error for '{endpoint}': {message}")]
    Network { endpoint: String, message: String },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl Error {
    /// Create a repository-not-found error
    #[must_use]
    pub fn repository_not_found(path: impl Into<PathBuf>) -> Self {
        Error::RepositoryNotFound { path: path.into() }
    }

    /// Create a tree walk error
    #[must_use]
    pub fn walk(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Walk {
            path: path.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn no_processable_files(path: impl Into<PathBuf>) -> Self {
        Error::NoProcessableFiles { path: path.into() }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error for a named input field
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a store error
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Error::Store {
            message: message.into(),
        }
    }

    /// Create a network error
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Whether the error means no file could be classified at all
    pub fn is_fatal_walk_error(&self) -> bool {
        matches!(
            self,
            Error::RepositoryNotFound { .. } | Error::Walk { .. } | Error::NoProcessableFiles { .. }
        )
    }
}

// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", message.into(), base_error),
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", f(), base_error),
            }
        })
    }
}
