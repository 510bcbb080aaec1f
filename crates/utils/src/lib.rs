//! Shared utilities for syntaxfix
//!
//! File-level helpers used by the engine and the usage store: atomic
//! writes, scoped file snapshots that restore on failure, modification
//! time stamps, and the tracing subscriber setup.

pub mod atomic_file;
pub mod cleanup;
pub mod file_times;
pub mod tracing;

pub use atomic_file::*;
pub use cleanup::*;
pub use file_times::*;
