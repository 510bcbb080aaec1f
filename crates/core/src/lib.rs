//! Core domain types, errors, and constants for `syntaxfix`.
//!
//! ## Key Components
//!
//! - **`errors`**: the `Error` enum and `Result` alias for failures that
//!   abort a whole request. Per-file problems are outcome statuses instead.
//! - **`types`**: file tasks, fix outcomes, languages, strategies and the
//!   repository analysis record shared by every other crate.
//! - **`constants`**: limits, thresholds and environment variable names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
