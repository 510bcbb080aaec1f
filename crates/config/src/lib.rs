//! Configuration for syntaxfix
//!
//! Holds the per-language tool chains and the engine settings, and loads
//! them from defaults, an optional JSON file and environment overrides.

pub mod config;
pub mod loader;
pub mod tools;

#[cfg(test)]
mod config_tests;

pub use config::*;
pub use loader::*;
pub use tools::*;
