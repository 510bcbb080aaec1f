//! Access control for syntaxfix
//!
//! This crate gates access to the engine:
//! - the static tier catalog with quotas, file-size limits and features
//! - a per-identifier rolling-window rate limiter
//! - durable usage, key and analytics records behind [`AccessStore`]
//! - API key issuance and tier resolution

pub mod analytics;
pub mod clock;
pub mod controller;
pub mod keys;
pub mod store;
pub mod tier;
pub mod window;

pub use analytics::AnalyticsRecord;
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{AccessController, Admission, LimitWindow, UsageSnapshot};
pub use keys::{CallerIdentity, IssuedKey, KeyRecord, KeyRegistry, KeyRequest};
pub use store::{AccessStore, JsonFileStore, MemoryStore, StoreDocument};
pub use tier::{Tier, TierLimits};
