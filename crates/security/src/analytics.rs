//! Per-run usage analytics

use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed run as seen by usage accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub identifier: String,
    pub tier: Tier,
    pub files_processed: usize,
    pub fixes_applied: usize,
    pub languages: Vec<String>,
    pub elapsed_secs: f64,
    pub strategy: String,
    pub success_rate: f64,
    pub recorded_at: DateTime<Utc>,
}
