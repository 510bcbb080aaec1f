//! Static tier catalog

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use syntaxfix_core::Error;

/// Named access class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Demo,
    Free,
    Pro,
    Enterprise,
}

/// Quotas and capabilities of one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    pub fixes_per_day: usize,
    pub fixes_per_hour: usize,
    /// Largest file the analyzer will accept, in bytes
    pub max_file_size: u64,
    pub features: &'static [&'static str],
}

pub const FEATURE_DISTRIBUTED_PROCESSING: &str = "distributed_processing";

/// Feature names that grant every other feature
const WILDCARD_FEATURES: [&str; 2] = ["all_features", "unlimited_features"];

const MB: u64 = 1024 * 1024;

const DEMO: TierLimits = TierLimits {
    fixes_per_day: 50,
    fixes_per_hour: 20,
    max_file_size: MB,
    features: &["basic_fixing"],
};

const FREE: TierLimits = TierLimits {
    fixes_per_day: 500,
    fixes_per_hour: 100,
    max_file_size: 5 * MB,
    features: &["basic_fixing", FEATURE_DISTRIBUTED_PROCESSING, "analytics"],
};

const PRO: TierLimits = TierLimits {
    fixes_per_day: 5_000,
    fixes_per_hour: 1_000,
    max_file_size: 50 * MB,
    features: &["all_features", "priority_processing", "advanced_analytics"],
};

const ENTERPRISE: TierLimits = TierLimits {
    fixes_per_day: 50_000,
    fixes_per_hour: 10_000,
    max_file_size: 500 * MB,
    features: &["unlimited_features", "dedicated_support", "custom_integrations"],
};

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Demo, Tier::Free, Tier::Pro, Tier::Enterprise];

    pub fn limits(&self) -> &'static TierLimits {
        match self {
            Tier::Demo => &DEMO,
            Tier::Free => &FREE,
            Tier::Pro => &PRO,
            Tier::Enterprise => &ENTERPRISE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Demo => "demo",
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Enterprise => "enterprise",
        }
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        let features = self.limits().features;
        features.contains(&feature) || features.iter().any(|f| WILDCARD_FEATURES.contains(f))
    }

    /// Whether a denial should point the caller at a higher tier
    pub fn upgrade_available(&self) -> bool {
        matches!(self, Tier::Demo | Tier::Free)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Tier::Demo),
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(Error::validation("tier", format!("unknown tier '{other}'"))),
        }
    }
}
