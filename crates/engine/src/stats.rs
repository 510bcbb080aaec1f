//! Process-wide orchestration counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use syntaxfix_core::{FixOutcome, FixStatus, ToolRole};

#[derive(Debug, Default)]
pub struct OrchestrationStats {
    total_requests: AtomicU64,
    local_successes: AtomicU64,
    remote_successes: AtomicU64,
    fallback_uses: AtomicU64,
    pattern_based_uses: AtomicU64,
    cache_hits: AtomicU64,
}

/// Point-in-time copy of the counters with derived rates in percent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub local_successes: u64,
    pub remote_successes: u64,
    pub fallback_uses: u64,
    pub pattern_based_uses: u64,
    pub cache_hits: u64,
    pub local_success_rate: f64,
    pub remote_success_rate: f64,
    pub fallback_usage_rate: f64,
}

impl OrchestrationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a finished chain. `first_step` says whether the outcome came
    /// from the first step that was attempted.
    pub(crate) fn record_outcome(&self, outcome: &FixOutcome, first_step: bool) {
        if outcome.status != FixStatus::Success {
            return;
        }
        if outcome.method == ToolRole::Remote.method_name() {
            self.remote_successes.fetch_add(1, Ordering::Relaxed);
        } else if outcome.method == ToolRole::PatternBased.method_name() {
            self.pattern_based_uses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.local_successes.fetch_add(1, Ordering::Relaxed);
        }
        if !first_step {
            self.fallback_uses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let local_successes = self.local_successes.load(Ordering::Relaxed);
        let remote_successes = self.remote_successes.load(Ordering::Relaxed);
        let fallback_uses = self.fallback_uses.load(Ordering::Relaxed);
        let rate = |count: u64| count as f64 / total_requests.max(1) as f64 * 100.0;

        StatsSnapshot {
            total_requests,
            local_successes,
            remote_successes,
            fallback_uses,
            pattern_based_uses: self.pattern_based_uses.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            local_success_rate: rate(local_successes),
            remote_success_rate: rate(remote_successes),
            fallback_usage_rate: rate(fallback_uses),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syntaxfix_core::{FileTask, Language};

    fn outcome(method: &str, status: FixStatus) -> FixOutcome {
        FixOutcome::new(&FileTask::new("a.go", Language::Go, 1), method, status)
    }

    #[test]
    fn test_rates_follow_counters() {
        let stats = OrchestrationStats::new();
        for _ in 0..4 {
            stats.record_request();
        }
        stats.record_outcome(&outcome("local_primary", FixStatus::Success), true);
        stats.record_outcome(&outcome("remote_api", FixStatus::Success), true);
        stats.record_outcome(&outcome("pattern_based", FixStatus::Success), false);
        stats.record_outcome(&outcome("local_primary", FixStatus::ToolFailed), true);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.local_successes, 1);
        assert_eq!(snapshot.remote_successes, 1);
        assert_eq!(snapshot.pattern_based_uses, 1);
        assert_eq!(snapshot.fallback_uses, 1);
        assert!((snapshot.local_success_rate - 25.0).abs() < f64::EPSILON);
        assert!((snapshot.fallback_usage_rate - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_snapshot_has_zero_rates() {
        let snapshot = OrchestrationStats::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.remote_success_rate, 0.0);
    }
}
