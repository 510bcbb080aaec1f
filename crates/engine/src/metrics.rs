//! Repository-level metrics reduced from per-file outcomes

use crate::analyzer::round_to;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use syntaxfix_core::{FixOutcome, FixStatus, Language, RepoAnalysis};

/// Throughput never divides by less than this many seconds
const MIN_ELAPSED_SECS: f64 = 0.1;

/// Totals for one slice of the outcomes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub files: usize,
    pub errors: usize,
    pub fixes: usize,
    pub avg_time_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateAccuracy {
    pub estimated: usize,
    pub actual: usize,
    /// Percent; negative when the estimate was off by more than itself
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub total_files_processed: usize,
    pub successful_files: usize,
    pub total_errors_found: usize,
    pub total_fixes_applied: usize,
    /// Fixes over errors in percent. Not clamped: above 100 means more
    /// lines changed than issues were counted.
    pub success_rate: f64,
    pub over_correction_factor: f64,
    pub execution_time_secs: f64,
    pub throughput_files_per_sec: f64,
    pub average_time_per_file_secs: f64,
    pub method_breakdown: BTreeMap<String, Breakdown>,
    pub language_breakdown: BTreeMap<Language, Breakdown>,
    pub estimated_vs_actual: EstimateAccuracy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsAggregator;

impl MetricsAggregator {
    pub fn reduce(outcomes: &[FixOutcome], elapsed: Duration, analysis: &RepoAnalysis) -> RunMetrics {
        let total_files = outcomes.len();
        let successful_files = outcomes
            .iter()
            .filter(|outcome| outcome.status == FixStatus::Success)
            .count();
        let total_errors: usize = outcomes.iter().map(|outcome| outcome.errors_found).sum();
        let total_fixes: usize = outcomes.iter().map(|outcome| outcome.fixes_applied).sum();

        let ratio = total_fixes as f64 / total_errors.max(1) as f64;
        let elapsed_secs = elapsed.as_secs_f64();

        let mut method_breakdown: BTreeMap<String, Accumulator> = BTreeMap::new();
        let mut language_breakdown: BTreeMap<Language, Accumulator> = BTreeMap::new();
        for outcome in outcomes {
            method_breakdown
                .entry(outcome.method.clone())
                .or_default()
                .add(outcome);
            language_breakdown
                .entry(outcome.language)
                .or_default()
                .add(outcome);
        }

        let estimated = analysis.estimated_errors;
        let accuracy = (1.0 - estimated.abs_diff(total_errors) as f64 / estimated.max(1) as f64) * 100.0;

        RunMetrics {
            total_files_processed: total_files,
            successful_files,
            total_errors_found: total_errors,
            total_fixes_applied: total_fixes,
            success_rate: round_to(ratio * 100.0, 1),
            over_correction_factor: round_to(ratio, 2),
            execution_time_secs: round_to(elapsed_secs, 2),
            throughput_files_per_sec: round_to(
                total_files as f64 / elapsed_secs.max(MIN_ELAPSED_SECS),
                2,
            ),
            average_time_per_file_secs: round_to(elapsed_secs / total_files.max(1) as f64, 3),
            method_breakdown: finish(method_breakdown),
            language_breakdown: finish(language_breakdown),
            estimated_vs_actual: EstimateAccuracy {
                estimated,
                actual: total_errors,
                accuracy: round_to(accuracy, 1),
            },
        }
    }
}

#[derive(Default)]
struct Accumulator {
    breakdown: Breakdown,
    total_time: Duration,
}

impl Accumulator {
    fn add(&mut self, outcome: &FixOutcome) {
        self.breakdown.files += 1;
        self.breakdown.errors += outcome.errors_found;
        self.breakdown.fixes += outcome.fixes_applied;
        self.total_time += outcome.elapsed;
    }

    fn finish(mut self) -> Breakdown {
        let files = self.breakdown.files.max(1) as f64;
        self.breakdown.avg_time_secs = round_to(self.total_time.as_secs_f64() / files, 3);
        self.breakdown
    }
}

fn finish<K: Ord>(groups: BTreeMap<K, Accumulator>) -> BTreeMap<K, Breakdown> {
    groups
        .into_iter()
        .map(|(key, group)| (key, group.finish()))
        .collect()
}
