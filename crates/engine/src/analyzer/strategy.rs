//! Pure sizing decisions made from repository metrics

use std::collections::BTreeMap;
use syntaxfix_core::{Language, PerformanceProfile, Strategy};

/// Baseline share of files expected to carry a fixable issue
const BASE_ERROR_RATE: f64 = 0.2;
const SECONDS_PER_FILE: f64 = 0.3;
const PARALLEL_OVERHEAD: f64 = 1.2;

/// The inputs strategy selection depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoMetrics {
    pub file_count: usize,
    pub total_size: u64,
    pub language_count: usize,
}

impl RepoMetrics {
    pub fn new(file_count: usize, total_size: u64, language_count: usize) -> Self {
        Self {
            file_count,
            total_size,
            language_count,
        }
    }
}

/// Concurrency shape for a repository of the given size
pub fn select_strategy(metrics: RepoMetrics) -> Strategy {
    if metrics.file_count > 1_000 || metrics.total_size > 10_000_000 {
        Strategy::ShardedParallel
    } else if metrics.file_count > 100 || metrics.language_count > 3 {
        Strategy::BoundedConcurrent
    } else if metrics.file_count > 20 {
        Strategy::Batched
    } else {
        Strategy::Sequential
    }
}

/// Advisory count of fixable issues, weighted by language
pub fn estimate_errors(languages: &BTreeMap<Language, usize>) -> usize {
    let files: usize = languages.values().sum();
    let baseline = files as f64 * BASE_ERROR_RATE;
    let weighted: f64 = languages
        .iter()
        .map(|(language, count)| *count as f64 * BASE_ERROR_RATE * language.error_multiplier())
        .sum();
    baseline.max(weighted) as usize
}

pub fn performance_profile(metrics: RepoMetrics) -> PerformanceProfile {
    let sequential = metrics.file_count as f64 * SECONDS_PER_FILE;
    let optimal_workers = (metrics.file_count / 10).clamp(2, 8);
    let parallel = sequential / optimal_workers as f64 * PARALLEL_OVERHEAD;
    let speedup = if parallel > 0.0 {
        sequential / parallel
    } else {
        0.0
    };

    PerformanceProfile {
        estimated_sequential_secs: round_to(sequential, 1),
        estimated_parallel_secs: round_to(parallel, 1),
        speedup_factor: round_to(speedup, 1),
        optimal_workers,
        memory_usage_estimate_mb: metrics.total_size as f64 / 1_000_000.0 * 2.0,
        complexity_score: metrics.language_count as f64 * (metrics.file_count as f64 / 100.0),
    }
}

/// At least two complexity factors make a repository worth orchestrating
pub fn orchestration_recommended(
    metrics: RepoMetrics,
    languages: &BTreeMap<Language, usize>,
) -> bool {
    let has = |language: Language| languages.contains_key(&language);
    let factors = [
        metrics.file_count > 50,
        metrics.language_count > 2,
        metrics.total_size > 1_000_000,
        has(Language::JavaScript) && has(Language::TypeScript),
        has(Language::Cpp) || has(Language::Rust),
    ];
    factors.iter().filter(|factor| **factor).count() >= 2
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languages(entries: &[(Language, usize)]) -> BTreeMap<Language, usize> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_decision_table_boundaries() {
        assert_eq!(select_strategy(RepoMetrics::new(20, 0, 1)), Strategy::Sequential);
        assert_eq!(select_strategy(RepoMetrics::new(21, 0, 1)), Strategy::Batched);
        assert_eq!(select_strategy(RepoMetrics::new(100, 0, 3)), Strategy::Batched);
        assert_eq!(
            select_strategy(RepoMetrics::new(101, 0, 1)),
            Strategy::BoundedConcurrent
        );
        assert_eq!(
            select_strategy(RepoMetrics::new(5, 0, 4)),
            Strategy::BoundedConcurrent
        );
        assert_eq!(
            select_strategy(RepoMetrics::new(1_001, 0, 1)),
            Strategy::ShardedParallel
        );
        assert_eq!(
            select_strategy(RepoMetrics::new(3, 10_000_001, 1)),
            Strategy::ShardedParallel
        );
    }

    #[test]
    fn test_error_estimate_weighting() {
        // 100 js files: weighted 26 beats the 20 baseline
        assert_eq!(estimate_errors(&languages(&[(Language::JavaScript, 100)])), 26);
        // 100 rust files: baseline 20 beats weighted 12
        assert_eq!(estimate_errors(&languages(&[(Language::Rust, 100)])), 20);
        assert_eq!(estimate_errors(&BTreeMap::new()), 0);
    }

    #[test]
    fn test_performance_profile() {
        let profile = performance_profile(RepoMetrics::new(50, 2_000_000, 2));
        assert_eq!(profile.estimated_sequential_secs, 15.0);
        assert_eq!(profile.optimal_workers, 5);
        assert_eq!(profile.estimated_parallel_secs, 3.6);
        assert_eq!(profile.speedup_factor, 4.2);
        assert_eq!(profile.memory_usage_estimate_mb, 4.0);
        assert_eq!(profile.complexity_score, 1.0);

        let empty = performance_profile(RepoMetrics::new(0, 0, 0));
        assert_eq!(empty.optimal_workers, 2);
        assert_eq!(empty.speedup_factor, 0.0);
    }

    #[test]
    fn test_orchestration_needs_two_factors() {
        let mixed = languages(&[(Language::JavaScript, 3), (Language::TypeScript, 2)]);
        assert!(!orchestration_recommended(RepoMetrics::new(5, 100, 2), &mixed));
        assert!(orchestration_recommended(RepoMetrics::new(60, 100, 2), &mixed));

        let native = languages(&[(Language::Cpp, 1), (Language::Go, 1), (Language::Python, 1)]);
        assert!(orchestration_recommended(RepoMetrics::new(3, 100, 3), &native));
    }
}
