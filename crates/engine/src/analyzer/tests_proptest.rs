//! Property-based tests for strategy selection

use super::*;
use proptest::prelude::*;
use syntaxfix_core::Strategy;

proptest! {
    #[test]
    fn test_more_files_never_lowers_strategy(
        files in 0usize..5_000,
        extra in 0usize..5_000,
        size in 0u64..20_000_000,
        languages in 0usize..8,
    ) {
        let smaller = select_strategy(RepoMetrics::new(files, size, languages));
        let larger = select_strategy(RepoMetrics::new(files + extra, size, languages));
        prop_assert!(smaller <= larger);
    }

    #[test]
    fn test_selection_matches_decision_table(
        files in 0usize..3_000,
        size in 0u64..30_000_000,
        languages in 0usize..8,
    ) {
        let strategy = select_strategy(RepoMetrics::new(files, size, languages));
        let expected = if files > 1_000 || size > 10_000_000 {
            Strategy::ShardedParallel
        } else if files > 100 || languages > 3 {
            Strategy::BoundedConcurrent
        } else if files > 20 {
            Strategy::Batched
        } else {
            Strategy::Sequential
        };
        prop_assert_eq!(strategy, expected);
    }

    #[test]
    fn test_error_estimate_never_below_baseline(
        counts in prop::collection::vec(0usize..500, Language::ALL.len()),
    ) {
        let languages: BTreeMap<Language, usize> =
            Language::ALL.iter().copied().zip(counts.iter().copied()).collect();
        let files: usize = counts.iter().sum();
        prop_assert!(estimate_errors(&languages) >= (files as f64 * 0.2) as usize);
    }
}
