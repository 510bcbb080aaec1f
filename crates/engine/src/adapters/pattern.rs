//! In-process pattern heuristic, the last step of every chain
//!
//! Counts matches of language-characteristic patterns and turns them into
//! an estimate. It never touches the file and never fails on a readable
//! file.

use super::ToolAdapter;
use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::time::Instant;
use syntaxfix_config::{ToolInvocation, ToolSpec};
use syntaxfix_core::{
    FileTask, FixOutcome, FixStatus, ToolRole, PATTERN_MATCHES_PER_FIX,
    PATTERN_MAX_ESTIMATED_FIXES,
};
use tracing::warn;

#[derive(Debug, Default)]
pub struct PatternAdapter {
    compiled: DashMap<String, Option<Regex>>,
}

impl PatternAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn regex(&self, pattern: &str) -> Option<Regex> {
        if let Some(cached) = self.compiled.get(pattern) {
            return cached.clone();
        }
        let compiled = match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "skipping invalid correction pattern");
                None
            }
        };
        self.compiled.insert(pattern.to_string(), compiled.clone());
        compiled
    }

    /// Total matches of every pattern in `content`
    pub fn count_matches(&self, content: &str, patterns: &[String]) -> usize {
        patterns
            .iter()
            .filter_map(|pattern| self.regex(pattern))
            .map(|regex| regex.find_iter(content).count())
            .sum()
    }
}

#[async_trait]
impl ToolAdapter for PatternAdapter {
    async fn attempt(&self, task: &FileTask, tool: &ToolSpec) -> FixOutcome {
        let started = Instant::now();
        let method = ToolRole::PatternBased.method_name();

        let patterns: &[String] = match &tool.invocation {
            ToolInvocation::Patterns(patterns) => patterns,
            _ => {
                return FixOutcome::new(task, method, FixStatus::ExecutionError)
                    .with_detail("error", format!("{tool} is not a pattern heuristic"))
                    .with_elapsed(started.elapsed());
            }
        };

        let content = match tokio::fs::read(&task.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                return FixOutcome::new(task, method, FixStatus::ExecutionError)
                    .with_detail("error", format!("failed to read file: {e}"))
                    .with_elapsed(started.elapsed());
            }
        };

        let matches = self.count_matches(&content, patterns);
        let estimated = matches / PATTERN_MATCHES_PER_FIX;

        FixOutcome::new(task, method, FixStatus::Success)
            .with_counts(estimated.max(1), estimated.min(PATTERN_MAX_ESTIMATED_FIXES))
            .with_detail("patterns_matched", matches)
            .with_detail("estimated", true)
            .with_elapsed(started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use syntaxfix_core::Language;
    use tempfile::TempDir;

    fn heuristic(patterns: &[&str]) -> ToolSpec {
        ToolSpec {
            role: ToolRole::PatternBased,
            invocation: ToolInvocation::Patterns(patterns.iter().map(|p| p.to_string()).collect()),
        }
    }

    #[tokio::test]
    async fn test_estimate_from_matches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.js");
        fs::write(&path, "var a\nvar b\nvar c\nvar d\nvar e\nvar f\nvar g\n").unwrap();
        let task = FileTask::new(&path, Language::JavaScript, 42);

        let outcome = PatternAdapter::new()
            .attempt(&task, &heuristic(&[r"\bvar\b"]))
            .await;

        assert_eq!(outcome.status, FixStatus::Success);
        assert_eq!(outcome.method, "pattern_based");
        assert_eq!(outcome.details["patterns_matched"], 7);
        assert_eq!(outcome.errors_found, 2);
        assert_eq!(outcome.fixes_applied, 2);
        assert_eq!(outcome.details["estimated"], true);
    }

    #[tokio::test]
    async fn test_fixes_are_capped_and_errors_floored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.c");
        fs::write(&path, ";".repeat(40)).unwrap();
        let task = FileTask::new(&path, Language::Cpp, 40);

        let capped = PatternAdapter::new().attempt(&task, &heuristic(&[";"])).await;
        assert_eq!(capped.errors_found, 13);
        assert_eq!(capped.fixes_applied, 5);

        let none = PatternAdapter::new().attempt(&task, &heuristic(&["xyz"])).await;
        assert_eq!(none.status, FixStatus::Success);
        assert_eq!(none.errors_found, 1);
        assert_eq!(none.fixes_applied, 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_execution_error() {
        let dir = TempDir::new().unwrap();
        let task = FileTask::new(dir.path().join("gone.py"), Language::Python, 0);

        let outcome = PatternAdapter::new().attempt(&task, &heuristic(&["x"])).await;
        assert_eq!(outcome.status, FixStatus::ExecutionError);
        assert_eq!(outcome.method, "pattern_based");
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let adapter = PatternAdapter::new();
        let patterns = vec!["(".to_string(), "a".to_string()];
        assert_eq!(adapter.count_matches("aaa", &patterns), 3);
        assert_eq!(adapter.count_matches("aa", &patterns), 2);
    }
}
