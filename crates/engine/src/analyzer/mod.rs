//! Repository analysis
//!
//! Walks a tree once, classifies files by extension and produces both the
//! [`RepoAnalysis`] and the task list the scheduler consumes.

mod strategy;
#[cfg(test)]
mod tests_proptest;

pub use strategy::{
    estimate_errors, orchestration_recommended, performance_profile, select_strategy, RepoMetrics,
};
pub(crate) use strategy::round_to;

use std::collections::BTreeMap;
use std::path::Path;
use syntaxfix_config::EngineConfig;
use syntaxfix_core::{
    Error, FileTask, Language, RepoAnalysis, Result, EXCLUDED_DIRECTORIES, MAX_ANALYZED_FILE_SIZE,
};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Analysis plus the files it was computed from
#[derive(Debug, Clone)]
pub struct RepositoryScan {
    pub analysis: RepoAnalysis,
    pub tasks: Vec<FileTask>,
}

#[derive(Debug, Clone)]
pub struct RepositoryAnalyzer {
    excluded_dirs: Vec<String>,
    max_file_size: u64,
}

impl Default for RepositoryAnalyzer {
    fn default() -> Self {
        Self {
            excluded_dirs: EXCLUDED_DIRECTORIES.iter().map(|d| d.to_string()).collect(),
            max_file_size: MAX_ANALYZED_FILE_SIZE,
        }
    }
}

impl RepositoryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            excluded_dirs: config.excluded_dirs.clone(),
            max_file_size: config.max_file_size,
        }
    }

    /// Lower the per-file ceiling; it never grows past the configured one
    #[must_use]
    pub fn with_size_ceiling(mut self, bytes: u64) -> Self {
        self.max_file_size = self.max_file_size.min(bytes);
        self
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn analyze(&self, root: &Path) -> Result<RepoAnalysis> {
        self.scan(root).map(|scan| scan.analysis)
    }

    /// Walk `root` and classify every eligible file
    ///
    /// A missing root, or a root that cannot be read, is fatal. Unreadable
    /// entries below the root are logged and skipped.
    pub fn scan(&self, root: &Path) -> Result<RepositoryScan> {
        if !root.exists() {
            return Err(Error::repository_not_found(root));
        }
        if !root.is_dir() {
            return Err(Error::walk(root, "repository root is not a directory"));
        }

        let mut tasks = Vec::new();
        let mut languages: BTreeMap<Language, usize> = BTreeMap::new();
        let mut total_size = 0u64;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_skipped(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(Error::walk(root, e.to_string())),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(language) = Language::from_path(entry.path()) else {
                continue;
            };
            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping file without metadata");
                    continue;
                }
            };
            if size > self.max_file_size {
                debug!(path = %entry.path().display(), size, "skipping oversized file");
                continue;
            }

            *languages.entry(language).or_default() += 1;
            total_size += size;
            tasks.push(FileTask::new(entry.into_path(), language, size));
        }

        let metrics = RepoMetrics::new(tasks.len(), total_size, languages.len());
        let analysis = RepoAnalysis {
            total_files: tasks.len(),
            total_size_bytes: total_size,
            estimated_errors: estimate_errors(&languages),
            strategy: select_strategy(metrics),
            performance_profile: performance_profile(metrics),
            orchestration_recommended: orchestration_recommended(metrics, &languages),
            languages,
        };

        info!(
            root = %root.display(),
            files = analysis.total_files,
            languages = analysis.languages.len(),
            strategy = %analysis.strategy,
            "repository analyzed"
        );
        Ok(RepositoryScan { analysis, tasks })
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && self.excluded_dirs.iter().any(|dir| *dir == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use syntaxfix_core::Strategy;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_classifies_and_excludes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "src/app.js", "var a = 1");
        write(root, "src/lib.ts", "let b: number = 2");
        write(root, "tool.py", "print('x')");
        write(root, "README.md", "# readme");
        write(root, "node_modules/dep/index.js", "module.exports = 1");
        write(root, "target/debug/gen.rs", "fn main() {}");
        write(root, ".git/hooks/pre-commit.py", "x = 1");
        write(root, "src/.hidden.js", "var h");

        let scan = RepositoryAnalyzer::new().scan(root).unwrap();

        assert_eq!(scan.analysis.total_files, 3);
        assert_eq!(scan.analysis.languages[&Language::JavaScript], 1);
        assert_eq!(scan.analysis.languages[&Language::TypeScript], 1);
        assert_eq!(scan.analysis.languages[&Language::Python], 1);
        assert!(!scan.analysis.languages.contains_key(&Language::Rust));
        assert_eq!(scan.analysis.strategy, Strategy::Sequential);
        assert_eq!(scan.tasks.len(), 3);
    }

    #[test]
    fn test_size_ceiling_skips_large_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "big.go", &"a".repeat(2_048));
        write(dir.path(), "small.go", "package main");

        let analyzer = RepositoryAnalyzer::new().with_size_ceiling(1_024);
        let scan = analyzer.scan(dir.path()).unwrap();
        assert_eq!(scan.tasks.len(), 1);
        assert!(scan.tasks[0].path.ends_with("small.go"));

        assert_eq!(
            RepositoryAnalyzer::new().with_size_ceiling(u64::MAX).max_file_size(),
            MAX_ANALYZED_FILE_SIZE
        );
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = RepositoryAnalyzer::new()
            .scan(&dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, Error::RepositoryNotFound { .. }));
        assert!(err.is_fatal_walk_error());
    }

    #[test]
    fn test_empty_tree_analyzes_to_zero() {
        let dir = TempDir::new().unwrap();
        let analysis = RepositoryAnalyzer::new().analyze(dir.path()).unwrap();
        assert_eq!(analysis.total_files, 0);
        assert_eq!(analysis.estimated_errors, 0);
        assert!(!analysis.orchestration_recommended);
    }
}
