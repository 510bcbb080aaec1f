//! Strategy selection on real trees

mod common;

use common::*;
use syntaxfix_core::{Language, Strategy};
use syntaxfix_engine::RepositoryAnalyzer;

fn populate(ws: &Workspace, count: usize, extensions: &[&str]) {
    for i in 0..count {
        let ext = extensions[i % extensions.len()];
        ws.file(&format!("src/m{}/file{i}.{ext}", i % 16), "x\n");
    }
}

#[test]
fn test_five_files_run_sequentially() {
    let ws = Workspace::new();
    populate(&ws, 5, &["py"]);
    let analysis = RepositoryAnalyzer::new().analyze(&ws.repo).unwrap();
    assert_eq!(analysis.total_files, 5);
    assert_eq!(analysis.strategy, Strategy::Sequential);
}

#[test]
fn test_fifty_files_two_languages_are_batched() {
    let ws = Workspace::new();
    populate(&ws, 50, &["js", "go"]);
    let analysis = RepositoryAnalyzer::new().analyze(&ws.repo).unwrap();
    assert_eq!(analysis.languages.len(), 2);
    assert_eq!(analysis.languages[&Language::JavaScript], 25);
    assert_eq!(analysis.strategy, Strategy::Batched);
    // 25 * 0.2 * 1.3 + 25 * 0.2 * 0.7 = 10
    assert_eq!(analysis.estimated_errors, 10);
}

#[test]
fn test_c_and_cpp_count_as_one_language() {
    let ws = Workspace::new();
    for name in ["a.c", "include/a.h", "b.cpp", "c.py", "d.js"] {
        ws.file(name, "x\n");
    }
    let analysis = RepositoryAnalyzer::new().analyze(&ws.repo).unwrap();
    assert_eq!(analysis.languages.len(), 3);
    assert_eq!(analysis.languages[&Language::Cpp], 3);
    assert_eq!(analysis.strategy, Strategy::Sequential);

    populate(&ws, 5, &["go"]);
    let analysis = RepositoryAnalyzer::new().analyze(&ws.repo).unwrap();
    assert_eq!(analysis.languages.len(), 4);
    assert_eq!(analysis.strategy, Strategy::BoundedConcurrent);
}

#[test]
fn test_large_tree_is_sharded() {
    let ws = Workspace::new();
    populate(&ws, 1_500, &["rs", "java", "cpp"]);
    let analysis = RepositoryAnalyzer::new().analyze(&ws.repo).unwrap();
    assert_eq!(analysis.total_files, 1_500);
    assert_eq!(analysis.strategy, Strategy::ShardedParallel);
    assert!(analysis.orchestration_recommended);
}

#[test]
fn test_excluded_directories_do_not_count() {
    let ws = Workspace::new();
    populate(&ws, 3, &["ts"]);
    for dir in ["node_modules", "dist", "vendor", ".venv"] {
        for i in 0..30 {
            ws.file(&format!("{dir}/pkg/file{i}.ts"), "x\n");
        }
    }
    let analysis = RepositoryAnalyzer::new().analyze(&ws.repo).unwrap();
    assert_eq!(analysis.total_files, 3);
    assert_eq!(analysis.strategy, Strategy::Sequential);
}
