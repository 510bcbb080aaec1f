//! Shared fixtures for engine integration tests
#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use syntaxfix_config::{CommandSpec, EngineConfig, LanguageChain, ToolRegistry};
use syntaxfix_core::Language;
use syntaxfix_engine::{SyntaxFixEngine, ToolRunner};
use syntaxfix_security::{ManualClock, MemoryStore};
use tempfile::TempDir;

pub const MISSING_TOOL: &str = "syntaxfix-test-tool-that-is-not-installed";

/// A repository root plus a separate directory for tool scripts
pub struct Workspace {
    _dir: TempDir,
    pub repo: PathBuf,
    pub tools: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let repo = dir.path().join("repo");
        let tools = dir.path().join("tools");
        fs::create_dir_all(&repo).expect("repo dir");
        fs::create_dir_all(&tools).expect("tools dir");
        Self {
            _dir: dir,
            repo,
            tools,
        }
    }

    pub fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.repo.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("parent dir");
        fs::write(&path, content).expect("write fixture");
        path
    }

    /// A shell script run as `sh <script> <file>`
    pub fn tool(&self, name: &str, body: &str) -> CommandSpec {
        let script = self.tools.join(name);
        fs::write(&script, format!("{body}\n")).expect("write tool script");
        CommandSpec::new("sh", [script.to_string_lossy().into_owned()])
    }

    /// Number of lines a counting tool has appended to its log
    pub fn invocations(&self, log: &str) -> usize {
        fs::read_to_string(self.tools.join(log))
            .map(|content| content.lines().count())
            .unwrap_or(0)
    }

    pub fn log_path(&self, log: &str) -> PathBuf {
        self.tools.join(log)
    }
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read file")
}

/// Move a file's modification time without touching its content
pub fn touch(path: &Path, offset: Duration) {
    File::options()
        .write(true)
        .open(path)
        .expect("open for touch")
        .set_modified(SystemTime::now() + offset)
        .expect("set mtime");
}

pub fn registry(language: Language, chain: LanguageChain) -> ToolRegistry {
    let mut registry = ToolRegistry::empty();
    registry.insert(language, chain);
    registry
}

pub fn python_patterns() -> Vec<String> {
    ToolRegistry::default()
        .get(Language::Python)
        .expect("python chain")
        .patterns
        .clone()
}

pub fn config(tools: ToolRegistry) -> EngineConfig {
    EngineConfig::builder()
        .tools(tools)
        .workers(4)
        .tool_timeout(Duration::from_secs(10))
        .in_memory_store()
        .build()
        .expect("valid config")
}

/// Engine with real adapters, an in-memory store and a manual clock
pub fn engine(config: EngineConfig) -> SyntaxFixEngine {
    let runner = ToolRunner::new(config.tool_timeout).expect("tool runner");
    SyntaxFixEngine::with_parts(
        config,
        Arc::new(runner),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::default()),
    )
}
