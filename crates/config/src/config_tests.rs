//! Tests for layered configuration loading

use crate::{ConfigLoader, ConfigSource};
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use syntaxfix_core::{
    constants::{
        SYNTAXFIX_CACHE_VAR, SYNTAXFIX_CONFIG_VAR, SYNTAXFIX_STORE_VAR,
        SYNTAXFIX_TOOL_TIMEOUT_VAR, SYNTAXFIX_WORKERS_VAR,
    },
    Language,
};
use tempfile::TempDir;

const ALL_VARS: [&str; 5] = [
    SYNTAXFIX_CONFIG_VAR,
    SYNTAXFIX_STORE_VAR,
    SYNTAXFIX_TOOL_TIMEOUT_VAR,
    SYNTAXFIX_WORKERS_VAR,
    SYNTAXFIX_CACHE_VAR,
];

struct EnvGuard;

impl EnvGuard {
    fn clean() -> Self {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }
}

fn write_config(dir: &TempDir, json: &str) -> PathBuf {
    let path = dir.path().join("syntaxfix.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
#[serial]
fn test_load_without_layers_uses_defaults() {
    let _env = EnvGuard::clean();
    let config = ConfigLoader::new().load().unwrap();
    assert_eq!(config.tool_timeout, Duration::from_secs(30));
    assert_eq!(config.sources, vec![ConfigSource::Defaults]);
}

#[test]
#[serial]
fn test_config_file_overrides_defaults() {
    let _env = EnvGuard::clean();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "tool_timeout_secs": 5,
            "batch_size": 4,
            "run_timeout_secs": 120,
            "tools": {
                "python": {
                    "remote": { "endpoint": "https://fix.example.com/python" },
                    "primary": { "program": "ruff", "args": ["format"] },
                    "patterns": ["def\\s+\\w+"]
                }
            },
            "disabled_languages": ["java"]
        }"#,
    );

    let config = ConfigLoader::new().file(&path).load().unwrap();

    assert_eq!(config.tool_timeout, Duration::from_secs(5));
    assert_eq!(config.batch_size, 4);
    assert_eq!(config.run_timeout, Some(Duration::from_secs(120)));
    let python = config.tools.get(Language::Python).unwrap();
    assert!(python.has_remote());
    assert_eq!(python.primary.as_ref().unwrap().program, "ruff");
    assert!(config.tools.get(Language::Java).is_none());
    assert!(config.tools.get(Language::Go).is_some());
    assert_eq!(
        config.sources,
        vec![ConfigSource::Defaults, ConfigSource::File(path)]
    );
}

#[test]
#[serial]
fn test_config_file_from_env_var() {
    let _env = EnvGuard::clean();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "workers": 2 }"#);
    std::env::set_var(SYNTAXFIX_CONFIG_VAR, &path);

    let config = ConfigLoader::new().load().unwrap();
    assert_eq!(config.workers, 2);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let _env = EnvGuard::clean();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{ "workers": 2, "cache_enabled": true }"#);
    std::env::set_var(SYNTAXFIX_WORKERS_VAR, "6");
    std::env::set_var(SYNTAXFIX_CACHE_VAR, "off");
    std::env::set_var(SYNTAXFIX_TOOL_TIMEOUT_VAR, "0.5");
    std::env::set_var(SYNTAXFIX_STORE_VAR, "/tmp/syntaxfix-store.json");

    let config = ConfigLoader::new().file(&path).load().unwrap();

    assert_eq!(config.workers, 6);
    assert!(!config.cache_enabled);
    assert_eq!(config.tool_timeout, Duration::from_millis(500));
    assert_eq!(
        config.store_path,
        Some(PathBuf::from("/tmp/syntaxfix-store.json"))
    );
    assert!(config
        .sources
        .contains(&ConfigSource::Environment(SYNTAXFIX_WORKERS_VAR.into())));
}

#[test]
#[serial]
fn test_without_env_ignores_variables() {
    let _env = EnvGuard::clean();
    std::env::set_var(SYNTAXFIX_WORKERS_VAR, "5");
    let config = ConfigLoader::new().without_env().load().unwrap();
    assert_ne!(
        config.sources.last(),
        Some(&ConfigSource::Environment(SYNTAXFIX_WORKERS_VAR.into()))
    );
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    let _env = EnvGuard::clean();
    std::env::set_var(SYNTAXFIX_WORKERS_VAR, "many");
    assert!(ConfigLoader::new().load().is_err());

    std::env::set_var(SYNTAXFIX_WORKERS_VAR, "0");
    assert!(ConfigLoader::new().load().is_err());
}

#[test]
#[serial]
fn test_bad_config_files_are_rejected() {
    let _env = EnvGuard::clean();
    let dir = TempDir::new().unwrap();

    let unknown = write_config(&dir, r#"{ "colour": "blue" }"#);
    assert!(ConfigLoader::new().file(&unknown).load().is_err());

    let bad_endpoint = write_config(
        &dir,
        r#"{ "tools": { "go": { "remote": { "endpoint": "not a url" } } } }"#,
    );
    assert!(ConfigLoader::new().file(&bad_endpoint).load().is_err());

    assert!(ConfigLoader::new()
        .file(dir.path().join("missing.json"))
        .load()
        .is_err());
}
