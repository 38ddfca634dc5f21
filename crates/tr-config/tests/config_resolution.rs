//! Configuration loading and resolution tests.
//!
//! Covers:
//! - Resolution order (explicit path > env path > env dir)
//! - Missing explicit paths are rejected by `load_config`
//! - Validation applied to loaded files
//! - Defaults when nothing is found

use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;
use tr_config::resolve::{ENV_CONFIG_DIR, ENV_CONFIG_PATH};
use tr_config::{load_config, resolve_config, ConfigSource, ValidationError};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let saved = keys.iter().map(|key| env::var(key).ok()).collect();
        for key in keys {
            env::remove_var(key);
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_config(path: &Path, json: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create config parent");
    }
    fs::write(path, json).expect("write config");
}

#[test]
fn test_explicit_path_wins_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let cli = temp.path().join("cli").join("repair.json");
        let from_env = temp.path().join("env").join("repair.json");
        write_config(&cli, r#"{"detection": {"alpha": 0.25}}"#);
        write_config(&from_env, r#"{"detection": {"alpha": 0.5}}"#);
        env::set_var(ENV_CONFIG_PATH, from_env.display().to_string());

        let resolved = load_config(Some(&cli)).expect("load config");
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path.as_deref(), Some(cli.as_path()));
        assert_eq!(resolved.config.detection.alpha, 0.25);
    });
}

#[test]
fn test_env_path_wins_over_env_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let direct = temp.path().join("direct.json");
        let dir = temp.path().join("dir");
        write_config(&direct, r#"{"episodes": {"episodes": 12}}"#);
        write_config(&dir.join("repair.json"), r#"{"episodes": {"episodes": 99}}"#);
        env::set_var(ENV_CONFIG_PATH, direct.display().to_string());
        env::set_var(ENV_CONFIG_DIR, dir.display().to_string());

        let resolved = load_config(None).expect("load config");
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.config.episodes.episodes, 12);
    });
}

#[test]
fn test_env_dir_is_used() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        write_config(
            &temp.path().join("repair.json"),
            r#"{"runtime": {"seed": 42, "workers": 3}}"#,
        );
        env::set_var(ENV_CONFIG_DIR, temp.path().display().to_string());

        let (path, source) = resolve_config(None);
        assert_eq!(source, ConfigSource::Environment);
        assert_eq!(path, Some(temp.path().join("repair.json")));

        let resolved = load_config(None).expect("load config");
        assert_eq!(resolved.config.runtime.seed, Some(42));
        assert_eq!(resolved.config.runtime.workers, Some(3));
    });
}

#[test]
fn test_missing_explicit_path_falls_through() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let env_file = temp.path().join("env.json");
        write_config(&env_file, "{}");
        env::set_var(ENV_CONFIG_PATH, env_file.display().to_string());

        let missing = temp.path().join("does-not-exist.json");
        let (path, source) = resolve_config(Some(&missing));
        assert_eq!(source, ConfigSource::Environment);
        assert_eq!(path, Some(env_file));
    });
}

#[test]
fn test_missing_explicit_path_is_an_error() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let env_file = temp.path().join("env.json");
        write_config(&env_file, r#"{"episodes": {"episodes": 7}}"#);
        env::set_var(ENV_CONFIG_PATH, env_file.display().to_string());

        let missing = temp.path().join("does-not-exist.json");
        let err = load_config(Some(&missing)).expect_err("missing explicit config");
        assert!(matches!(err, ValidationError::IoError(ref msg) if msg.contains("does-not-exist.json")));
        assert_eq!(err.code(), 60);
    });
}

#[test]
fn test_invalid_file_is_rejected() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let bad = temp.path().join("repair.json");
        write_config(&bad, r#"{"agent": {"discount_factor": 1.5}}"#);

        let err = load_config(Some(&bad)).expect_err("out-of-range discount");
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "agent.discount_factor"));
    });
}

#[test]
fn test_malformed_file_is_parse_error() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&[ENV_CONFIG_PATH, ENV_CONFIG_DIR]);
        let temp = TempDir::new().expect("temp dir");
        let bad = temp.path().join("repair.json");
        write_config(&bad, "alpha = 0.3");

        let err = load_config(Some(&bad)).expect_err("not json");
        assert!(matches!(err, ValidationError::ParseError(_)));
    });
}
