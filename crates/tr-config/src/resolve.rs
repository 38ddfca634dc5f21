//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variables → XDG paths →
//! system path → built-in defaults.

use std::path::{Path, PathBuf};

use crate::repair::RepairConfig;
use crate::validate::{validate_repair_config, ValidationError, ValidationResult};

/// Where the configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided by the caller.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/trace-repair/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "TRACE_REPAIR_CONFIG";
pub const ENV_CONFIG_DIR: &str = "TRACE_REPAIR_CONFIG_DIR";

/// Standard config file name.
const CONFIG_FILENAME: &str = "repair.json";

/// Application name for XDG directories.
const APP_NAME: &str = "trace-repair";

/// A loaded, validated configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: RepairConfig,
    /// File the configuration came from (None for defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Resolve the configuration file path using the standard resolution order.
///
/// 1. Explicit path (if it exists)
/// 2. `TRACE_REPAIR_CONFIG` (direct path)
/// 3. `TRACE_REPAIR_CONFIG_DIR` + `repair.json`
/// 4. XDG config directory (~/.config/trace-repair/)
/// 5. System config (/etc/trace-repair/)
/// 6. Built-in defaults (None)
pub fn resolve_config(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli_path {
        if path.exists() {
            return (Some(path.to_path_buf()), ConfigSource::CliArgument);
        }
    }

    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    let system_path = system_config_dir().join(CONFIG_FILENAME);
    if system_path.exists() {
        return (Some(system_path), ConfigSource::SystemConfig);
    }

    (None, ConfigSource::BuiltinDefault)
}

/// Resolve, load and validate the repair configuration.
///
/// An explicit path that does not exist is an error rather than a fall-through.
pub fn load_config(cli_path: Option<&Path>) -> ValidationResult<ResolvedConfig> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ValidationError::IoError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    }

    let (path, source) = resolve_config(cli_path);
    let config = match &path {
        Some(p) => RepairConfig::from_file(p)?,
        None => RepairConfig::default(),
    };
    validate_repair_config(&config)?;

    Ok(ResolvedConfig {
        config,
        path,
        source,
    })
}

/// Get the XDG config directory for trace-repair.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}
