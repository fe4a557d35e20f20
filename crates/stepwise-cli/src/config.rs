//! Configuration – reads/writes `~/.stepwise/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use stepwise_perception::DedupPolicy;
use stepwise_runtime::{ContentTable, LogFormat};
use stepwise_types::GuideError;

/// Persisted user configuration stored in `~/.stepwise/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// How several boxes of one class in a frame are reduced to one.
    #[serde(default)]
    pub dedup_policy: DedupPolicy,

    /// Optional TOML file overriding instruction texts and images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<PathBuf>,

    /// Console log format; `STEPWISE_LOG_FORMAT` takes precedence.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Config {
    /// The content table named by `content_path`, or the built-in defaults.
    pub fn content_table(&self) -> Result<ContentTable, GuideError> {
        match &self.content_path {
            Some(path) => ContentTable::load(path),
            None => Ok(ContentTable::default()),
        }
    }
}

/// Return the path to `~/.stepwise/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".stepwise").join("config.toml")
}

/// The effective configuration: the file at [`config_path`] (defaults when
/// it is absent or unreadable) with `STEPWISE_*` overrides applied on top.
///
/// A file that exists but cannot be loaded is reported alongside the
/// fallback so the caller can log it.
pub fn resolve() -> (Config, Option<GuideError>) {
    resolve_from(&config_path())
}

pub(crate) fn resolve_from(path: &Path) -> (Config, Option<GuideError>) {
    let (mut cfg, error) = match load_from(path) {
        Ok(cfg) => (cfg.unwrap_or_default(), None),
        Err(e) => (Config::default(), Some(e)),
    };
    apply_env_overrides(&mut cfg);
    (cfg, error)
}

/// Load the config file as written, without environment overrides.
/// Returns `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, GuideError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        GuideError::Config(format!("Failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| GuideError::Config(format!("Failed to parse config: {e}")))?;
    Ok(Some(cfg))
}

/// Apply `STEPWISE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `STEPWISE_DEDUP_POLICY` | `dedup_policy` |
/// | `STEPWISE_CONTENT_PATH` | `content_path` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("STEPWISE_DEDUP_POLICY")
        && let Ok(policy) = v.parse::<DedupPolicy>()
    {
        cfg.dedup_policy = policy;
    }
    if let Ok(v) = std::env::var("STEPWISE_CONTENT_PATH")
        && !v.trim().is_empty()
    {
        cfg.content_path = Some(PathBuf::from(v));
    }
}

/// Save the config to disk, creating `~/.stepwise/` if necessary.
pub fn save(cfg: &Config) -> Result<(), GuideError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), GuideError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            GuideError::Config(format!("Failed to create config directory: {e}"))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| GuideError::Config(format!("Failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        GuideError::Config(format!("Failed to write config at {}: {e}", path.display()))
    })
}
