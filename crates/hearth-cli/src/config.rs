//! Configuration vault – reads/writes `~/.hearth/config.toml` and resolves
//! the global configuration directory handed to the memory core.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use hearth_types::{DEFAULT_CONTEXT_WINDOW, DEFAULT_SEARCH_LIMIT};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Persisted user configuration stored in `~/.hearth/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Global configuration directory.  Defaults to `~/.hearth`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_dir: Option<PathBuf>,

    /// Start the heartbeat scheduler with the shell.
    #[serde(default = "default_true")]
    pub heartbeat_enabled: bool,

    #[serde(default = "default_heartbeat_minutes")]
    pub heartbeat_interval_minutes: u64,

    /// Number of recent long-term entries folded into the memory context.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// OTLP/HTTP collector base URL.  Span export is off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_heartbeat_minutes() -> u64 {
    30
}
fn default_context_window() -> usize {
    DEFAULT_CONTEXT_WINDOW
}
fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_dir: None,
            heartbeat_enabled: default_true(),
            heartbeat_interval_minutes: default_heartbeat_minutes(),
            context_window: default_context_window(),
            search_limit: default_search_limit(),
            log_format: LogFormat::default(),
            otlp_endpoint: None,
        }
    }
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}

/// Return the path to `~/.hearth/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    default_dir_for_home(home).join("config.toml")
}

pub(crate) fn default_dir_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".hearth")
}

/// The global configuration directory: `memory_dir` when set (including via
/// `HEARTH_HOME`), otherwise `~/.hearth`.
pub fn memory_dir(cfg: &Config) -> PathBuf {
    memory_dir_for_home(cfg, &home_dir())
}

pub(crate) fn memory_dir_for_home(cfg: &Config, home: &str) -> PathBuf {
    cfg.memory_dir
        .clone()
        .unwrap_or_else(|| default_dir_for_home(home))
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config (or defaults when absent) with env overrides applied.
pub fn load_or_default() -> Result<Config, String> {
    let mut cfg = load()?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    if cfg.heartbeat_interval_minutes == 0 {
        return Err(format!(
            "Invalid config at {}: heartbeat_interval_minutes must be at least 1",
            path.display()
        ));
    }
    Ok(Some(cfg))
}

/// Apply `HEARTH_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `HEARTH_HOME` | `memory_dir` |
/// | `HEARTH_HEARTBEAT_MINUTES` | `heartbeat_interval_minutes` (positive integer) |
/// | `HEARTH_LOG_FORMAT` | `log_format` (`json` / `compact`) |
/// | `OTEL_EXPORTER_OTLP_ENDPOINT` | `otlp_endpoint` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("HEARTH_HOME")
        && !v.trim().is_empty()
    {
        cfg.memory_dir = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("HEARTH_HEARTBEAT_MINUTES")
        && let Ok(minutes) = v.trim().parse::<u64>()
        && minutes > 0
    {
        cfg.heartbeat_interval_minutes = minutes;
    }
    if let Ok(v) = std::env::var("HEARTH_LOG_FORMAT") {
        match v.trim().to_ascii_lowercase().as_str() {
            "json" => cfg.log_format = LogFormat::Json,
            "compact" => cfg.log_format = LogFormat::Compact,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        && !v.trim().is_empty()
    {
        cfg.otlp_endpoint = Some(v);
    }
}

/// Save the config to disk, creating `~/.hearth/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, Config::default());
        assert_eq!(loaded.heartbeat_interval_minutes, 30);
        assert_eq!(loaded.context_window, 5);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "heartbeat_enabled = false\nlog_format = \"json\"\n").unwrap();
        let cfg = load_from(&path).unwrap().unwrap();
        assert!(!cfg.heartbeat_enabled);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.search_limit, 5);
        assert_eq!(cfg.memory_dir, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "context_window = \"many\"").unwrap();
        assert!(load_from(&path).unwrap_err().contains("parse"));
    }

    #[test]
    fn zero_heartbeat_interval_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "heartbeat_interval_minutes = 0\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("heartbeat_interval_minutes"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn config_path_points_to_hearth_dir() {
        let p = config_path_for_home("/home/testuser");
        assert_eq!(p, PathBuf::from("/home/testuser/.hearth/config.toml"));
    }

    #[test]
    fn memory_dir_prefers_configured_directory() {
        let mut cfg = Config::default();
        assert_eq!(
            memory_dir_for_home(&cfg, "/home/u"),
            PathBuf::from("/home/u/.hearth")
        );
        cfg.memory_dir = Some(PathBuf::from("/srv/agent"));
        assert_eq!(memory_dir_for_home(&cfg, "/home/u"), PathBuf::from("/srv/agent"));
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn env_overrides_apply_and_ignore_invalid_values() {
        // SAFETY: the only test touching these variables.
        unsafe {
            std::env::set_var("HEARTH_HOME", "/tmp/hearth-test-home");
            std::env::set_var("HEARTH_HEARTBEAT_MINUTES", "not-a-number");
            std::env::set_var("HEARTH_LOG_FORMAT", "JSON");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.memory_dir, Some(PathBuf::from("/tmp/hearth-test-home")));
        assert_eq!(cfg.heartbeat_interval_minutes, 30);
        assert_eq!(cfg.log_format, LogFormat::Json);

        unsafe { std::env::set_var("HEARTH_HEARTBEAT_MINUTES", "5") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.heartbeat_interval_minutes, 5);

        unsafe { std::env::set_var("HEARTH_HEARTBEAT_MINUTES", "0") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.heartbeat_interval_minutes, 5);

        unsafe {
            std::env::remove_var("HEARTH_HOME");
            std::env::remove_var("HEARTH_HEARTBEAT_MINUTES");
            std::env::remove_var("HEARTH_LOG_FORMAT");
        }
    }
}
