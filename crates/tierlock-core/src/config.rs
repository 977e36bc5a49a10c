//! Configuration resolution for Tierlock.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/tierlock/settings.json)
//! 3. Project config (.tierlock/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Complete Tierlock configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_path: Option<PathBuf>,
    /// Deadline applied to every ledger and intake write.
    pub storage_timeout_ms: u64,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            database_path: None,
            storage_timeout_ms: 5_000,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub const fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }
}

/// View counting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub anonymous_views: AnonymousViewPolicy,
}

/// How views from callers without an account are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnonymousViewPolicy {
    /// Anonymous callers cannot record views.
    #[default]
    Reject,
    /// Anonymous callers are counted under their session id. Dedup is then
    /// per session, not per account.
    PerSession,
}

impl FromStr for AnonymousViewPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reject" => Ok(Self::Reject),
            "per_session" | "per-session" => Ok(Self::PerSession),
            other => Err(Error::Config(format!(
                "Unknown anonymous view policy: {other} (expected reject or per_session)"
            ))),
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".tierlock").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tierlock").join("settings.json"))
}

/// Default database location when none is configured.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tierlock").join("tierlock.db"))
}

/// Settings as written in one config file. Absent keys leave the lower
/// layer untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigOverlay {
    pub server: ServerOverlay,
    pub engagement: EngagementOverlay,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerOverlay {
    pub listen_addr: Option<String>,
    pub database_path: Option<PathBuf>,
    pub storage_timeout_ms: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngagementOverlay {
    pub anonymous_views: Option<AnonymousViewPolicy>,
}

pub fn load_config_file(path: &Path) -> Result<ConfigOverlay> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigOverlay) {
    let ConfigOverlay { server, engagement } = overlay;
    if let Some(addr) = server.listen_addr {
        base.server.listen_addr = addr;
    }
    if let Some(path) = server.database_path {
        base.server.database_path = Some(path);
    }
    if let Some(ms) = server.storage_timeout_ms {
        base.server.storage_timeout_ms = ms;
    }
    if let Some(level) = server.log_level {
        base.server.log_level = level;
    }
    if let Some(policy) = engagement.anonymous_views {
        base.engagement.anonymous_views = policy;
    }
}

/// Apply `TIERLOCK_*` overrides read through `lookup`.
///
/// A malformed anonymous view policy is an error rather than a silent
/// fallback to the default.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("TIERLOCK_LISTEN_ADDR") {
        config.server.listen_addr = val;
    }
    if let Some(val) = lookup("TIERLOCK_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("TIERLOCK_STORAGE_TIMEOUT_MS") {
        if let Ok(n) = val.parse() {
            config.server.storage_timeout_ms = n;
        }
    }
    if let Some(val) = lookup("TIERLOCK_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = lookup("TIERLOCK_ANONYMOUS_VIEWS") {
        config.engagement.anonymous_views = val.parse()?;
    }
    Ok(())
}
