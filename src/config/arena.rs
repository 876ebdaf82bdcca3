// src/config/arena.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "MOLTARENA_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/moltarena.toml";

pub const DEFAULT_API_URL: &str = "https://moltarena.crosstoken.io/api";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cache_ttl_secs() -> u64 {
    60
}
fn default_leaderboard_ttl_secs() -> u64 {
    120
}
fn default_interval_secs() -> u64 {
    300
}
fn default_max_notifications() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer key. Usually left out of the file and supplied via MOLTARENA_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Upper bound for a single API round trip.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_leaderboard_ttl_secs")]
    pub leaderboard_ttl_secs: u64,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_notifications")]
    pub max_notifications: usize,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_notifications: default_max_notifications(),
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            leaderboard_ttl_secs: default_leaderboard_ttl_secs(),
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

impl ArenaConfig {
    /// Parse a TOML file. Missing keys take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: ArenaConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg)
    }

    /// Defaults, then the config file, then environment overrides:
    /// 1) $MOLTARENA_CONFIG (must exist if set)
    /// 2) config/moltarena.toml (optional)
    /// 3) MOLTARENA_API_URL / MOLTARENA_API_KEY / MOLTARENA_TIMEOUT_SECS /
    ///    HEARTBEAT_INTERVAL_SECS / HEARTBEAT_MAX_NOTIFICATIONS
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
                if pb.exists() {
                    Self::load_from_file(&pb)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env()?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("MOLTARENA_API_URL") {
            self.api_url = url;
        }
        if let Ok(key) = env::var("MOLTARENA_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(v) = parse_env("MOLTARENA_TIMEOUT_SECS")? {
            self.timeout_secs = v;
        }
        if let Some(v) = parse_env("HEARTBEAT_INTERVAL_SECS")? {
            self.heartbeat.interval_secs = v;
        }
        if let Some(v) = parse_env("HEARTBEAT_MAX_NOTIFICATIONS")? {
            self.heartbeat.max_notifications = v;
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        while self.api_url.ends_with('/') {
            self.api_url.pop();
        }
        if self
            .api_key
            .as_deref()
            .is_some_and(|k| k.trim().is_empty())
        {
            self.api_key = None;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        if self.heartbeat.interval_secs == 0 {
            self.heartbeat.interval_secs = default_interval_secs();
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{key} must be a number, got '{v}'")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: ArenaConfig = toml::from_str(
            r#"
            api_url = "http://localhost:3000/api"
            [heartbeat]
            max_notifications = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.api_url, "http://localhost:3000/api");
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.heartbeat.max_notifications, 3);
        assert_eq!(cfg.heartbeat.interval_secs, 300);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn sanitize_trims_slash_and_blank_key() {
        let mut cfg = ArenaConfig {
            api_url: "http://x/api//".into(),
            api_key: Some("  ".into()),
            timeout_secs: 0,
            ..ArenaConfig::default()
        };
        cfg.sanitize();
        assert_eq!(cfg.api_url, "http://x/api");
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }
}
