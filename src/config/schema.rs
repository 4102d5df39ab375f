//! Configuration schema definitions

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub guard: GuardConfig,
}

/// REST API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where the two key-value stores live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Short-lived store. Defaults to a per-user runtime or temp directory so
    /// it does not outlive a reboot.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,

    /// Durable store, only read as a migration source
    #[serde(default = "default_durable_path")]
    pub durable_path: PathBuf,
}

/// `$XDG_RUNTIME_DIR/admin-session/session.json` when a runtime dir is set,
/// otherwise a per-user directory under the system temp dir.
fn default_session_path() -> PathBuf {
    let dir = match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(runtime) if !runtime.is_empty() => PathBuf::from(runtime).join("admin-session"),
        _ => {
            let user = std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "default".to_string());
            std::env::temp_dir().join(format!("admin-session-{}", user))
        }
    };
    dir.join("session.json")
}

fn default_durable_path() -> PathBuf {
    PathBuf::from(".admin-session/durable.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_path: default_session_path(),
            durable_path: default_durable_path(),
        }
    }
}

/// Session lifetime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token lifetime used when the API does not report one
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 24 * 60;

fn default_token_ttl_minutes() -> i64 {
    DEFAULT_TOKEN_TTL_MINUTES
}

impl SessionConfig {
    /// The configured lifetime, `None` unless it is positive and representable
    pub fn token_ttl(&self) -> Option<TimeDelta> {
        if self.token_ttl_minutes <= 0 {
            return None;
        }
        TimeDelta::try_minutes(self.token_ttl_minutes)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

/// Session guard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Tokens shorter than this are treated as malformed
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// How often file-backed stores are re-read while watching
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_min_token_length() -> usize {
    10
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            min_token_length: default_min_token_length(),
            login_path: default_login_path(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.guard.min_token_length, 10);
        assert_eq!(config.guard.login_path, "/login");
        assert_eq!(config.session.token_ttl_minutes, 1440);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let toml_str = r#"
[api]
base_url = "https://admin.example.com/api"

[guard]
min_token_length = 32
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://admin.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.guard.min_token_length, 32);
        assert_eq!(config.guard.login_path, "/login");
    }
}
