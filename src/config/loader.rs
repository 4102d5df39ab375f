//! Configuration loading and environment variable interpolation

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "admin-session.toml";

/// Load configuration from admin-session.toml
pub fn load_config() -> Result<Config> {
    let config_path = find_config_file()?;
    load_config_from_path(&config_path)
}

/// Load configuration, falling back to defaults when no file exists
pub fn load_config_or_default() -> Result<Config> {
    match load_config() {
        Ok(config) => Ok(config),
        Err(Error::ConfigNotFound) => {
            tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|_| Error::ConfigNotFound)?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Reject values that parse but cannot be used
fn validate(config: &Config) -> Result<()> {
    if config.session.token_ttl().is_none() {
        return Err(Error::Config(format!(
            "session.token_ttl_minutes must be a positive number of minutes, got {}",
            config.session.token_ttl_minutes
        )));
    }
    Ok(())
}

/// Write configuration to a specific path
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Result<PathBuf> {
    let current = env::current_dir().map_err(|e| Error::Config(e.to_string()))?;
    find_config_file_from(current)
}

fn find_config_file_from(mut current: PathBuf) -> Result<PathBuf> {
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        if !current.pop() {
            return Err(Error::ConfigNotFound);
        }
    }
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# admin-session configuration

[api]
base_url = "${ADMIN_API_URL:-http://localhost:8080/api/v1}"
timeout_secs = 30

[storage]
# Short-lived store; keep it private and somewhere cleared on reboot.
# Defaults to $XDG_RUNTIME_DIR/admin-session/session.json
# session_path = "/run/user/1000/admin-session/session.json"
# Durable store, only read once to migrate old logins
durable_path = ".admin-session/durable.json"

[session]
# Used when the API does not return an expiry
token_ttl_minutes = 1440

[guard]
min_token_length = 10
login_path = "/login"
poll_interval_ms = 1000
"#
}
