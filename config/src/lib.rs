//! Configuration loading for the Switchboard admin console.
//!
//! Settings come from `~/.switchboard/config.toml` with per-setting
//! environment overrides (`SWITCHBOARD_ENDPOINT`, `SWITCHBOARD_TOKEN`,
//! `SWITCHBOARD_STATE_DIR`). Values may reference environment variables with
//! `${VAR}` syntax, so tokens can stay out of the file:
//!
//! ```toml
//! [admin]
//! endpoint = "https://example.com/wp-admin/admin-ajax.php"
//! token = "${SWITCHBOARD_TOKEN}"
//! settings_url = "https://example.com/wp-admin/admin.php?page=notifier-settings"
//!
//! [behavior]
//! request_timeout_seconds = 30
//! ```

use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

const ENDPOINT_ENV: &str = "SWITCHBOARD_ENDPOINT";
const TOKEN_ENV: &str = "SWITCHBOARD_TOKEN";
const STATE_DIR_ENV: &str = "SWITCHBOARD_STATE_DIR";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Raw console configuration as parsed from TOML.
///
/// Accessors resolve the effective value: environment override first, then
/// the file, with `${VAR}` references expanded.
#[derive(Debug, Default, Deserialize)]
pub struct ConsoleConfig {
    pub admin: Option<AdminConfig>,
    pub behavior: Option<BehaviorConfig>,
}

/// `[admin]` section: where the admin endpoint lives and how to talk to it.
#[derive(Default, Deserialize)]
pub struct AdminConfig {
    /// Admin AJAX endpoint URL.
    pub endpoint: Option<String>,
    /// Request auth token. Supports `${VAR}` references.
    pub token: Option<String>,
    /// Link target for the configuration-incomplete banner.
    pub settings_url: Option<String>,
}

// Manual Debug impl to keep the token out of logs.
impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "token",
                &if self.token.is_some() { "[REDACTED]" } else { "None" },
            )
            .field("settings_url", &self.settings_url)
            .finish()
    }
}

/// `[behavior]` section.
#[derive(Debug, Default, Deserialize)]
pub struct BehaviorConfig {
    /// Directory for the status mailbox and session flags.
    pub state_dir: Option<String>,
    /// Per-request timeout. Default: 30.
    pub request_timeout_seconds: Option<u64>,
}

impl ConsoleConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(path).map(Some)
    }

    /// Load from an explicit path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };
        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse { path, source: err })
            }
        }
    }

    /// Effective admin endpoint URL, if configured anywhere.
    #[must_use]
    pub fn endpoint(&self) -> Option<String> {
        resolve(ENDPOINT_ENV, self.admin.as_ref().and_then(|a| a.endpoint.as_deref()))
    }

    /// Effective auth token, if configured anywhere.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        resolve(TOKEN_ENV, self.admin.as_ref().and_then(|a| a.token.as_deref()))
    }

    /// Link target for the configuration banner.
    #[must_use]
    pub fn settings_url(&self) -> Option<String> {
        self.admin
            .as_ref()
            .and_then(|a| a.settings_url.as_deref())
            .map(expand_env_vars)
    }

    /// Directory for durable console state.
    ///
    /// Falls back to `~/.switchboard/state`, then to `./.switchboard/state`
    /// when no home directory can be determined.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        if let Ok(dir) = env::var(STATE_DIR_ENV) {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }
        if let Some(dir) = self.behavior.as_ref().and_then(|b| b.state_dir.as_deref()) {
            return PathBuf::from(expand_env_vars(dir));
        }
        dirs::home_dir()
            .map(|home| home.join(".switchboard").join("state"))
            .unwrap_or_else(|| PathBuf::from(".switchboard/state"))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        let seconds = self
            .behavior
            .as_ref()
            .and_then(|b| b.request_timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        Duration::from_secs(seconds)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

fn resolve(env_name: &str, file_value: Option<&str>) -> Option<String> {
    if let Ok(value) = env::var(env_name) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    file_value.map(expand_env_vars)
}

/// Expand `${VAR}` references. Missing variables expand to the empty string;
/// an unclosed `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.is_empty() {
                    out.push_str(&env::var(name).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".switchboard").join("config.toml"))
}
