//! Configuration loading for safewrite.
//!
//! Configuration lives in `~/.safewrite/config.toml`. Every section and every
//! field is optional; a missing file means defaults throughout.
//!
//! ```toml
//! [remote]
//! base_url = "https://example.zendesk.com"
//! email = "agent@example.com"
//! api_token = "${SAFEWRITE_API_TOKEN}"
//!
//! [write]
//! debounce_ms = 800
//! conflict_patterns = ["not saved", "a change was made"]
//!
//! [scoring]
//! priority_points_urgent = 12
//! ```
//!
//! String values under `[remote]` support `${VAR}` environment expansion.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use safewrite_types::{PriorityPoints, RetryConfig, RetryConfigError, WriteOptions};
use serde::Deserialize;
use thiserror::Error;

/// Default prefix for per-ticket coordinator keys.
pub const DEFAULT_KEY_PREFIX: &str = "ticket";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SafewriteConfig {
    pub remote: Option<RemoteConfig>,
    pub write: Option<WriteConfig>,
    pub scoring: Option<ScoringConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid [{section}] config: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } => None,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Base URL of the ticket API, e.g. `https://example.zendesk.com`.
    pub base_url: Option<String>,
    /// Agent email used for token authentication.
    pub email: Option<String>,
    pub api_token: Option<String>,
}

// Manual Debug impl to prevent leaking API tokens in logs.
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.api_token.is_some() {
            "[REDACTED]"
        } else {
            "None"
        };
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &token)
            .finish()
    }
}

impl RemoteConfig {
    /// Base URL with `${VAR}` references expanded.
    #[must_use]
    pub fn resolved_base_url(&self) -> Option<String> {
        resolve(self.base_url.as_deref())
    }

    #[must_use]
    pub fn resolved_email(&self) -> Option<String> {
        resolve(self.email.as_deref())
    }

    #[must_use]
    pub fn resolved_api_token(&self) -> Option<String> {
        resolve(self.api_token.as_deref())
    }
}

fn resolve(raw: Option<&str>) -> Option<String> {
    raw.map(expand_env_vars)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Write coordination tuning. Unset fields take the coordinator defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteConfig {
    /// Coordinator keys are `{key_prefix}-{ticket_id}`.
    pub key_prefix: Option<String>,
    pub pre_wait_ms: Option<u64>,
    pub debounce_ms: Option<u64>,
    pub retries: Option<u32>,
    pub base_ms: Option<u64>,
    pub factor: Option<f64>,
    pub jitter: Option<bool>,
    /// Case-insensitive phrases that mark a failure as a write conflict.
    pub conflict_patterns: Option<Vec<String>>,
}

impl WriteConfig {
    pub fn retry_config(&self) -> Result<RetryConfig, ConfigError> {
        let defaults = RetryConfig::default();
        let config = RetryConfig {
            retries: self.retries.unwrap_or(defaults.retries),
            base: self.base_ms.map_or(defaults.base, Duration::from_millis),
            factor: self.factor.unwrap_or(defaults.factor),
            jitter: self.jitter.unwrap_or(defaults.jitter),
        };
        config
            .validate()
            .map_err(|e: RetryConfigError| ConfigError::Invalid {
                section: "write",
                reason: e.to_string(),
            })?;
        Ok(config)
    }

    /// Options for a write to `ticket_id`.
    #[must_use]
    pub fn write_options(&self, ticket_id: u64) -> WriteOptions {
        let defaults = WriteOptions::default();
        WriteOptions {
            key: format!("{}-{ticket_id}", self.key_prefix()),
            pre_wait: self
                .pre_wait_ms
                .map_or(defaults.pre_wait, Duration::from_millis),
            debounce: self
                .debounce_ms
                .map_or(defaults.debounce, Duration::from_millis),
            retries: self.retries.unwrap_or(defaults.retries),
        }
    }

    #[must_use]
    pub fn key_prefix(&self) -> &str {
        self.key_prefix
            .as_deref()
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(DEFAULT_KEY_PREFIX)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    pub priority_points_urgent: Option<u32>,
    pub priority_points_high: Option<u32>,
    pub priority_points_normal: Option<u32>,
    pub priority_points_low: Option<u32>,
}

impl ScoringConfig {
    #[must_use]
    pub fn priority_points(&self) -> PriorityPoints {
        let defaults = PriorityPoints::default();
        PriorityPoints {
            urgent: self.priority_points_urgent.unwrap_or(defaults.urgent),
            high: self.priority_points_high.unwrap_or(defaults.high),
            normal: self.priority_points_normal.unwrap_or(defaults.normal),
            low: self.priority_points_low.unwrap_or(defaults.low),
        }
    }
}

/// Replace `${VAR}` with the value of `VAR`, or nothing when it is unset.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl SafewriteConfig {
    /// Load from the default location. `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let config: Self = match toml::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                return Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(write) = &self.write {
            write.retry_config()?;
        }
        if let Some(base_url) = self.remote.as_ref().and_then(RemoteConfig::resolved_base_url)
            && !(base_url.starts_with("https://") || base_url.starts_with("http://"))
        {
            return Err(ConfigError::Invalid {
                section: "remote",
                reason: format!("base_url must be an http(s) URL (got {base_url})"),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn write_section(&self) -> WriteConfig {
        self.write.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn priority_points(&self) -> PriorityPoints {
        self.scoring
            .as_ref()
            .map(ScoringConfig::priority_points)
            .unwrap_or_default()
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".safewrite").join("config.toml"))
}
