//! # Notification Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     RENTIX_NOTIFY_ENABLED=false                                         │
//! │     RENTIX_WA_API_URL=https://gateway.example/send                      │
//! │     RENTIX_WA_TOKEN=...                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/rentix/notify.toml (Linux)                                │
//! │     ~/Library/Application Support/com.rentix.rentix/notify.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     disabled, batch of 50, 5 attempts                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [whatsapp]
//! enabled = true
//! api_url = "https://gateway.example/send"
//! api_token = "secret"
//! timeout_secs = 10
//!
//! [dispatch]
//! batch_size = 50
//! max_attempts = 5
//! poll_interval_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{NotifyError, NotifyResult};

// =============================================================================
// Gateway Settings
// =============================================================================

/// WhatsApp gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppSettings {
    /// When false, events stay in the outbox untouched.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub api_url: String,

    /// Sent as a bearer token.
    #[serde(default)]
    pub api_token: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        WhatsAppSettings {
            enabled: false,
            api_url: String::new(),
            api_token: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Dispatch Settings
// =============================================================================

/// Outbox draining behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Outbox rows fetched per pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Rows that failed this many times are no longer picked up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_batch_size() -> u32 {
    50
}
fn default_max_attempts() -> u32 {
    5
}
fn default_poll_interval() -> u64 {
    10
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

// =============================================================================
// Main Notification Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub whatsapp: WhatsAppSettings,

    #[serde(default)]
    pub dispatch: DispatchSettings,
}

impl NotifyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (notify.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> NotifyResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading notification config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or falls back to defaults (notifications disabled).
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load notification config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> NotifyResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| NotifyError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Notification config saved");
        Ok(())
    }

    pub fn validate(&self) -> NotifyResult<()> {
        let wa = &self.whatsapp;
        if wa.enabled {
            if !wa.api_url.starts_with("http://") && !wa.api_url.starts_with("https://") {
                return Err(NotifyError::InvalidConfig(format!(
                    "api_url must start with http:// or https://, got: '{}'",
                    wa.api_url
                )));
            }
            if wa.api_token.trim().is_empty() {
                return Err(NotifyError::InvalidConfig(
                    "api_token is required when notifications are enabled".into(),
                ));
            }
        }
        if wa.timeout_secs == 0 {
            return Err(NotifyError::InvalidConfig("timeout_secs must be greater than 0".into()));
        }
        if self.dispatch.batch_size == 0 {
            return Err(NotifyError::InvalidConfig("batch_size must be greater than 0".into()));
        }
        if self.dispatch.max_attempts == 0 {
            return Err(NotifyError::InvalidConfig("max_attempts must be greater than 0".into()));
        }
        Ok(())
    }

    /// Applies `RENTIX_*` overrides read through `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(enabled) = lookup("RENTIX_NOTIFY_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.whatsapp.enabled = true,
                "0" | "false" | "no" | "off" => self.whatsapp.enabled = false,
                _ => warn!(value = %enabled, "Unknown RENTIX_NOTIFY_ENABLED value"),
            }
        }

        if let Some(url) = lookup("RENTIX_WA_API_URL") {
            debug!(url = %url, "Overriding gateway URL from environment");
            self.whatsapp.api_url = url;
        }

        if let Some(token) = lookup("RENTIX_WA_TOKEN") {
            self.whatsapp.api_token = token;
        }

        if let Some(timeout) = lookup("RENTIX_WA_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse::<u64>() {
                self.whatsapp.timeout_secs = t;
            }
        }

        if let Some(size) = lookup("RENTIX_NOTIFY_BATCH_SIZE") {
            if let Ok(s) = size.parse::<u32>() {
                self.dispatch.batch_size = s;
            }
        }

        if let Some(attempts) = lookup("RENTIX_NOTIFY_MAX_ATTEMPTS") {
            if let Ok(a) = attempts.parse::<u32>() {
                self.dispatch.max_attempts = a;
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "rentix", "rentix").map(|dirs| dirs.config_dir().join("notify.toml"))
    }

    pub fn is_enabled(&self) -> bool {
        self.whatsapp.enabled
    }
}
