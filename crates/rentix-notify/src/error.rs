//! # Notification Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Notification Error Categories                        │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Gateway      │  │     Outbox              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Http           │  │  Database               │ │
//! │  │  ConfigLoad..   │  │  Rejected       │  │  InvalidPayload         │ │
//! │  │  ConfigSave..   │  │                 │  │  RecipientNotFound      │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use rentix_db::DbError;

/// Result type alias for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid notification configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    /// Transport-level failure (DNS, connect, timeout, TLS).
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("Gateway rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    // =========================================================================
    // Outbox Errors
    // =========================================================================
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Outbox payload did not decode into a booking event.
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),

    #[error("No recipient for customer {0}")]
    RecipientNotFound(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for NotifyError {
    fn from(err: std::io::Error) -> Self {
        NotifyError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for NotifyError {
    fn from(err: toml::de::Error) -> Self {
        NotifyError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for NotifyError {
    fn from(err: toml::ser::Error) -> Self {
        NotifyError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl NotifyError {
    /// Returns true if sending the same message again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Http(_) => true,
            NotifyError::Rejected { status, .. } => *status == 429 || *status >= 500,
            NotifyError::Database(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            NotifyError::InvalidConfig(_) | NotifyError::ConfigLoadFailed(_) | NotifyError::ConfigSaveFailed(_)
        )
    }
}
