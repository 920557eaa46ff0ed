//! Error types for the Shopdesk responder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Shopdesk workspace.
///
/// The variants follow the failure taxonomy of the responder: some are
/// recovered locally (`SessionDead`), some abandon a single conversation
/// (`ElementTimeout`), and `GlobalTimeout` ends the current login run.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ShopdeskError {
    /// The automation handle is invalid or the browser process crashed.
    #[error("Browser session is dead: {0}")]
    SessionDead(String),

    /// An expected UI fragment did not appear within its budget.
    #[error("Timed out after {waited_ms}ms waiting for {locator}")]
    ElementTimeout { locator: String, waited_ms: u64 },

    /// Login or verification exceeded its overall budget.
    #[error("{phase} timeout after {budget_secs}s")]
    GlobalTimeout { phase: String, budget_secs: u64 },

    /// A ledger row whose timestamp cannot be parsed.
    #[error("Malformed ledger entry for '{customer}': {value}")]
    MalformedLedgerEntry { customer: String, value: String },

    /// The reply generator failed.
    #[error("Reply generator error: {0}")]
    Generator(String),

    /// Automation-layer fault that does not invalidate the session.
    #[error("Browser error: {0}")]
    Browser(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", "CSV"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopdeskError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a SessionDead error
    pub fn session_dead(message: impl Into<String>) -> Self {
        Self::SessionDead(message.into())
    }

    /// Creates an ElementTimeout error
    pub fn element_timeout(locator: impl Into<String>, waited: std::time::Duration) -> Self {
        Self::ElementTimeout {
            locator: locator.into(),
            waited_ms: waited.as_millis() as u64,
        }
    }

    /// Creates a GlobalTimeout error
    pub fn global_timeout(phase: impl Into<String>, budget: std::time::Duration) -> Self {
        Self::GlobalTimeout {
            phase: phase.into(),
            budget_secs: budget.as_secs(),
        }
    }

    /// Creates a Browser error
    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser(message.into())
    }

    /// Creates a Generator error
    pub fn generator(message: impl Into<String>) -> Self {
        Self::Generator(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Serialization error
    pub fn serialization(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if the automation session must be recreated.
    pub fn is_session_dead(&self) -> bool {
        matches!(self, Self::SessionDead(_))
    }

    /// Check if this is an element wait timeout.
    pub fn is_element_timeout(&self) -> bool {
        matches!(self, Self::ElementTimeout { .. })
    }

    /// Check if this error ends the current login run.
    pub fn is_global_timeout(&self) -> bool {
        matches!(self, Self::GlobalTimeout { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ShopdeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ShopdeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("JSON", err.to_string())
    }
}

impl From<toml::de::Error> for ShopdeskError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization("TOML", err.to_string())
    }
}

impl From<toml::ser::Error> for ShopdeskError {
    fn from(err: toml::ser::Error) -> Self {
        Self::serialization("TOML", err.to_string())
    }
}

impl From<anyhow::Error> for ShopdeskError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ShopdeskError>`.
pub type Result<T> = std::result::Result<T, ShopdeskError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_element_timeout_message() {
        let err = ShopdeskError::element_timeout("filter-all", Duration::from_millis(3000));
        assert!(err.is_element_timeout());
        assert_eq!(
            err.to_string(),
            "Timed out after 3000ms waiting for filter-all"
        );
    }

    #[test]
    fn test_global_timeout_message() {
        let err = ShopdeskError::global_timeout("verification", Duration::from_secs(900));
        assert!(err.is_global_timeout());
        assert!(!err.is_session_dead());
        assert_eq!(err.to_string(), "verification timeout after 900s");
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ShopdeskError = io.into();
        assert!(err.to_string().contains("NotFound"));
    }
}
