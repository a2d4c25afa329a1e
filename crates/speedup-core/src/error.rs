//! Error types for the speedup system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for speedup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the speedup system
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure talking to a remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed response body, IP string, or expiry timestamp
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider reported a code classified as fatal
    #[error("API error ({code}): {message}")]
    Api {
        /// Provider response code
        code: i64,
        /// Provider message
        message: String,
    },

    /// The line is not eligible for acceleration (terminal, never retried)
    #[error("Not eligible for acceleration: {0}")]
    NotEligible(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Current egress IP does not match the configured bind IP
    #[error("IP binding mismatch: {0}")]
    Binding(String),

    /// Auto-recovery gave up after exhausting its retries
    #[error("Auto-recovery exhausted after {attempts} attempts: {source}")]
    RecoveryExhausted {
        /// Total number of attempts made (initial run included)
        attempts: u32,
        /// The error returned by the last attempt
        #[source]
        source: Box<Error>,
    },

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an API error for a provider response code
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Create a "not eligible" error
    pub fn not_eligible(msg: impl Into<String>) -> Self {
        Self::NotEligible(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an IP binding error
    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    /// Wrap the last error of an exhausted retry loop
    pub fn recovery_exhausted(attempts: u32, last: Error) -> Self {
        Self::RecoveryExhausted {
            attempts,
            source: Box::new(last),
        }
    }

    /// Whether retrying cannot change the outcome
    ///
    /// Only business-logic outcomes are terminal; transport, parse and
    /// provider failures may clear up on a later attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotEligible(_))
    }

    /// Short machine-friendly name of the error kind, used in logs and events
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Parse(_) | Self::Json(_) => "parse_error",
            Self::Api { .. } => "api_error",
            Self::NotEligible(_) => "not_eligible",
            Self::Config(_) => "config_error",
            Self::Binding(_) => "binding_error",
            Self::RecoveryExhausted { .. } => "recovery_exhausted",
            Self::Io(_) => "io_error",
            Self::Other(_) => "internal_error",
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
