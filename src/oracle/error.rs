//! Oracle error types

use thiserror::Error;

/// Failure of a single oracle call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// Transport failure or non-2xx status from the relay
    #[error("oracle unavailable{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Unavailable {
        status: Option<u16>,
        message: String,
    },
    /// 2xx response whose body is not a chat completion
    #[error("oracle protocol error: {0}")]
    Protocol(String),
    /// Request rejected locally before any network call
    #[error("invalid oracle request: {0}")]
    InvalidRequest(String),
}

impl OracleError {
    pub fn unavailable(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            status,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Upstream HTTP status, if the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unavailable { status, .. } => *status,
            _ => None,
        }
    }
}
