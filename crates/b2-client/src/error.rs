//! Client error types

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure (connect, timeout, broken body stream)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("B2 error in {operation} (status {status}, {code}): {message}")]
    Api {
        operation: &'static str,
        status: u16,
        code: String,
        message: String,
    },

    /// The response was missing a field or could not be decoded
    #[error("Invalid response from {operation}: {message}")]
    Parse {
        operation: &'static str,
        message: String,
    },

    /// An authenticated call was made before `authorize` succeeded
    #[error("{operation} requires an authorized session; call authorize first")]
    Unauthenticated { operation: &'static str },

    /// Downloaded bytes do not hash to the digest the server declared
    #[error(
        "SHA-1 of {} ({computed}) does not match the server digest ({declared}); please retry the download",
        .path.display()
    )]
    Integrity {
        path: PathBuf,
        declared: String,
        computed: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error body returned by the B2 API on failure
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ClientError {
    /// Build an `Api` error from a failed response body
    pub fn from_api_body(operation: &'static str, status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|b| b.code.clone())
            .unwrap_or_else(|| format!("HTTP{}", status));
        let message = parsed
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    "no response body".to_string()
                } else {
                    body.to_string()
                }
            });

        Self::Api {
            operation,
            status,
            code,
            message,
        }
    }

    pub(crate) fn parse(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            operation,
            message: message.into(),
        }
    }

    /// HTTP status of a rejected call, if the service answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a digest mismatch (retry the transfer, not the auth)
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }

    /// Check if this call needs a session (or a fresh one)
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated { .. })
            || matches!(self, Self::Api { status: 401, .. })
    }
}
