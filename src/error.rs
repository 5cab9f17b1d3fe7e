//! Error taxonomy shared by the API collaborators and the session handle.

use std::error::Error;

use thiserror::Error;

/// Result alias for calls against the game server API.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors raised by the snapshot/submission collaborators.
///
/// Only [`ApiError::NotFound`] and [`ApiError::Unauthorized`] end a session;
/// everything else is absorbed by the engine (transients are retried on the
/// next poll tick, rejections become warnings).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or server hiccup; the next poll tick retries silently.
    #[error("transient error: {message}")]
    Transient {
        /// Human-readable description of the failure.
        message: String,
        /// Underlying cause when one is available.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    /// The room no longer exists (or never did). Terminal.
    #[error("room `{code}` not found")]
    NotFound {
        /// Room code the request was issued for.
        code: String,
    },
    /// Credentials were missing or rejected. Terminal, surfaced distinctly
    /// from [`ApiError::NotFound`].
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The server refused a submission (round already over, duplicate, ...).
    /// Non-fatal; the next snapshot is authoritative.
    #[error("submission rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Construct a transient error wrapping a source failure.
    pub fn transient(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        ApiError::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Construct a transient error from a bare message.
    pub fn transient_msg(message: impl Into<String>) -> Self {
        ApiError::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error ends the synchronization session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApiError::NotFound { .. } | ApiError::Unauthorized(_))
    }
}

/// Errors returned by [`crate::session::SessionHandle`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session engine has already shut down (disconnected, game over, or
    /// a terminal API error).
    #[error("session closed")]
    Closed,
}
