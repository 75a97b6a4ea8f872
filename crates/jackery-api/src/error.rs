use thiserror::Error;

use crate::client::TOKEN_EXPIRED_CODE;

/// Top-level error type for the `jackery-api` crate.
///
/// Covers every failure mode of the cloud client: the login handshake,
/// application-level errors on read endpoints, and the HTTP transport.
/// The CLI maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed: endpoint unreachable, non-zero code, or no token returned.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Application ─────────────────────────────────────────────────
    /// A read endpoint returned a non-zero application code.
    #[error("API error (code {code}): {message}")]
    Api { code: i64, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, timeout, non-2xx status, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Handshake ───────────────────────────────────────────────────
    /// Building the encrypted login envelope failed.
    #[error("Login envelope encryption failed: {message}")]
    Crypto { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the credentials or login handshake were rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the server still reported an expired token
    /// after the client's single re-login attempt.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::Api { code, .. } if *code == TOKEN_EXPIRED_CODE)
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next poll cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Extract the vendor application code, if available.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }
}
