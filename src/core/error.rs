//! Failure taxonomy shared by every lookup.

use thiserror::Error;

/// Why a remote lookup did not produce a result.
///
/// Primary lookups surface these to the user. Advisory lookups (search,
/// metadata) swallow them and fall back to an empty or placeholder value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Network failure, timeout or an unexpected HTTP status.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The service answered but had nothing for the request.
    #[error("No data for {0}")]
    EmptyResult(String),

    /// Remote quota exceeded.
    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// The service refused the request (bad key, inactive account, malformed request).
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The payload could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Caller-side validation failed before anything was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::InvalidResponse(err.to_string())
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::InvalidResponse(err.to_string())
    }
}

pub type Result<T, E = LookupError> = std::result::Result<T, E>;
