use thiserror::Error;

use crate::types::ProbeStatus;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid option combination: {0}")]
    InvalidOptions(String),

    #[error("Ranking oracle failed: {0}")]
    Oracle(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;

/// Failure of a single transfer. Never escapes a probe; it is folded into
/// the candidate's [`ProbeStatus`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Protocol(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Timeout
        } else if err.is_connect() {
            ProbeError::Unreachable(err.to_string())
        } else {
            ProbeError::Protocol(err.to_string())
        }
    }
}

impl From<ProbeError> for ProbeStatus {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Unreachable(reason) => ProbeStatus::Unreachable(reason),
            ProbeError::Timeout => ProbeStatus::Timeout,
            ProbeError::Protocol(reason) => ProbeStatus::Error(reason),
        }
    }
}
