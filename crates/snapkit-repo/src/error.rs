//! Errors raised while talking to the store or reading installed packages

use snapkit_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Configuration ============
    #[error("bad store url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("store configuration: {message}")]
    InvalidConfig { message: String },

    // ============ Transport ============
    #[error("store answered {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("cannot reach the store: {message}")]
    NetworkError { message: String },

    #[error("store did not answer within {seconds}s")]
    Timeout { seconds: u64 },

    // ============ Catalog ============
    #[error("snap not found: {name}")]
    NotFound { name: String },

    #[error("unexpected store response: {message}")]
    InvalidResponse { message: String },

    #[error("{repository} repository does not support {operation}")]
    Unsupported {
        repository: String,
        operation: &'static str,
    },

    // ============ Local ============
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot decode: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, RepoError>;

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return RepoError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            };
        }
        if e.is_timeout() {
            RepoError::Timeout { seconds: 30 }
        } else if e.is_decode() {
            RepoError::InvalidResponse {
                message: e.to_string(),
            }
        } else {
            RepoError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::InvalidResponse {
            message: e.to_string(),
        }
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
