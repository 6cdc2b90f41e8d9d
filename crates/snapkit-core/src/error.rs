//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    // ============ Validation Errors ============
    #[error("missing required fields '{}'", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("{kind} name '{name}' is not valid: only letters, digits and '-' are allowed")]
    InvalidName { kind: &'static str, name: String },

    #[error("both 'framework' and 'frameworks' are set, use 'frameworks' only")]
    ConflictingFrameworkSpec,

    #[error("invalid architecture: {message}")]
    InvalidArchitecture { message: String },

    #[error("invalid package.yaml: {message}")]
    InvalidManifest { message: String },

    #[error("invalid hardware assignment for '{part_id}': {message}")]
    InvalidHardwareRule { part_id: String, message: String },

    // ============ Conflict Errors ============
    #[error("binary and service both called {name}")]
    NameClash { name: String },

    #[error("missing frameworks: {}", .names.join(", "))]
    MissingFrameworks { names: Vec<String> },

    // ============ Compatibility Errors ============
    #[error(
        "package's supported architectures ({}) is incompatible with this system ({host})",
        .supported.join(", ")
    )]
    IncompatibleArchitecture { supported: Vec<String>, host: String },

    // ============ Layout Errors ============
    #[error("can not determine origin from {path}")]
    NoOrigin { path: String },

    #[error("Failed to parse package.yaml: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// True for errors raised while validating a manifest
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::MissingFields { .. }
                | CoreError::InvalidName { .. }
                | CoreError::ConflictingFrameworkSpec
                | CoreError::InvalidArchitecture { .. }
                | CoreError::InvalidManifest { .. }
                | CoreError::YamlParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
