//! Error types for snapkit-system

use snapkit_core::CoreError;
use snapkit_repo::RepoError;
use thiserror::Error;

/// Result type for snapkit-system operations
pub type Result<T> = std::result::Result<T, SystemError>;

/// Errors raised while installing, removing or activating packages
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SystemError {
    // ============ Conflicts ============
    /// Frameworks and OEM packages own their bare name across origins
    #[error("package '{name}' is already installed from origin '{origin}'")]
    NameAlreadyInstalled { name: String, origin: String },

    /// The exact version is installed already and the request was not a reinstall
    #[error("{name} {version} is already installed")]
    AlreadyInstalled { name: String, version: String },

    #[error("framework still in use by: {}", .dependents.join(", "))]
    FrameworkInUse { dependents: Vec<String> },

    // ============ Lookup ============
    #[error("package is not installed")]
    NotInstalled,

    #[error("package '{name}' is built into the device and cannot be removed")]
    PackageNotRemovable { name: String },

    // ============ Archive ============
    #[error("package archive is corrupt: {reason}")]
    PackageCorrupt { reason: String },

    #[error("package signature could not be verified: {reason}")]
    SignatureInvalid { reason: String },

    // ============ Policy ============
    #[error("package '{name}' requires a license agreement but ships no license")]
    LicenseNotProvided { name: String },

    #[error("license of '{name}' was not accepted")]
    LicenseNotAccepted { name: String },

    #[error("installing OEM package '{name}' requires allow-oem")]
    OemInstallNotAllowed { name: String },

    // ============ Transaction ============
    #[error("transaction failed: {message}")]
    Transaction { message: String },

    #[error("command '{command}' failed: {output}")]
    ExternalCommand { command: String, output: String },

    // ============ Wrapped ============
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SystemError {
    fn from(e: serde_json::Error) -> Self {
        SystemError::Serialization(e.to_string())
    }
}

impl SystemError {
    /// Conflicts detected before anything was written
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SystemError::NameAlreadyInstalled { .. }
                | SystemError::FrameworkInUse { .. }
                | SystemError::Core(CoreError::NameClash { .. })
                | SystemError::Core(CoreError::MissingFrameworks { .. })
        )
    }

    /// Failures that aborted a running transaction
    pub fn is_transaction(&self) -> bool {
        matches!(
            self,
            SystemError::PackageCorrupt { .. }
                | SystemError::SignatureInvalid { .. }
                | SystemError::Transaction { .. }
                | SystemError::ExternalCommand { .. }
        )
    }
}
