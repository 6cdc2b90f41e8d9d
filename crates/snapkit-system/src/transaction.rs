//! Install transaction state machine
//!
//! An install walks `fetching → unpacking → validating → placing →
//! activating → syncing-security → done`. Any non-terminal state may move to
//! `aborted`. Local archives start at `unpacking`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SystemError};

/// Where an install transaction stands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TransactionState {
    /// Created, nothing done yet
    #[default]
    Pending,

    /// Downloading the archive and icon
    Fetching,

    /// Verifying the archive and reading its manifest
    Unpacking,

    /// Architecture, conflict, dependency, OEM and license checks
    Validating,

    /// Writing the version directory, sidecars, policies and units
    Placing,

    /// Repointing `current`, udev rules, starting services
    Activating,

    /// Refreshing the policy of dependents
    SyncingSecurity,

    Done,

    /// Failed; the previously active version remains active
    Aborted { reason: String },
}

impl TransactionState {
    pub fn status_name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Unpacking => "unpacking",
            Self::Validating => "validating",
            Self::Placing => "placing",
            Self::Activating => "activating",
            Self::SyncingSecurity => "syncing-security",
            Self::Done => "done",
            Self::Aborted { .. } => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted { .. })
    }

    /// Whether the package tree may already have been written
    pub fn has_placed(&self) -> bool {
        matches!(
            self,
            Self::Placing | Self::Activating | Self::SyncingSecurity | Self::Done
        )
    }

    /// Legal successors of this state
    pub fn can_advance_to(&self, next: &TransactionState) -> bool {
        use TransactionState::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Aborted { .. })
                | (Pending, Fetching)
                | (Pending, Unpacking)
                | (Fetching, Unpacking)
                | (Unpacking, Validating)
                | (Validating, Placing)
                | (Placing, Activating)
                | (Activating, SyncingSecurity)
                | (SyncingSecurity, Done)
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aborted { reason } => write!(f, "aborted: {}", reason),
            other => write!(f, "{}", other.status_name()),
        }
    }
}

/// One install, with the states it went through
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Qualified name once known; the archive name before its manifest is read
    pub target: String,

    /// Empty until the manifest is read
    pub version: String,

    state: TransactionState,

    history: Vec<TransactionState>,

    pub started_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(target: impl Into<String>, version: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            target: target.into(),
            version: version.into(),
            state: TransactionState::Pending,
            history: vec![TransactionState::Pending],
            started_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    /// Every state entered, oldest first
    pub fn history(&self) -> &[TransactionState] {
        &self.history
    }

    /// Status names of [`Transaction::history`]
    pub fn status_names(&self) -> Vec<&'static str> {
        self.history.iter().map(TransactionState::status_name).collect()
    }

    pub fn is_done(&self) -> bool {
        self.state == TransactionState::Done
    }

    pub(crate) fn identify(&mut self, target: &str, version: &str) {
        self.target = target.to_string();
        self.version = version.to_string();
    }

    /// Move to `next`, refusing transitions that skip or reorder steps
    pub fn advance(&mut self, next: TransactionState) -> Result<()> {
        if !self.state.can_advance_to(&next) {
            return Err(SystemError::Transaction {
                message: format!(
                    "{}: illegal transition {} -> {}",
                    self.target,
                    self.state.status_name(),
                    next.status_name()
                ),
            });
        }

        tracing::debug!(
            "{}: {} -> {}",
            self.target,
            self.state.status_name(),
            next.status_name()
        );
        self.state = next.clone();
        self.history.push(next);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the transaction failed; a terminal transaction stays as it is
    pub fn abort(&mut self, reason: impl Into<String>) {
        let aborted = TransactionState::Aborted {
            reason: reason.into(),
        };
        if self.state.can_advance_to(&aborted) {
            self.state = aborted.clone();
            self.history.push(aborted);
            self.updated_at = Utc::now();
        }
    }
}
