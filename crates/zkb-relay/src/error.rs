//! Relay error type and its retry classification.

use zkb_ledger::LedgerError;

use crate::checkpoint::CheckpointError;
use crate::settings::ConfigError;

/// Errors that can occur while relaying commitments.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The peer could not be reached or has not confirmed yet.
    #[error("Transient failure: {0}")]
    Transient(String),
    /// The ledger refused the call. Retrying will not help.
    #[error("Rejected by ledger: {0}")]
    Rejected(#[from] LedgerError),
    /// Reading or writing the checkpoint failed.
    #[error("Checkpoint store: {0}")]
    Checkpoint(#[from] CheckpointError),
    /// Invalid relay configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A watch task panicked or was aborted.
    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl RelayError {
    /// Returns `true` if this error is transient and the call should be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
