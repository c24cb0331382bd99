//! Reconciliation Error Types

use alert_history::{HistoryError, StorageError};
use alert_normalizer::NormalizeError;
use thiserror::Error;

/// Errors aborting a batch invocation
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Batch payload could not be decoded; no entity was touched
    #[error(transparent)]
    InputDecode(#[from] NormalizeError),

    /// A stored alert has an unparseable start time
    #[error(transparent)]
    History(#[from] HistoryError),

    /// The entity store failed; nothing was committed for that entity
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),
}
