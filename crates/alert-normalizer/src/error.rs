//! Normalization Error Types

use thiserror::Error;

/// Errors decoding an alert batch
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Payload is not valid JSON or an alert record is malformed
    #[error("Invalid alert payload: {0}")]
    InputDecode(#[from] serde_json::Error),

    /// Payload decoded but is not a list
    #[error("Invalid alert payload: expected a list, got {found}")]
    NotAList { found: &'static str },
}
