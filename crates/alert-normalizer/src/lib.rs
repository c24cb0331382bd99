//! Alert Batch Normalization
//!
//! Decodes Alertmanager alert listings, either the flat `/api/v1/alerts`
//! shape or the grouped `/api/v1/alerts/grouped` shape, into one ordered
//! sequence of active alerts.

mod error;
mod normalizer;
mod payload;

pub use error::NormalizeError;
pub use normalizer::{normalize, normalize_status, NormalizedBatch, PayloadShape};
pub use payload::{ActiveAlert, AlertAnnotations, AlertBlock, AlertGroup, AlertLabels, AlertState};
