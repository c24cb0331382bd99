//! Alert History
//!
//! Stored alert records, entity snapshots, and the storage port the
//! reconciler persists through.

mod record;
mod repository;

pub use record::{datacenters, is_firing, parse_timestamp, AlertStatus, EntityId, StoredAlert};
pub use repository::{
    EntityRecord, EntityRevision, EntitySnapshot, EntityStore, InMemoryEntityStore,
};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Entity {0} not found")]
    NotFound(EntityId),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Errors reading stored alert fields
#[derive(Debug, Error)]
pub enum HistoryError {
    /// A stored `starts_at` is not a recognised timestamp
    #[error("alert {alert_id}: cannot parse starts_at {value:?}: {source}")]
    TimestampParse {
        alert_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
