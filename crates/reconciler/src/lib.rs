//! Alert Reconciliation
//!
//! Merges a normalized Alertmanager snapshot into every open entity's stored
//! alert history:
//! - identity matching scoped by graph URL
//! - time-based staleness
//! - write-once and overwrite enrichment fields
//! - per-entity locking and change notification

mod config;
mod engine;
mod error;
mod lock;
mod matcher;
mod notifier;
mod service;
mod staleness;

pub use config::{ReceiverConfig, ReconcilerConfig};
pub use engine::{dashboard_url, ReconcileOptions, ReconcileReport, ReconciliationEngine};
pub use error::ReconcileError;
pub use lock::{EntityGuard, EntityLocks};
pub use matcher::AlertMatcher;
pub use notifier::{AlertCounts, ChangeEvent, ChangeNotifier};
pub use service::{BatchSummary, EntityOutcome, ReconciliationService};
pub use staleness::{StalenessEvaluator, DEFAULT_STALE_AFTER_SECS};
