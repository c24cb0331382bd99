//! Batch reconciliation service

use crate::config::{ReceiverConfig, ReconcilerConfig};
use crate::engine::{ReconcileOptions, ReconciliationEngine};
use crate::error::ReconcileError;
use crate::lock::EntityLocks;
use crate::notifier::{AlertCounts, ChangeNotifier};
use crate::staleness::StalenessEvaluator;
use alert_history::{datacenters, is_firing, EntityId, EntityRevision, EntityStore};
use alert_normalizer::{normalize, ActiveAlert};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of reconciling one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOutcome {
    /// No alertname maps to the entity
    Unmapped,
    /// Entity disappeared between listing and locking
    Missing,
    Unchanged,
    /// History persisted and counts published
    Updated,
}

/// Result of one batch invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Active alerts in the batch
    pub alerts: usize,
    /// Open entities examined
    pub examined: usize,
    pub skipped: Vec<EntityId>,
    pub updated: Vec<EntityId>,
}

/// Reconciles delivered batches against every open entity
pub struct ReconciliationService {
    store: Arc<dyn EntityStore>,
    engine: ReconciliationEngine,
    locks: Arc<EntityLocks>,
    notifier: ChangeNotifier,
    history_version: u32,
}

impl ReconciliationService {
    pub fn new(store: Arc<dyn EntityStore>, config: &ReconcilerConfig) -> Self {
        info!(
            stale_after_secs = config.stale_after_secs,
            channel = %config.notification_channel,
            "Creating reconciliation service"
        );
        Self {
            store,
            engine: ReconciliationEngine::new(StalenessEvaluator::new(config.stale_after_secs)),
            locks: Arc::new(EntityLocks::new(config.lock_prefix.clone())),
            notifier: ChangeNotifier::new(
                config.notification_channel.clone(),
                config.notification_capacity,
            ),
            history_version: config.history_version,
        }
    }

    /// Share a lock registry with other services in the process
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<EntityLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &Arc<EntityLocks> {
        &self.locks
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Reconcile one delivered batch at the current time
    pub fn process_batch(
        &self,
        receiver: &ReceiverConfig,
        payload: &str,
        options: &ReconcileOptions,
    ) -> Result<BatchSummary, ReconcileError> {
        self.process_batch_at(receiver, payload, options, Utc::now())
    }

    /// Reconcile one delivered batch as of `now`.
    ///
    /// The payload is normalized once before any entity is touched. The first
    /// entity failure aborts the invocation.
    pub fn process_batch_at(
        &self,
        receiver: &ReceiverConfig,
        payload: &str,
        options: &ReconcileOptions,
        now: DateTime<Utc>,
    ) -> Result<BatchSummary, ReconcileError> {
        let batch = normalize(payload)?;
        metrics::counter!("alert_reconciler_batches_total").increment(1);

        let mut summary = BatchSummary {
            alerts: batch.len(),
            ..Default::default()
        };

        for entity_id in self.store.open_entities()? {
            summary.examined += 1;
            let outcome = self
                .reconcile_entity(receiver, entity_id, &batch, options, now)
                .inspect_err(|e| warn!(entity_id, error = %e, "entity reconciliation failed"))?;

            match outcome {
                EntityOutcome::Updated => summary.updated.push(entity_id),
                EntityOutcome::Unmapped => summary.skipped.push(entity_id),
                EntityOutcome::Missing | EntityOutcome::Unchanged => {}
            }
        }

        debug!(
            alerts = summary.alerts,
            examined = summary.examined,
            updated = summary.updated.len(),
            "batch reconciled"
        );
        Ok(summary)
    }

    /// Run one locked read-modify-write-notify cycle for an entity.
    ///
    /// The history is saved before the display revision is applied. When
    /// `revise` fails the saved history already holds the transition, so a
    /// redelivered batch finds nothing to change and neither the revision
    /// nor the count notification is retried.
    pub fn reconcile_entity(
        &self,
        receiver: &ReceiverConfig,
        entity_id: EntityId,
        active: &[ActiveAlert],
        options: &ReconcileOptions,
        now: DateTime<Utc>,
    ) -> Result<EntityOutcome, ReconcileError> {
        let Some(alertname) = receiver.alertname_for(entity_id) else {
            debug!(entity_id, "no alertname maps to entity, skipping");
            metrics::counter!("alert_reconciler_entities_skipped_total").increment(1);
            return Ok(EntityOutcome::Unmapped);
        };

        let _guard = self.locks.acquire(entity_id);

        let Some(snapshot) = self.store.load(entity_id)? else {
            debug!(entity_id, "entity vanished before reconciliation");
            return Ok(EntityOutcome::Missing);
        };

        let mut alerts = snapshot.alerts;
        let report = self
            .engine
            .reconcile(alertname, &mut alerts, active, options, now)?;

        if !report.updated {
            return Ok(EntityOutcome::Unchanged);
        }

        self.store
            .save_history(entity_id, &alerts, self.history_version)?;

        let revision = EntityRevision {
            base_title: snapshot.base_title,
            fallback_title: snapshot.title.unwrap_or_default(),
            firing: is_firing(&alerts),
            datacenters: datacenters(&alerts),
            alerts,
        };
        self.store.revise(entity_id, &revision)?;

        let counts = self.counts()?;
        self.notifier.publish(counts);

        metrics::counter!("alert_reconciler_entities_updated_total").increment(1);
        metrics::counter!("alert_reconciler_alerts_stale_total").increment(report.stale as u64);
        metrics::counter!("alert_reconciler_status_changes_total")
            .increment(report.status_changes as u64);
        info!(
            entity_id,
            alertname,
            stale = report.stale,
            status_changes = report.status_changes,
            firing = revision.firing,
            "alert history updated"
        );

        Ok(EntityOutcome::Updated)
    }

    /// Current aggregate counts from the store
    pub fn counts(&self) -> Result<AlertCounts, ReconcileError> {
        Ok(AlertCounts {
            firing_alerts_count: self.store.firing_count()?,
            open_alerts_count: self.store.open_count()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_history::{AlertStatus, EntityRecord, InMemoryEntityStore, StoredAlert};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> (Arc<InMemoryEntityStore>, ReconciliationService) {
        let store = Arc::new(InMemoryEntityStore::new());
        store
            .insert(
                1,
                EntityRecord::open(vec![StoredAlert::firing(
                    "a1",
                    "2026-03-01T12:00:00Z",
                    "http://g/1",
                )]),
            )
            .unwrap();
        let service = ReconciliationService::new(store.clone(), &ReconcilerConfig::default());
        (store, service)
    }

    fn receiver() -> ReceiverConfig {
        ReceiverConfig::new([("cpu_high".to_string(), 1)])
    }

    #[test]
    fn test_stale_then_idempotent() {
        let (store, service) = setup();
        let mut rx = service.notifier().subscribe();
        let options = ReconcileOptions::new("http://g/1");

        let summary = service
            .process_batch_at(&receiver(), "[]", &options, t0() + Duration::minutes(6))
            .unwrap();
        assert_eq!(summary.updated, vec![1]);

        let record = store.get(1).unwrap().unwrap();
        assert_eq!(record.alerts[0].status, AlertStatus::Stale);
        assert_eq!(record.version, 2);
        assert!(!record.firing);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.counts.firing_alerts_count, 0);
        assert_eq!(event.counts.open_alerts_count, 1);

        let summary = service
            .process_batch_at(&receiver(), "[]", &options, t0() + Duration::minutes(7))
            .unwrap();
        assert!(summary.updated.is_empty());
        assert!(rx.try_recv().is_err());
        assert_eq!(store.get(1).unwrap().unwrap().revisions, 1);
    }

    #[test]
    fn test_unmapped_entity_skipped() {
        let (store, service) = setup();
        let receiver = ReceiverConfig::new([("disk_full".to_string(), 2)]);

        let options = ReconcileOptions::new("http://g/1");
        let summary = service
            .process_batch_at(&receiver, "[]", &options, t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(summary.skipped, vec![1]);
        assert!(summary.updated.is_empty());
        assert_eq!(store.get(1).unwrap().unwrap().alerts[0].status, AlertStatus::Firing);
    }

    #[test]
    fn test_decode_error_touches_nothing() {
        let (store, service) = setup();
        let options = ReconcileOptions::new("http://g/1");
        let err = service
            .process_batch_at(&receiver(), "{not json", &options, t0() + Duration::hours(1))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InputDecode(_)));
        assert_eq!(store.get(1).unwrap().unwrap().version, 1);
    }

    #[test]
    fn test_bad_timestamp_releases_lock() {
        let store = Arc::new(InMemoryEntityStore::new());
        store
            .insert(1, EntityRecord::open(vec![StoredAlert::firing("a1", "bogus", "http://g/1")]))
            .unwrap();
        let service = ReconciliationService::new(store.clone(), &ReconcilerConfig::default());

        let err = service
            .process_batch_at(&receiver(), "[]", &ReconcileOptions::new("http://g/1"), t0())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::History(_)));
        assert!(!service.locks().is_held(1));
        assert_eq!(store.get(1).unwrap().unwrap().alerts[0].starts_at, "bogus");
    }

    #[test]
    fn test_revision_uses_titles() {
        let (store, service) = setup();
        let mut record = store.get(1).unwrap().unwrap();
        record.title = Some("CPU high on web".to_string());
        store.insert(1, record).unwrap();

        let options = ReconcileOptions::new("http://g/1");
        service
            .process_batch_at(&receiver(), "[]", &options, t0() + Duration::hours(1))
            .unwrap();
        let record = store.get(1).unwrap().unwrap();
        assert_eq!(record.title.as_deref(), Some("CPU high on web"));
        assert_eq!(record.revisions, 1);
    }
}
