//! Reconciliation Engine Implementation

use crate::error::ReconcileError;
use crate::matcher::AlertMatcher;
use crate::staleness::StalenessEvaluator;
use alert_history::{AlertStatus, StoredAlert};
use alert_normalizer::ActiveAlert;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-batch options supplied alongside the payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Scope: only stored alerts whose graph URL contains this are touched
    pub graph_url: String,
    /// Logs link recorded on stored alerts that have none yet
    #[serde(default)]
    pub logs_url: Option<String>,
    /// Grafana base URL used to derive dashboard links
    #[serde(default)]
    pub grafana_url: Option<String>,
}

impl ReconcileOptions {
    pub fn new(graph_url: impl Into<String>) -> Self {
        Self {
            graph_url: graph_url.into(),
            ..Default::default()
        }
    }

    fn logs_url(&self) -> Option<&str> {
        self.logs_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// What one reconciliation cycle changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// History changed in a way that must be persisted and announced
    pub updated: bool,
    /// Alerts marked stale
    pub stale: usize,
    /// Alerts whose status followed the active snapshot
    pub status_changes: usize,
}

/// Merges an active snapshot into one entity's stored alerts
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine {
    staleness: StalenessEvaluator,
}

impl ReconciliationEngine {
    pub fn new(staleness: StalenessEvaluator) -> Self {
        Self { staleness }
    }

    /// Reconcile `stored` in place against `active`.
    ///
    /// `alertname` is the name the entity is mapped from. Order of `stored`
    /// is preserved. Only status transitions set `updated`; `logs_url` and
    /// `grafana_url` enrichment rides along with the next persisted change.
    pub fn reconcile(
        &self,
        alertname: &str,
        stored: &mut [StoredAlert],
        active: &[ActiveAlert],
        options: &ReconcileOptions,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, ReconcileError> {
        let matcher = AlertMatcher::new(alertname, &options.graph_url, active);
        let mut report = ReconcileReport::default();

        for alert in stored.iter_mut() {
            if alert.logs_url.is_none() {
                if let Some(logs_url) = options.logs_url() {
                    alert.logs_url = Some(logs_url.to_string());
                }
            }

            if !matcher.in_scope(alert) {
                continue;
            }

            let matched = matcher.find(alert);

            if let Some(url) = dashboard_url(matched, options.grafana_url.as_deref()) {
                alert.grafana_url = Some(url);
            }

            match matched {
                None => {
                    if self.staleness.is_stale(alert, now)? {
                        debug!(
                            alert_id = %alert.id,
                            alertname,
                            from = %alert.status,
                            "alert went stale"
                        );
                        alert.status = AlertStatus::Stale;
                        report.stale += 1;
                    }
                }
                Some(current) => {
                    let status = current.normalized_status();
                    if alert.status != status {
                        debug!(
                            alert_id = %alert.id,
                            alertname,
                            from = %alert.status,
                            to = %status,
                            "alert status changed"
                        );
                        alert.status = status;
                        alert.description = current.description().map(str::to_string);
                        report.status_changes += 1;
                    }
                }
            }
        }

        report.updated = report.stale + report.status_changes > 0;
        Ok(report)
    }
}

/// Dashboard link for a matched alert: the Grafana base URL followed by the
/// alert's `grafana_dashboard_path` annotation
pub fn dashboard_url(active: Option<&ActiveAlert>, base: Option<&str>) -> Option<String> {
    let base = base.filter(|b| !b.is_empty())?;
    let path = active?.dashboard_path().filter(|p| !p.is_empty())?;
    Some(format!("{base}{path}"))
}
