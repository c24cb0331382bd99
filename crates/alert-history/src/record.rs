//! Stored Alert Records

use crate::HistoryError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of the entity (topic) owning an alert history
pub type EntityId = u64;

/// Lifecycle status of an alert.
///
/// Unknown values coming from the monitoring source are kept verbatim so they
/// survive a round trip through storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertStatus {
    Firing,
    Resolved,
    Stale,
    Other(String),
}

impl AlertStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AlertStatus::Firing => "firing",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Stale => "stale",
            AlertStatus::Other(s) => s,
        }
    }
}

impl From<&str> for AlertStatus {
    fn from(value: &str) -> Self {
        match value {
            "firing" => AlertStatus::Firing,
            "resolved" => AlertStatus::Resolved,
            "stale" => AlertStatus::Stale,
            other => AlertStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for AlertStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "firing" | "resolved" | "stale" => AlertStatus::from(value.as_str()),
            _ => AlertStatus::Other(value),
        }
    }
}

impl From<AlertStatus> for String {
    fn from(status: AlertStatus) -> Self {
        match status {
            AlertStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alert's known lifecycle state, persisted in an entity's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: String,
    pub status: AlertStatus,
    /// Start time as persisted; parsed only when staleness is evaluated
    pub starts_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
    /// Query URL the alert was raised from; scopes which batches may touch it
    #[serde(default)]
    pub graph_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
}

impl StoredAlert {
    /// Create a firing alert with the given start time
    pub fn firing(
        id: impl Into<String>,
        starts_at: impl Into<String>,
        graph_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            status: AlertStatus::Firing,
            starts_at: starts_at.into(),
            ends_at: None,
            graph_url: graph_url.into(),
            logs_url: None,
            grafana_url: None,
            description: None,
            datacenter: None,
        }
    }

    /// Parse `starts_at`
    pub fn started_at(&self) -> Result<DateTime<Utc>, HistoryError> {
        parse_timestamp(&self.starts_at).map_err(|source| HistoryError::TimestampParse {
            alert_id: self.id.clone(),
            value: self.starts_at.clone(),
            source,
        })
    }
}

/// Parse a persisted timestamp.
///
/// Accepts RFC 3339 and the `YYYY-MM-DD HH:MM:SS UTC` form.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(rfc_err) => {
            let trimmed = value.trim();
            let Some(naive) = trimmed.strip_suffix(" UTC") else {
                return Err(rfc_err);
            };
            NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S").map(|ts| ts.and_utc())
        }
    }
}

/// Whether any alert in the history is currently firing
pub fn is_firing(alerts: &[StoredAlert]) -> bool {
    alerts.iter().any(|a| a.status == AlertStatus::Firing)
}

/// Distinct datacenters named in the history, sorted
pub fn datacenters(alerts: &[StoredAlert]) -> Vec<String> {
    alerts
        .iter()
        .filter_map(|a| a.datacenter.as_deref())
        .filter(|dc| !dc.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
