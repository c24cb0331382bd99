//! Reconciler configuration

use crate::staleness::DEFAULT_STALE_AFTER_SECS;
use alert_history::EntityId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Age after which an unmatched alert becomes stale (seconds)
    pub stale_after_secs: u64,

    /// History format version stamped on every persisted history
    pub history_version: u32,

    /// Prefix of the per-entity lock key
    pub lock_prefix: String,

    /// Channel alert counts are published on
    pub notification_channel: String,

    /// Buffered change events per subscriber
    pub notification_capacity: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            history_version: 2,
            lock_prefix: "prom_alert_receiver_topic_".to_string(),
            notification_channel: "/alert-receiver".to_string(),
            notification_capacity: 64,
        }
    }
}

/// Receiver configuration: which entity each alertname reports into.
///
/// Alertnames keep the order they were configured in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    #[serde(default)]
    pub topic_map: IndexMap<String, EntityId>,
}

impl ReceiverConfig {
    pub fn new(topic_map: impl IntoIterator<Item = (String, EntityId)>) -> Self {
        Self {
            topic_map: topic_map.into_iter().collect(),
        }
    }

    /// Alertname mapped onto `entity_id`.
    ///
    /// When several alertnames share an entity the first configured one
    /// wins.
    pub fn alertname_for(&self, entity_id: EntityId) -> Option<&str> {
        self.topic_map
            .iter()
            .find(|(_, id)| **id == entity_id)
            .map(|(name, _)| name.as_str())
    }
}
