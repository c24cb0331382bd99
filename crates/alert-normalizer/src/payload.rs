//! Alertmanager Wire Types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One alert from the current monitoring snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAlert {
    #[serde(default)]
    pub labels: AlertLabels,
    pub status: AlertState,
    #[serde(default)]
    pub annotations: AlertAnnotations,
    #[serde(rename = "startsAt", default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(rename = "generatorURL", default, skip_serializing_if = "Option::is_none")]
    pub generator_url: Option<String>,
}

/// Labels attached to an alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLabels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alertname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Alertmanager status block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub state: String,
}

/// Annotations attached to an alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Path appended to the Grafana base URL to reach the alert's dashboard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana_dashboard_path: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Group in the grouped listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertGroup {
    pub blocks: Vec<AlertBlock>,
}

/// Block of alerts sharing a route inside a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertBlock {
    #[serde(default)]
    pub alerts: Vec<ActiveAlert>,
}

impl ActiveAlert {
    /// Whether this alert has the identity `(id, alertname)`
    pub fn is_identified_by(&self, id: &str, alertname: &str) -> bool {
        self.labels.id.as_deref() == Some(id) && self.labels.alertname.as_deref() == Some(alertname)
    }

    pub fn description(&self) -> Option<&str> {
        self.annotations.description.as_deref()
    }

    pub fn dashboard_path(&self) -> Option<&str> {
        self.annotations.grafana_dashboard_path.as_deref()
    }
}
