//! Batch Flattening

use crate::error::NormalizeError;
use crate::payload::{ActiveAlert, AlertGroup};
use alert_history::AlertStatus;
use serde_json::Value;
use std::ops::Deref;
use tracing::debug;

/// Wire shape a batch arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `[{ "blocks": [{ "alerts": [...] }] }]`
    Grouped,
    /// `[alert, ...]`
    Flat,
}

/// Immutable, ordered sequence of active alerts decoded from one batch
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    shape: PayloadShape,
    alerts: Vec<ActiveAlert>,
}

impl NormalizedBatch {
    pub fn shape(&self) -> PayloadShape {
        self.shape
    }

    pub fn alerts(&self) -> &[ActiveAlert] {
        &self.alerts
    }
}

impl Deref for NormalizedBatch {
    type Target = [ActiveAlert];

    fn deref(&self) -> &Self::Target {
        &self.alerts
    }
}

/// Decode and flatten a batch payload.
///
/// A list whose first element has a `blocks` key is read as the grouped
/// shape and flattened group by group, block by block. Anything else is read
/// as a flat alert list. An empty list yields an empty batch.
pub fn normalize(payload: &str) -> Result<NormalizedBatch, NormalizeError> {
    let value: Value = serde_json::from_str(payload)?;

    let Value::Array(items) = &value else {
        return Err(NormalizeError::NotAList {
            found: json_kind(&value),
        });
    };

    let grouped = items
        .first()
        .and_then(Value::as_object)
        .is_some_and(|first| first.contains_key("blocks"));

    let batch = if grouped {
        let groups: Vec<AlertGroup> = serde_json::from_value(value)?;
        let alerts = groups
            .into_iter()
            .flat_map(|group| group.blocks)
            .flat_map(|block| block.alerts)
            .collect();
        NormalizedBatch {
            shape: PayloadShape::Grouped,
            alerts,
        }
    } else {
        NormalizedBatch {
            shape: PayloadShape::Flat,
            alerts: serde_json::from_value(value)?,
        }
    };

    debug!(shape = ?batch.shape, alerts = batch.alerts.len(), "normalized alert batch");
    Ok(batch)
}

/// Map an Alertmanager state onto a stored status.
///
/// Alertmanager reports firing alerts as `active`.
pub fn normalize_status(state: &str) -> AlertStatus {
    match state {
        "active" => AlertStatus::Firing,
        other => AlertStatus::from(other),
    }
}

impl ActiveAlert {
    /// Status this alert implies for its stored counterpart
    pub fn normalized_status(&self) -> AlertStatus {
        normalize_status(&self.status.state)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
