//! Stored-to-active alert matching

use alert_history::{AlertStatus, StoredAlert};
use alert_normalizer::ActiveAlert;

/// Finds the active counterpart of stored alerts for one entity and one
/// graph-URL scope
#[derive(Debug, Clone, Copy)]
pub struct AlertMatcher<'a> {
    alertname: &'a str,
    scope: &'a str,
    active: &'a [ActiveAlert],
}

impl<'a> AlertMatcher<'a> {
    pub fn new(alertname: &'a str, scope: &'a str, active: &'a [ActiveAlert]) -> Self {
        Self {
            alertname,
            scope,
            active,
        }
    }

    /// Whether this batch may touch `stored` at all.
    ///
    /// The stored graph URL must contain the batch scope, and resolved alerts
    /// are never reopened.
    pub fn in_scope(&self, stored: &StoredAlert) -> bool {
        stored.graph_url.contains(self.scope) && stored.status != AlertStatus::Resolved
    }

    /// First active alert with the stored alert's identity
    pub fn find(&self, stored: &StoredAlert) -> Option<&'a ActiveAlert> {
        self.active
            .iter()
            .find(|active| active.is_identified_by(&stored.id, self.alertname))
    }
}
