//! Staleness policy

use alert_history::{AlertStatus, HistoryError, StoredAlert};
use chrono::{DateTime, Duration, Utc};

/// Default age after which an unmatched alert is stale (5 minutes)
pub const DEFAULT_STALE_AFTER_SECS: u64 = 300;

// Largest value `Duration::seconds` accepts
const MAX_THRESHOLD_SECS: u64 = (i64::MAX / 1000) as u64;

/// Decides when an alert missing from the snapshot becomes stale
#[derive(Debug, Clone, Copy)]
pub struct StalenessEvaluator {
    threshold: Duration,
}

impl StalenessEvaluator {
    pub fn new(threshold_secs: u64) -> Self {
        Self {
            threshold: Duration::seconds(threshold_secs.min(MAX_THRESHOLD_SECS) as i64),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Whether `stored`, absent from the active snapshot, should transition
    /// to stale at `now`.
    ///
    /// Already stale alerts short-circuit before `starts_at` is parsed.
    pub fn is_stale(&self, stored: &StoredAlert, now: DateTime<Utc>) -> Result<bool, HistoryError> {
        if stored.status == AlertStatus::Stale {
            return Ok(false);
        }
        let started_at = stored.started_at()?;
        Ok(now
            .checked_sub_signed(self.threshold)
            .is_some_and(|cutoff| cutoff > started_at))
    }
}

impl Default for StalenessEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn stored() -> StoredAlert {
        StoredAlert::firing("a1", "2026-03-01T12:00:00Z", "http://g/1")
    }

    #[test]
    fn test_threshold_boundary() {
        let evaluator = StalenessEvaluator::default();

        assert!(!evaluator.is_stale(&stored(), t0() + Duration::minutes(4)).unwrap());
        // Exactly at the threshold is not yet stale
        assert!(!evaluator.is_stale(&stored(), t0() + Duration::minutes(5)).unwrap());
        assert!(evaluator
            .is_stale(&stored(), t0() + Duration::minutes(5) + Duration::seconds(1))
            .unwrap());
    }

    #[test]
    fn test_stale_never_remarked() {
        let evaluator = StalenessEvaluator::default();
        let mut alert = stored();
        alert.status = AlertStatus::Stale;
        assert!(!evaluator.is_stale(&alert, t0() + Duration::hours(1)).unwrap());
    }

    #[test]
    fn test_bad_timestamp_only_fails_when_evaluated() {
        let evaluator = StalenessEvaluator::default();
        let mut alert = stored();
        alert.starts_at = "garbage".to_string();

        assert!(evaluator.is_stale(&alert, t0()).is_err());

        alert.status = AlertStatus::Stale;
        assert!(!evaluator.is_stale(&alert, t0()).unwrap());
    }

    #[test]
    fn test_huge_threshold_is_clamped() {
        let evaluator = StalenessEvaluator::new(u64::MAX);
        assert!(evaluator.threshold() > Duration::days(365 * 1000));
        assert!(!evaluator.is_stale(&stored(), t0()).unwrap());
    }
}
