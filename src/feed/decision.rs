use crate::models::FeedSnapshot;

/// Outcome of comparing a snapshot against the staleness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Fresh { days: i64 },
    Stale { days: i64 },
    CheckFailed,
}

impl Decision {
    /// A failed check is never a reason to notify; failures are reported on
    /// their own.
    pub fn should_notify(self) -> bool {
        matches!(self, Decision::Stale { .. })
    }
}

/// The boundary is inclusive: `days == threshold_days` is stale.
pub fn evaluate(snapshot: &FeedSnapshot, threshold_days: u32) -> Decision {
    match (snapshot.is_success(), snapshot.days_since_update()) {
        (true, Some(days)) if days >= i64::from(threshold_days) => Decision::Stale { days },
        (true, Some(days)) => Decision::Fresh { days },
        _ => Decision::CheckFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(days: i64) -> FeedSnapshot {
        FeedSnapshot::success(Utc::now(), days, "Post".into(), String::new())
    }

    #[test]
    fn notifies_iff_days_reach_threshold() {
        for threshold in 1..=30u32 {
            for days in 0..=40i64 {
                assert_eq!(
                    evaluate(&snapshot(days), threshold).should_notify(),
                    days >= i64::from(threshold),
                    "days={days} threshold={threshold}"
                );
            }
        }
    }

    #[test]
    fn failed_snapshot_never_notifies() {
        let failed = FeedSnapshot::failure("Error checking RSS feed: timeout");
        for threshold in [0, 1, 7, 365] {
            assert!(!evaluate(&failed, threshold).should_notify());
        }
        assert_eq!(evaluate(&failed, 7), Decision::CheckFailed);
    }

    #[test]
    fn exactly_at_threshold_is_stale() {
        assert_eq!(evaluate(&snapshot(7), 7), Decision::Stale { days: 7 });
        assert_eq!(evaluate(&snapshot(6), 7), Decision::Fresh { days: 6 });
    }
}
