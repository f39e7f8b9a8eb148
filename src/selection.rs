use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::TopicSuggestion;

pub const DEFAULT_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct PendingSelection {
    pub suggestions: Vec<TopicSuggestion>,
    pub created_at: DateTime<Utc>,
}

/// Suggestion messages still waiting for a reaction, keyed by message id.
#[derive(Debug)]
pub struct PendingSelections {
    pending: HashMap<String, PendingSelection>,
    ttl: Duration,
}

impl Default for PendingSelections {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_TTL_MINUTES))
    }
}

impl PendingSelections {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            ttl,
        }
    }

    pub fn insert(
        &mut self,
        message_id: impl Into<String>,
        suggestions: Vec<TopicSuggestion>,
        now: DateTime<Utc>,
    ) {
        self.pending.insert(
            message_id.into(),
            PendingSelection {
                suggestions,
                created_at: now,
            },
        );
    }

    pub fn is_pending(&self, message_id: &str, now: DateTime<Utc>) -> bool {
        self.pending
            .get(message_id)
            .is_some_and(|p| !self.expired(p, now))
    }

    pub fn expires_at(&self, message_id: &str) -> Option<DateTime<Utc>> {
        self.pending.get(message_id).map(|p| p.created_at + self.ttl)
    }

    /// Take the 1-based `choice` for a message. The selection is consumed on
    /// success; an out-of-range choice leaves it pending, an expired one drops it.
    pub fn resolve(
        &mut self,
        message_id: &str,
        choice: usize,
        now: DateTime<Utc>,
    ) -> Option<TopicSuggestion> {
        let pending = self.pending.get(message_id)?;
        if self.expired(pending, now) {
            self.pending.remove(message_id);
            return None;
        }
        if choice == 0 || choice > pending.suggestions.len() {
            return None;
        }
        self.pending
            .remove(message_id)
            .map(|mut p| p.suggestions.swap_remove(choice - 1))
    }

    /// Drop expired selections, returning how many went.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        let ttl = self.ttl;
        self.pending.retain(|_, p| now < p.created_at + ttl);
        before - self.pending.len()
    }

    fn expired(&self, pending: &PendingSelection, now: DateTime<Utc>) -> bool {
        now >= pending.created_at + self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn suggestions() -> Vec<TopicSuggestion> {
        ["A", "B", "C"]
            .iter()
            .map(|t| TopicSuggestion {
                title: t.to_string(),
                summary: None,
            })
            .collect()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn resolves_choice_once() {
        let mut selections = PendingSelections::default();
        selections.insert("m1", suggestions(), t0());

        let picked = selections.resolve("m1", 2, t0() + Duration::minutes(1));
        assert_eq!(picked.map(|s| s.title).as_deref(), Some("B"));
        assert!(selections.resolve("m1", 2, t0()).is_none());
        assert!(!selections.is_pending("m1", t0()));
    }

    #[test]
    fn out_of_range_choice_keeps_selection() {
        let mut selections = PendingSelections::default();
        selections.insert("m1", suggestions(), t0());

        assert!(selections.resolve("m1", 0, t0()).is_none());
        assert!(selections.resolve("m1", 4, t0()).is_none());
        assert!(selections.is_pending("m1", t0()));
    }

    #[test]
    fn expired_selection_cannot_be_resolved() {
        let mut selections = PendingSelections::new(Duration::minutes(10));
        selections.insert("m1", suggestions(), t0());

        assert!(selections.is_pending("m1", t0() + Duration::minutes(9)));
        assert!(selections
            .resolve("m1", 1, t0() + Duration::minutes(10))
            .is_none());
        assert!(selections.expires_at("m1").is_none());
    }

    #[test]
    fn purge_drops_only_expired() {
        let mut selections = PendingSelections::new(Duration::minutes(10));
        selections.insert("old", suggestions(), t0());
        selections.insert("new", suggestions(), t0() + Duration::minutes(8));

        assert_eq!(selections.purge_expired(t0() + Duration::minutes(12)), 1);
        assert!(selections.expires_at("old").is_none());
        assert!(selections.is_pending("new", t0() + Duration::minutes(12)));
        assert_eq!(
            selections.expires_at("new"),
            Some(t0() + Duration::minutes(18))
        );
    }

    #[test]
    fn unknown_message_is_ignored() {
        let mut selections = PendingSelections::default();
        assert!(selections.resolve("nope", 1, t0()).is_none());
    }
}
