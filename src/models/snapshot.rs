use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one feed check. Built fresh per check and never persisted.
///
/// Fields are private and the constructors are the only way to build one,
/// so a failed snapshot never carries data and a successful one always has
/// a timestamp, an age and a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedSnapshot {
    success: bool,
    last_updated: Option<DateTime<Utc>>,
    days_since_update: Option<i64>,
    latest_title: Option<String>,
    latest_link: Option<String>,
    error: Option<String>,
}

impl FeedSnapshot {
    pub fn success(
        last_updated: DateTime<Utc>,
        days_since_update: i64,
        latest_title: String,
        latest_link: String,
    ) -> Self {
        Self {
            success: true,
            last_updated: Some(last_updated),
            days_since_update: Some(days_since_update),
            latest_title: Some(latest_title),
            latest_link: Some(latest_link),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            last_updated: None,
            days_since_update: None,
            latest_title: None,
            latest_link: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn days_since_update(&self) -> Option<i64> {
        self.days_since_update
    }

    pub fn latest_title(&self) -> Option<&str> {
        self.latest_title.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Title of the latest post, empty on a failed check.
    pub fn title(&self) -> &str {
        self.latest_title.as_deref().unwrap_or_default()
    }

    pub fn link(&self) -> &str {
        self.latest_link.as_deref().unwrap_or_default()
    }
}
