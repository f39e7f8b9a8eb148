use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::FeedSnapshot;

use super::date::{days_since, extract_timestamp};
use super::decision::{self, Decision};
use super::fetcher::FeedFetcher;
use super::parser::{parse_feed, ParsedFeed};

pub const NO_ENTRIES: &str = "No entries found in RSS feed";
pub const NO_DATE: &str = "Could not extract date from latest post";
const NO_TITLE: &str = "No title";

/// Checks one feed for how long it has been since the newest post.
pub struct FeedChecker {
    fetcher: FeedFetcher,
    feed_url: String,
}

impl FeedChecker {
    pub fn new(feed_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            fetcher: FeedFetcher::new()?,
            feed_url: feed_url.into(),
        })
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Fetch the feed and describe its newest entry. Never fails; problems end
    /// up in the snapshot's `error`.
    pub async fn check(&self) -> FeedSnapshot {
        self.check_at(Utc::now()).await
    }

    pub async fn check_at(&self, now: DateTime<Utc>) -> FeedSnapshot {
        tracing::info!(url = %self.feed_url, "Fetching RSS feed");

        let snapshot = match self.fetch_and_parse().await {
            Ok(feed) => snapshot_from_feed(feed, now),
            Err(e) => FeedSnapshot::failure(format!("Error checking RSS feed: {}", e)),
        };

        match snapshot.error() {
            Some(error) => tracing::error!(url = %self.feed_url, "{}", error),
            None => tracing::info!(
                title = snapshot.title(),
                days = snapshot.days_since_update(),
                "Latest post found"
            ),
        }

        snapshot
    }

    /// Run a check and decide against `threshold_days` in one go.
    pub async fn evaluate(&self, threshold_days: u32) -> (Decision, FeedSnapshot) {
        let snapshot = self.check().await;
        let decision = decision::evaluate(&snapshot, threshold_days);

        match decision {
            Decision::Stale { days } => {
                tracing::warn!("Threshold exceeded: {} days >= {} days", days, threshold_days)
            }
            Decision::Fresh { days } => {
                tracing::info!("No notification needed: {} days < {} days", days, threshold_days)
            }
            Decision::CheckFailed => {}
        }

        (decision, snapshot)
    }

    async fn fetch_and_parse(&self) -> Result<ParsedFeed> {
        let bytes = self.fetcher.fetch(&self.feed_url).await?;
        let feed = parse_feed(&bytes)?;
        if let Some(warning) = &feed.warning {
            tracing::warn!(url = %self.feed_url, "Feed parsing warning: {}", warning);
        }
        Ok(feed)
    }
}

/// Turn a parsed feed into a snapshot, trusting the feed's own ordering.
pub fn snapshot_from_feed(feed: ParsedFeed, now: DateTime<Utc>) -> FeedSnapshot {
    let Some(latest) = feed.entries.into_iter().next() else {
        return FeedSnapshot::failure(NO_ENTRIES);
    };

    let Some(published) = extract_timestamp(&latest.dates) else {
        return FeedSnapshot::failure(NO_DATE);
    };

    FeedSnapshot::success(
        published,
        days_since(published, now),
        latest
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| NO_TITLE.to_string()),
        latest.link.unwrap_or_default(),
    )
}
