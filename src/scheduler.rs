use std::future::Future;

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::Result;

/// Next instant, strictly after `now`, at which the wall clock in `tz` reads
/// `time_of_day`. A time skipped by a DST jump fires at the first valid
/// minute after it; a repeated time fires on its first occurrence.
pub fn next_run(now: DateTime<Utc>, time_of_day: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();

    let mut day = today;
    loop {
        let candidate = resolve_local(day.and_time(time_of_day), tz);
        if candidate > now {
            return candidate;
        }
        day = match day.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => return now + Duration::days(1),
        };
    }
}

fn resolve_local(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    let mut local = local;
    loop {
        match tz.from_local_datetime(&local) {
            LocalResult::Single(at) => return at.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => local += Duration::minutes(1),
        }
    }
}

/// Run `job` every day at `time_of_day` in `tz` until Ctrl-C. A failed run is
/// logged and the loop keeps going.
pub async fn run_daily<F, Fut>(time_of_day: NaiveTime, tz: Tz, mut job: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    loop {
        let now = Utc::now();
        let next = next_run(now, time_of_day, tz);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(
            next_run = %next.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
            "Waiting for next scheduled check"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                if let Err(e) = job().await {
                    tracing::error!("Scheduled run failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, stopping scheduler");
                return Ok(());
            }
        }
    }
}
