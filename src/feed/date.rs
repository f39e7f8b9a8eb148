use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Formats carrying an explicit offset. `%z` accepts both `+0900` and `+09:00`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y/%m/%d %H:%M:%S %z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
];

/// Formats without a zone; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %I:%M%p",
    "%b %d %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M %p",
    "%Y-%m-%d %I:%M %p",
    "%Y/%m/%d %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%b %d, %Y", "%B %d, %Y"];

/// Every date representation an entry offered, structured first.
///
/// The structured values come from the feed parser; the `*_text` values are
/// the raw element text, kept so a date the parser rejected can still be
/// recovered with [`parse_lenient`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDates {
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub published_text: Option<String>,
    pub updated_text: Option<String>,
    pub created_text: Option<String>,
}

/// Pick the entry's timestamp: published, updated, created, then the same
/// three as free text. Returns `None` rather than guessing.
pub fn extract_timestamp(dates: &EntryDates) -> Option<DateTime<Utc>> {
    if let Some(structured) = [dates.published, dates.updated, dates.created]
        .into_iter()
        .flatten()
        .next()
    {
        return Some(structured);
    }

    let text_fields = [
        ("published", &dates.published_text),
        ("updated", &dates.updated_text),
        ("created", &dates.created_text),
    ];

    for (field, text) in text_fields {
        let Some(text) = text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        match parse_lenient(text) {
            Some(parsed) => return Some(parsed),
            None => tracing::warn!(field, value = text, "Could not parse date string"),
        }
    }

    None
}

/// Parse a free-form date string into UTC.
pub fn parse_lenient(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }

    // "... UTC" / "... GMT" / "...Z" carry no offset worth parsing
    let naive_text = ["UTC", "GMT", "Z"]
        .iter()
        .find_map(|suffix| text.strip_suffix(suffix))
        .map(str::trim_end)
        .unwrap_or(text);

    // An unknown zone name like "JST" is dropped and the time read as UTC.
    parse_naive(naive_text).or_else(|| strip_zone_name(naive_text).and_then(parse_naive))
}

fn parse_naive(text: &str) -> Option<DateTime<Utc>> {
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

/// Drop one trailing alphabetic token that is not a meridiem.
fn strip_zone_name(text: &str) -> Option<&str> {
    let (rest, token) = text.rsplit_once(char::is_whitespace)?;
    let is_zone = token.chars().all(|c| c.is_ascii_alphabetic())
        && !token.eq_ignore_ascii_case("am")
        && !token.eq_ignore_ascii_case("pm");
    is_zone.then(|| rest.trim_end())
}

/// Whole days elapsed, floored. 23h59m is 0 days.
pub fn days_since(published: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - published).num_seconds().div_euclid(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn structured_published_wins_over_everything() {
        let dates = EntryDates {
            published: Some(utc(2024, 1, 1, 0, 0, 0)),
            updated: Some(utc(2024, 2, 1, 0, 0, 0)),
            updated_text: Some("2024-03-01T00:00:00Z".into()),
            ..Default::default()
        };
        assert_eq!(extract_timestamp(&dates), Some(utc(2024, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn structured_dates_are_tried_before_text() {
        let dates = EntryDates {
            created: Some(utc(2023, 12, 31, 0, 0, 0)),
            published_text: Some("2024-01-15T10:00:00Z".into()),
            ..Default::default()
        };
        assert_eq!(extract_timestamp(&dates), Some(utc(2023, 12, 31, 0, 0, 0)));
    }

    #[test]
    fn updated_text_with_offset_is_normalized_to_utc() {
        let dates = EntryDates {
            updated_text: Some("2024-01-15T10:00:00+09:00".into()),
            ..Default::default()
        };
        assert_eq!(extract_timestamp(&dates), Some(utc(2024, 1, 15, 1, 0, 0)));
    }

    #[test]
    fn unparseable_text_falls_through_to_next_field() {
        let dates = EntryDates {
            published_text: Some("sometime last week".into()),
            created_text: Some("Mon, 15 Jan 2024 10:00:00 GMT".into()),
            ..Default::default()
        };
        assert_eq!(extract_timestamp(&dates), Some(utc(2024, 1, 15, 10, 0, 0)));
    }

    #[test]
    fn no_usable_date_is_none() {
        let dates = EntryDates {
            published_text: Some("   ".into()),
            updated_text: Some("not a date".into()),
            ..Default::default()
        };
        assert_eq!(extract_timestamp(&dates), None);
        assert_eq!(extract_timestamp(&EntryDates::default()), None);
    }

    #[test]
    fn extraction_is_idempotent() {
        let dates = EntryDates {
            published_text: Some("Tue, 16 Jan 2024 08:30:00 +0900".into()),
            ..Default::default()
        };
        let first = extract_timestamp(&dates);
        let second = extract_timestamp(&dates);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn lenient_parser_handles_common_shapes() {
        let expected = utc(2024, 1, 15, 10, 0, 0);
        for text in [
            "2024-01-15T10:00:00Z",
            "2024-01-15T10:00:00.000+00:00",
            "2024-01-15T19:00:00+0900",
            "2024-01-15 10:00:00",
            "2024-01-15 10:00:00 UTC",
            "2024/01/15 10:00:00",
            "Mon, 15 Jan 2024 10:00:00 +0000",
            "15 Jan 2024 10:00:00 +0000",
            "2024-01-15T10:00",
        ] {
            assert_eq!(parse_lenient(text), Some(expected), "failed on {text}");
        }
    }

    #[test]
    fn unknown_zone_name_is_read_as_utc() {
        let expected = utc(2024, 1, 15, 10, 0, 0);
        assert_eq!(parse_lenient("Mon, 15 Jan 2024 10:00:00 JST"), Some(expected));
        assert_eq!(parse_lenient("2024-01-15 10:00:00 JST"), Some(expected));
        assert_eq!(parse_lenient("2024/01/15 10:00 KST"), Some(expected));
        assert_eq!(parse_lenient("10:00:00 JST"), None);
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(parse_lenient("Jan 15 2024 10:00AM"), Some(utc(2024, 1, 15, 10, 0, 0)));
        assert_eq!(parse_lenient("Jan 15 2024 10:00 PM"), Some(utc(2024, 1, 15, 22, 0, 0)));
        assert_eq!(
            parse_lenient("January 15, 2024 12:30 am"),
            Some(utc(2024, 1, 15, 0, 30, 0))
        );
        assert_eq!(parse_lenient("2024-01-15 09:15 pm JST"), Some(utc(2024, 1, 15, 21, 15, 0)));
    }

    #[test]
    fn date_only_is_midnight_utc() {
        assert_eq!(parse_lenient("2024-01-15"), Some(utc(2024, 1, 15, 0, 0, 0)));
        assert_eq!(parse_lenient("2024/01/15"), Some(utc(2024, 1, 15, 0, 0, 0)));
    }

    #[test]
    fn days_are_truncated_not_rounded() {
        let now = utc(2024, 1, 20, 12, 0, 0);
        let almost_a_day = now - Duration::hours(23) - Duration::minutes(59);
        assert_eq!(days_since(almost_a_day, now), 0);
        assert_eq!(days_since(now - Duration::days(3) - Duration::hours(23), now), 3);
    }

    #[test]
    fn exact_threshold_boundary() {
        let now = utc(2024, 1, 20, 12, 0, 0);
        let threshold = 7;
        let exactly = now - Duration::days(threshold);
        assert_eq!(days_since(exactly, now), threshold);
        let one_second_short = exactly + Duration::seconds(1);
        assert_eq!(days_since(one_second_short, now), threshold - 1);
    }

    #[test]
    fn future_posts_floor_below_zero() {
        let now = utc(2024, 1, 20, 12, 0, 0);
        assert_eq!(days_since(now + Duration::hours(1), now), -1);
    }
}
