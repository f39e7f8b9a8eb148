use feed_rs::parser;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::Result;

use super::date::EntryDates;

/// The bits of an entry the freshness check looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub dates: EntryDates,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub entries: Vec<FeedEntry>,
    /// Set when the document was broken but entries could still be recovered.
    pub warning: Option<String>,
}

/// Parse an RSS/Atom document, keeping entries in document order.
///
/// `feed-rs` does the real work. The raw scan runs alongside it so that date
/// strings `feed-rs` could not understand are still available as text, and so
/// a document `feed-rs` rejects outright can still yield the entries that
/// came before the damage.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let scan = scan_entries(bytes);

    match parser::parse(bytes) {
        Ok(feed) => {
            let mut raw_entries = scan.entries.into_iter();
            let entries = feed
                .entries
                .into_iter()
                .map(|entry| {
                    let raw = raw_entries.next().unwrap_or_default();
                    FeedEntry {
                        title: entry.title.map(|t| t.content).or(raw.title),
                        link: entry.links.first().map(|l| l.href.clone()).or(raw.link),
                        dates: EntryDates {
                            published: entry.published,
                            updated: entry.updated,
                            created: None,
                            published_text: raw.published,
                            updated_text: raw.updated,
                            created_text: raw.created,
                        },
                    }
                })
                .collect();

            Ok(ParsedFeed {
                entries,
                warning: scan.error,
            })
        }
        Err(err) if !scan.entries.is_empty() => Ok(ParsedFeed {
            entries: scan.entries.into_iter().map(RawEntry::into_entry).collect(),
            warning: Some(err.to_string()),
        }),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    created: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> FeedEntry {
        FeedEntry {
            title: self.title,
            link: self.link,
            dates: EntryDates {
                published_text: self.published,
                updated_text: self.updated,
                created_text: self.created,
                ..Default::default()
            },
        }
    }

    fn slot(&mut self, field: RawField) -> &mut Option<String> {
        match field {
            RawField::Title => &mut self.title,
            RawField::Link => &mut self.link,
            RawField::Published => &mut self.published,
            RawField::Updated => &mut self.updated,
            RawField::Created => &mut self.created,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RawField {
    Title,
    Link,
    Published,
    Updated,
    Created,
}

impl RawField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"published" | b"pubDate" | b"issued" | b"date" => Some(Self::Published),
            b"updated" | b"modified" | b"lastBuildDate" => Some(Self::Updated),
            b"created" => Some(Self::Created),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawScan {
    entries: Vec<RawEntry>,
    error: Option<String>,
}

/// Walk `<item>`/`<entry>` elements with a forgiving reader, stopping at the
/// first syntax error but keeping everything read up to that point.
fn scan_entries(bytes: &[u8]) -> RawScan {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut scan = RawScan::default();
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut current: Option<(usize, RawEntry)> = None;
    let mut capture: Option<(RawField, String)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                if current.is_none() {
                    if is_entry(name.as_ref()) {
                        current = Some((depth, RawEntry::default()));
                    }
                } else if let Some((entry_depth, entry)) = &mut current {
                    if depth == *entry_depth + 1 {
                        if let Some(field) = RawField::from_local_name(name.as_ref()) {
                            if matches!(field, RawField::Link) {
                                take_link_href(&e, entry);
                            }
                            if entry.slot(field).is_none() {
                                capture = Some((field, String::new()));
                            }
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some((entry_depth, entry)) = &mut current {
                    if depth == *entry_depth && e.local_name().as_ref() == b"link" {
                        take_link_href(&e, entry);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some((_, text)) = &mut capture {
                    match e.unescape() {
                        Ok(unescaped) => text.push_str(&unescaped),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, text)) = &mut capture {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                if let Some((field, text)) = capture.take() {
                    if let Some((_, entry)) = &mut current {
                        let text = text.trim();
                        if !text.is_empty() {
                            entry.slot(field).get_or_insert_with(|| text.to_string());
                        }
                    }
                }
                if let Some((entry_depth, _)) = &current {
                    if depth == *entry_depth && is_entry(e.local_name().as_ref()) {
                        if let Some((_, entry)) = current.take() {
                            scan.entries.push(entry);
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                scan.error = Some(err.to_string());
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    // A document cut off mid-entry still counts
    if let Some((_, entry)) = current.take() {
        scan.entries.push(entry);
    }

    scan
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

fn take_link_href(e: &BytesStart<'_>, entry: &mut RawEntry) {
    if entry.link.is_some() {
        return;
    }
    let mut href = None;
    let mut alternate = true;
    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" => alternate = value == "alternate",
            _ => {}
        }
    }
    if alternate {
        entry.link = href;
    }
}
