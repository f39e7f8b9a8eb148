//! Atom entry documents as spoken by the Hatena Blog AtomPub endpoint.

use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{AppError, Result};
use crate::models::{ArticleContent, BlogEntry, EntryPage, PublishRequest};

pub const CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const MARKDOWN_TYPE: &str = "text/x-markdown";

/// Serialize a request into an `<entry>` document. Every piece of user text
/// is escaped, attribute values included.
pub fn build_entry_xml(request: &PublishRequest) -> String {
    let mut categories = String::new();
    for category in &request.categories {
        // infallible for String
        let _ = writeln!(categories, r#"  <category term="{}" />"#, escape(category.as_str()));
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<entry xmlns="http://www.w3.org/2005/Atom"
       xmlns:app="http://www.w3.org/2007/app">
  <title>{title}</title>
  <content type="{content_type}">{content}</content>
{categories}  <app:control>
    <app:draft>{draft}</app:draft>
  </app:control>
</entry>"#,
        title = escape(request.title.as_str()),
        content_type = MARKDOWN_TYPE,
        content = escape(request.content.as_str()),
        categories = categories,
        draft = if request.draft { "yes" } else { "no" },
    )
}

/// One `<entry>` as read back from the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomEntry {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub categories: Vec<String>,
    pub is_draft: bool,
    pub edit_url: Option<String>,
}

impl From<AtomEntry> for BlogEntry {
    fn from(entry: AtomEntry) -> Self {
        BlogEntry {
            title: entry.title,
            edit_url: entry.edit_url.unwrap_or_default(),
            is_draft: entry.is_draft,
            categories: entry.categories,
        }
    }
}

impl From<AtomEntry> for ArticleContent {
    fn from(entry: AtomEntry) -> Self {
        ArticleContent {
            title: entry.title,
            content: entry.content,
            is_draft: entry.is_draft,
            categories: entry.categories,
        }
    }
}

/// Parse a member resource whose root element is `<entry>`.
pub fn parse_entry(xml: &[u8]) -> Result<AtomEntry> {
    let document = read_document(xml)?;
    if !document.root_is_entry {
        return Err(AppError::Xml("expected an Atom <entry> document".into()));
    }
    document
        .entries
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Xml("entry document had no entry".into()))
}

/// Parse a collection page: its entries plus the `rel="next"` link.
pub fn parse_collection(xml: &[u8]) -> Result<EntryPage> {
    let document = read_document(xml)?;
    Ok(EntryPage {
        entries: document.entries.into_iter().map(BlogEntry::from).collect(),
        next_page: document.next_page,
    })
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Title,
    Content,
    Draft,
}

#[derive(Default)]
struct Document {
    root_is_entry: bool,
    entries: Vec<AtomEntry>,
    next_page: Option<String>,
}

#[derive(Default)]
struct State {
    document: Document,
    current: Option<(usize, AtomEntry)>,
    capture: Option<(Field, String)>,
}

impl State {
    /// `depth` is the number of open ancestors of `e`.
    fn open(&mut self, e: &BytesStart<'_>, depth: usize, parent: Option<&[u8]>, is_start: bool) {
        let name = e.local_name();
        let name = name.as_ref();

        if depth == 0 {
            self.document.root_is_entry = name == b"entry";
        }

        if self.current.is_none() {
            match name {
                b"entry" if is_start => self.current = Some((depth, AtomEntry::default())),
                b"link" if attr(e, b"rel").as_deref() == Some("next") => {
                    self.document.next_page = attr(e, b"href");
                }
                _ => {}
            }
            return;
        }
        let Some((entry_depth, entry)) = &mut self.current else {
            return;
        };

        if depth == *entry_depth + 1 {
            match name {
                b"category" => entry.categories.extend(attr(e, b"term")),
                b"link" if attr(e, b"rel").as_deref() == Some("edit") => {
                    entry.edit_url = attr(e, b"href");
                }
                b"id" if is_start => self.capture = Some((Field::Id, String::new())),
                b"title" if is_start => self.capture = Some((Field::Title, String::new())),
                b"content" if is_start => self.capture = Some((Field::Content, String::new())),
                _ => {}
            }
        } else if name == b"draft" && parent == Some(b"control".as_slice()) && is_start {
            self.capture = Some((Field::Draft, String::new()));
        }
    }

    fn close(&mut self, depth: usize) {
        if let Some((field, text)) = self.capture.take() {
            if let Some((_, entry)) = &mut self.current {
                match field {
                    Field::Id => entry.id = Some(text.trim().to_string()),
                    Field::Title => entry.title = text,
                    Field::Content => entry.content = text,
                    Field::Draft => entry.is_draft = text.trim() == "yes",
                }
            }
        }

        if matches!(&self.current, Some((entry_depth, _)) if *entry_depth == depth) {
            if let Some((_, entry)) = self.current.take() {
                self.document.entries.push(entry);
            }
        }
    }
}

fn read_document(xml: &[u8]) -> Result<Document> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut state = State::default();
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                saw_root = true;
                state.open(&e, path.len(), path.last().map(Vec::as_slice), true);
                path.push(e.local_name().as_ref().to_vec());
            }
            Event::Empty(e) => {
                saw_root = true;
                state.open(&e, path.len(), path.last().map(Vec::as_slice), false);
            }
            Event::Text(e) => {
                if let Some((_, text)) = &mut state.capture {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = &mut state.capture {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(_) => {
                path.pop();
                state.close(path.len());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(AppError::Xml("empty document".into()));
    }
    if !path.is_empty() {
        return Err(AppError::Xml("document ended before all elements were closed".into()));
    }

    Ok(state.document)
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}
