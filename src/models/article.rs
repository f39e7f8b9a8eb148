use serde::Serialize;

/// An entry to be created or replaced on the blog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub title: String,
    pub content: String,
    pub categories: Vec<String>,
    pub draft: bool,
}

impl PublishRequest {
    /// New request, posted as a draft unless told otherwise.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            categories: Vec::new(),
            draft: true,
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub success: bool,
    /// `None` when the request never got a response.
    pub status_code: Option<u16>,
    pub article_url: Option<String>,
    pub edit_url: Option<String>,
    pub error: Option<String>,
}

impl PublishResult {
    pub fn created(status_code: u16, article_url: String, edit_url: Option<String>) -> Self {
        Self {
            success: true,
            status_code: Some(status_code),
            article_url: Some(article_url),
            edit_url,
            error: None,
        }
    }

    pub fn rejected(status_code: u16, body: String) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            article_url: None,
            edit_url: None,
            error: Some(body),
        }
    }

    pub fn transport(error: impl ToString) -> Self {
        Self {
            success: false,
            status_code: None,
            article_url: None,
            edit_url: None,
            error: Some(error.to_string()),
        }
    }
}

/// One row of the entry collection listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlogEntry {
    pub title: String,
    pub edit_url: String,
    pub is_draft: bool,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPage {
    pub entries: Vec<BlogEntry>,
    pub next_page: Option<String>,
}

/// Full body of a single member entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub title: String,
    pub content: String,
    pub is_draft: bool,
    pub categories: Vec<String>,
}
