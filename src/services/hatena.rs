use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::error::{AppError, Result};
use crate::models::{ArticleContent, EntryPage, PublishRequest, PublishResult};

use super::atom::{self, CONTENT_TYPE};
use super::wsse::{WsseCredentials, HEADER_NAME};

pub const DEFAULT_HOST: &str = "blog.hatena.ne.jp";

/// Who we post as and where.
#[derive(Debug, Clone)]
pub struct HatenaAccount {
    pub hatena_id: String,
    pub blog_id: String,
    pub api_key: String,
    pub host: String,
}

/// Why a GET against the API gave no usable document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response body: {0}")]
    Malformed(String),
}

impl FetchError {
    /// The result a write would report had it failed the same way.
    fn into_publish_result(self) -> PublishResult {
        match self {
            FetchError::Transport(error) => PublishResult::transport(error),
            FetchError::Status { status, body } => PublishResult::rejected(status, body),
            malformed @ FetchError::Malformed(_) => PublishResult {
                error: Some(malformed.to_string()),
                ..PublishResult::rejected(StatusCode::OK.as_u16(), String::new())
            },
        }
    }
}

/// AtomPub client for one blog. Every call is a single attempt and every
/// failure comes back as a value.
pub struct HatenaClient {
    client: Client,
    credentials: WsseCredentials,
    hatena_id: String,
    blog_id: String,
    host: String,
    endpoint: String,
}

impl HatenaClient {
    pub fn new(account: HatenaAccount) -> Result<Self> {
        if account.hatena_id.is_empty() || account.blog_id.is_empty() || account.api_key.is_empty() {
            return Err(AppError::HatenaApi(
                "hatena_id, blog_id, and api_key are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let endpoint = format!(
            "https://{}/{}/{}/atom",
            account.host, account.hatena_id, account.blog_id
        );
        tracing::info!(blog_id = %account.blog_id, "Hatena Blog API initialized");

        Ok(Self {
            client,
            credentials: WsseCredentials::new(account.hatena_id.clone(), account.api_key),
            hatena_id: account.hatena_id,
            blog_id: account.blog_id,
            host: account.host,
            endpoint,
        })
    }

    /// Point the API calls somewhere else (local test servers, proxies).
    /// Article URLs keep using the account's host.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn collection_url(&self) -> String {
        format!("{}/entry", self.endpoint)
    }

    /// Dashboard page for the blog. Built from the account, never from the
    /// entry id in a response.
    pub fn article_url(&self) -> String {
        format!("https://{}/{}/{}/", self.host, self.hatena_id, self.blog_id)
    }

    pub async fn post_article(&self, request: &PublishRequest) -> PublishResult {
        tracing::info!(title = %request.title, draft = request.draft, "Posting article");

        let response = self
            .client
            .post(self.collection_url())
            .header(HEADER_NAME, self.credentials.header())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(atom::build_entry_xml(request))
            .send()
            .await;

        let result = match response {
            Ok(response) => self.created_result(response).await,
            Err(e) => PublishResult::transport(e),
        };

        log_result("post", &result);
        result
    }

    /// Replace an entry in place (title, body, categories, draft flag).
    pub async fn update_article(&self, edit_url: &str, request: &PublishRequest) -> PublishResult {
        tracing::info!(title = %request.title, edit_url, "Updating article");

        let response = self
            .client
            .put(edit_url)
            .header(HEADER_NAME, self.credentials.header())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(atom::build_entry_xml(request))
            .send()
            .await;

        let result = match response {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(_) if status == StatusCode::OK => {
                        PublishResult::created(status.as_u16(), self.article_url(), Some(edit_url.to_string()))
                    }
                    Ok(body) => PublishResult::rejected(status.as_u16(), body),
                    Err(e) => PublishResult::transport(e),
                }
            }
            Err(e) => PublishResult::transport(e),
        };

        log_result("update", &result);
        result
    }

    /// One page of the entry collection. Pass the previous page's `next_page`
    /// to continue.
    pub async fn list_entries(&self, page: Option<&str>) -> std::result::Result<EntryPage, String> {
        let url = page.map(str::to_string).unwrap_or_else(|| self.collection_url());
        let body = self.get_xml(&url).await.map_err(|e| {
            tracing::error!("Failed to get entries: {}", e);
            e.to_string()
        })?;
        atom::parse_collection(body.as_bytes()).map_err(|e| e.to_string())
    }

    pub async fn get_article(&self, edit_url: &str) -> std::result::Result<ArticleContent, FetchError> {
        let body = self.get_xml(edit_url).await.map_err(|e| {
            tracing::error!("Failed to get article: {}", e);
            e
        })?;
        atom::parse_entry(body.as_bytes())
            .map(ArticleContent::from)
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }

    /// Fetch an entry, swap its categories, and put it back unchanged otherwise.
    pub async fn update_categories(&self, edit_url: &str, categories: Vec<String>) -> PublishResult {
        let article = match self.get_article(edit_url).await {
            Ok(article) => article,
            Err(e) => {
                let result = e.into_publish_result();
                log_result("retag", &result);
                return result;
            }
        };
        let request = PublishRequest::new(article.title, article.content)
            .with_categories(categories)
            .with_draft(article.is_draft);
        self.update_article(edit_url, &request).await
    }

    pub async fn test_connection(&self) -> bool {
        tracing::info!("Testing Hatena Blog API connection");
        match self.get_xml(&self.collection_url()).await {
            Ok(_) => {
                tracing::info!("API connection successful");
                true
            }
            Err(e) => {
                tracing::error!("API connection failed: {}", e);
                false
            }
        }
    }

    async fn created_result(&self, response: reqwest::Response) -> PublishResult {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return PublishResult::transport(e),
        };

        if status != StatusCode::CREATED {
            return PublishResult::rejected(status.as_u16(), body);
        }

        match atom::parse_entry(body.as_bytes()) {
            Ok(entry) => {
                tracing::debug!(id = entry.id.as_deref(), "Entry created");
                PublishResult::created(status.as_u16(), self.article_url(), entry.edit_url)
            }
            Err(e) => PublishResult {
                error: Some(format!("Malformed response body: {}", e)),
                ..PublishResult::rejected(status.as_u16(), String::new())
            },
        }
    }

    async fn get_xml(&self, url: &str) -> std::result::Result<String, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport(e.to_string());
        let response = self
            .client
            .get(url)
            .header(HEADER_NAME, self.credentials.header())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if status == StatusCode::OK {
            Ok(body)
        } else {
            Err(FetchError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn log_result(action: &str, result: &PublishResult) {
    if result.success {
        tracing::info!(action, url = result.article_url.as_deref(), "Article {} succeeded", action);
    } else {
        tracing::error!(
            action,
            status = result.status_code,
            "Article {} failed: {}",
            action,
            result.error.as_deref().unwrap_or_default()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use std::sync::{Arc, Mutex};

    const CREATED_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app">
  <id>tag:blog.hatena.ne.jp,2013:blog-abc-1-99</id>
  <link rel="edit" href="https://blog.example.ne.jp/abc/abc.example.blog/atom/entry/99"/>
  <title>whatever the server says</title>
  <content type="text/x-markdown">x</content>
</entry>"#;

    fn account() -> HatenaAccount {
        HatenaAccount {
            hatena_id: "abc".into(),
            blog_id: "abc.example.blog".into(),
            api_key: "secret".into(),
            host: "blog.example.ne.jp".into(),
        }
    }

    #[derive(Clone, Default)]
    struct Seen {
        wsse: Arc<Mutex<Option<String>>>,
        content_type: Arc<Mutex<Option<String>>>,
        body: Arc<Mutex<Option<String>>>,
    }

    async fn record(
        State(seen): State<Seen>,
        headers: HeaderMap,
        body: String,
    ) -> (StatusCode, &'static str) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        *seen.wsse.lock().unwrap() = header("x-wsse");
        *seen.content_type.lock().unwrap() = header("content-type");
        *seen.body.lock().unwrap() = Some(body);
        (StatusCode::CREATED, CREATED_BODY)
    }

    fn client_for(base: &str) -> HatenaClient {
        HatenaClient::new(account())
            .unwrap()
            .with_endpoint(format!("{base}/abc/abc.example.blog/atom"))
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let mut incomplete = account();
        incomplete.api_key.clear();
        assert!(HatenaClient::new(incomplete).is_err());
    }

    #[test]
    fn default_endpoint_follows_account() {
        let client = HatenaClient::new(account()).unwrap();
        assert_eq!(
            client.collection_url(),
            "https://blog.example.ne.jp/abc/abc.example.blog/atom/entry"
        );
    }

    #[tokio::test]
    async fn created_entry_yields_dashboard_url() {
        let seen = Seen::default();
        let app = Router::new()
            .route("/abc/abc.example.blog/atom/entry", post(record))
            .with_state(seen.clone());
        let base = serve(app).await;

        let request = PublishRequest::new("A & B", "body").with_categories(vec!["Rust".into()]);
        let result = client_for(&base).post_article(&request).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.status_code, Some(201));
        assert_eq!(
            result.article_url.as_deref(),
            Some("https://blog.example.ne.jp/abc/abc.example.blog/")
        );
        assert_eq!(
            result.edit_url.as_deref(),
            Some("https://blog.example.ne.jp/abc/abc.example.blog/atom/entry/99")
        );

        let wsse = seen.wsse.lock().unwrap().clone().unwrap();
        assert!(wsse.starts_with(r#"UsernameToken Username="abc", PasswordDigest=""#));
        assert_eq!(
            seen.content_type.lock().unwrap().as_deref(),
            Some("application/xml; charset=utf-8")
        );
        let body = seen.body.lock().unwrap().clone().unwrap();
        assert!(body.contains("<title>A &amp; B</title>"));
        assert!(body.contains("<app:draft>yes</app:draft>"));
    }

    #[tokio::test]
    async fn rejected_post_returns_body_verbatim() {
        let app = Router::new().route(
            "/abc/abc.example.blog/atom/entry",
            post(|| async { (StatusCode::UNAUTHORIZED, "WSSE authentication failed") }),
        );
        let base = serve(app).await;

        let result = client_for(&base)
            .post_article(&PublishRequest::new("t", "c"))
            .await;
        assert!(!result.success);
        assert_eq!(result.status_code, Some(401));
        assert_eq!(result.error.as_deref(), Some("WSSE authentication failed"));
        assert!(result.article_url.is_none());
    }

    #[tokio::test]
    async fn ok_instead_of_created_is_a_failure() {
        let app = Router::new().route(
            "/abc/abc.example.blog/atom/entry",
            post(|| async { (StatusCode::OK, CREATED_BODY) }),
        );
        let base = serve(app).await;

        let result = client_for(&base)
            .post_article(&PublishRequest::new("t", "c"))
            .await;
        assert!(!result.success);
        assert_eq!(result.status_code, Some(200));
    }

    #[tokio::test]
    async fn malformed_created_body_is_a_failure() {
        let app = Router::new().route(
            "/abc/abc.example.blog/atom/entry",
            post(|| async { (StatusCode::CREATED, "<entry><title>oops") }),
        );
        let base = serve(app).await;

        let result = client_for(&base)
            .post_article(&PublishRequest::new("t", "c"))
            .await;
        assert!(!result.success);
        assert_eq!(result.status_code, Some(201));
        assert!(result.error.unwrap().starts_with("Malformed response body"));
    }

    #[tokio::test]
    async fn connection_errors_are_captured() {
        let client = HatenaClient::new(account())
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/atom");
        let result = client.post_article(&PublishRequest::new("t", "c")).await;
        assert!(!result.success);
        assert!(result.status_code.is_none());
        assert!(result.error.is_some());
        assert!(!client.test_connection().await);
    }

    #[tokio::test]
    async fn lists_entries_and_follows_next_page() {
        let app = Router::new().route(
            "/abc/abc.example.blog/atom/entry",
            get(|| async {
                r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app">
  <link rel="next" href="http://next.example/page2"/>
  <entry><title>Draft one</title><link rel="edit" href="http://edit/1"/>
    <app:control><app:draft>yes</app:draft></app:control></entry>
</feed>"#
            }),
        );
        let base = serve(app).await;
        let client = client_for(&base);

        let page = client.list_entries(None).await.unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].title, "Draft one");
        assert!(page.entries[0].is_draft);
        assert_eq!(page.next_page.as_deref(), Some("http://next.example/page2"));
        assert!(client.test_connection().await);
    }

    #[tokio::test]
    async fn update_categories_keeps_title_body_and_draft() {
        let seen = Seen::default();
        let entry_path = "/abc/abc.example.blog/atom/entry/7";
        let app = Router::new()
            .route(
                entry_path,
                get(|| async {
                    r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app">
  <title>Keep me</title><content type="text/x-markdown">Body &amp; soul</content>
  <category term="Old"/><app:control><app:draft>no</app:draft></app:control></entry>"#
                })
                .put(|State(seen): State<Seen>, body: String| async move {
                    *seen.body.lock().unwrap() = Some(body);
                    StatusCode::OK
                }),
            )
            .with_state(seen.clone());
        let base = serve(app).await;
        let client = client_for(&base);
        let edit_url = format!("{base}{entry_path}");

        let result = client
            .update_categories(&edit_url, vec!["New".into(), "Tags".into()])
            .await;
        assert!(result.success, "{:?}", result.error);

        let sent = seen.body.lock().unwrap().clone().unwrap();
        let entry = atom::parse_entry(sent.as_bytes()).unwrap();
        assert_eq!(entry.title, "Keep me");
        assert_eq!(entry.content, "Body & soul");
        assert_eq!(entry.categories, vec!["New".to_string(), "Tags".to_string()]);
        assert!(!entry.is_draft);
    }

    #[tokio::test]
    async fn retag_of_missing_entry_keeps_http_status() {
        let app = Router::new().route(
            "/abc/abc.example.blog/atom/entry/404",
            get(|| async { (StatusCode::NOT_FOUND, "Entry not found") }),
        );
        let base = serve(app).await;
        let client = client_for(&base);
        let edit_url = format!("{base}/abc/abc.example.blog/atom/entry/404");

        assert_eq!(
            client.get_article(&edit_url).await.unwrap_err(),
            FetchError::Status {
                status: 404,
                body: "Entry not found".into()
            }
        );

        let result = client.update_categories(&edit_url, vec!["Tag".into()]).await;
        assert!(!result.success);
        assert_eq!(result.status_code, Some(404));
        assert_eq!(result.error.as_deref(), Some("Entry not found"));
    }

    #[tokio::test]
    async fn retag_of_unparseable_entry_is_malformed() {
        let app = Router::new().route(
            "/abc/abc.example.blog/atom/entry/9",
            get(|| async { "<html>maintenance</html>" }),
        );
        let base = serve(app).await;
        let edit_url = format!("{base}/abc/abc.example.blog/atom/entry/9");

        let result = client_for(&base).update_categories(&edit_url, Vec::new()).await;
        assert!(!result.success);
        assert_eq!(result.status_code, Some(200));
        assert!(result.error.unwrap().starts_with("Malformed response body"));
    }

    #[tokio::test]
    async fn listing_failure_is_reported_as_text() {
        let app = Router::new().route(
            "/abc/abc.example.blog/atom/entry",
            get(|| async { (StatusCode::FORBIDDEN, "nope") }),
        );
        let base = serve(app).await;
        let error = client_for(&base).list_entries(None).await.unwrap_err();
        assert!(error.contains("403"), "{error}");
        assert!(error.contains("nope"), "{error}");
    }
}
