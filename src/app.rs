use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;

use crate::ai::prompts::truncate_chars;
use crate::ai::Suggester;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::feed::{evaluate, Decision, FeedChecker};
use crate::models::{EntryPage, FeedSnapshot, PublishRequest, PublishResult, TopicSuggestion};
use crate::scheduler;
use crate::selection::PendingSelections;
use crate::services::discord::NUMBER_EMOJIS;
use crate::services::{DiscordNotifier, HatenaClient};

/// Discord rejects message content longer than this.
const MESSAGE_LIMIT: usize = 2000;
const RECENT_TITLES: usize = 5;
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Everything one run of the command line needs, built once from config.
pub struct App {
    config: Config,
    timezone: Tz,
    checker: FeedChecker,
    notifier: DiscordNotifier,
    suggester: Option<Suggester>,
    hatena: Option<HatenaClient>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let timezone = config.timezone()?;
        let target = config
            .discord_target()
            .ok_or_else(|| AppError::Config("no Discord target configured".to_string()))?;
        let notifier = DiscordNotifier::new(target, timezone)?;
        let checker = FeedChecker::new(config.feed_url())?;

        let suggester = match config.gemini_api_key() {
            Some(key) => Some(Suggester::new(key, config.ai.model.clone())?),
            None => {
                tracing::info!("No Gemini API key configured, AI features disabled");
                None
            }
        };

        let hatena = match config.hatena_account() {
            Some(account) => Some(HatenaClient::new(account)?),
            None => {
                tracing::info!("Hatena Blog API not configured, publishing disabled");
                None
            }
        };

        Ok(Self {
            config,
            timezone,
            checker,
            notifier,
            suggester,
            hatena,
        })
    }

    fn suggester(&self) -> Result<&Suggester> {
        self.suggester
            .as_ref()
            .ok_or_else(|| AppError::Config("AI features need [ai] gemini_api_key".to_string()))
    }

    fn hatena(&self) -> Result<&HatenaClient> {
        self.hatena.as_ref().ok_or_else(|| {
            AppError::Config(
                "publishing needs [blog] api_key and a hatena_id derivable from the blog url"
                    .to_string(),
            )
        })
    }

    /// One freshness check. A failed check is reported on its own, a stale
    /// blog gets the reminder, a fresh one gets nothing.
    pub async fn check_and_notify(&self) -> Result<Decision> {
        let threshold = self.config.threshold_days();
        let (decision, snapshot) = self.checker.evaluate(threshold).await;

        match decision {
            Decision::CheckFailed => {
                let error = snapshot.error().unwrap_or("unknown error");
                self.notifier
                    .send_check_failure(self.checker.feed_url(), error)
                    .await?;
            }
            Decision::Stale { days } => {
                tracing::info!(days, "Sending update reminder");
                self.notifier
                    .send_reminder(&snapshot, self.suggester.is_some())
                    .await?;
            }
            Decision::Fresh { days } => {
                tracing::info!(days, "Blog is up to date");
            }
        }

        Ok(decision)
    }

    /// Check and always post the result, stale or not.
    pub async fn status(&self) -> Result<FeedSnapshot> {
        let threshold = self.config.threshold_days();
        let snapshot = self.checker.check().await;

        match evaluate(&snapshot, threshold) {
            Decision::CheckFailed => {
                let error = snapshot.error().unwrap_or("unknown error");
                self.notifier
                    .send_check_failure(self.checker.feed_url(), error)
                    .await?;
            }
            decision => {
                self.notifier
                    .send_status(&snapshot, threshold, decision.should_notify())
                    .await?;
            }
        }

        Ok(snapshot)
    }

    pub async fn run_scheduled(&self) -> Result<()> {
        let time = self.config.notification_time()?;
        tracing::info!(
            time = %time.format("%H:%M"),
            timezone = %self.timezone,
            threshold = self.config.threshold_days(),
            "Scheduler started"
        );
        scheduler::run_daily(time, self.timezone, move || async move {
            self.check_and_notify().await.map(|_| ())
        })
        .await
    }

    /// Exercise every configured integration and report what works.
    pub async fn test_setup(&self) -> Vec<(&'static str, std::result::Result<String, String>)> {
        let mut report = Vec::new();

        let snapshot = self.checker.check().await;
        report.push((
            "RSS feed",
            match snapshot.error() {
                None => Ok(format!(
                    "{} ({} days ago)",
                    snapshot.title(),
                    snapshot.days_since_update().unwrap_or_default()
                )),
                Some(error) => Err(error.to_string()),
            },
        ));

        report.push((
            "Discord",
            self.notifier
                .send_test_message()
                .await
                .map(|_| format!("test message sent via {}", self.notifier.target().label()))
                .map_err(|e| e.to_string()),
        ));

        report.push((
            "Gemini",
            match &self.suggester {
                Some(suggester) => Ok(format!("configured ({})", suggester.model())),
                None => Err("not configured".to_string()),
            },
        ));

        let hatena = match &self.hatena {
            Some(hatena) => {
                if hatena.test_connection().await {
                    Ok(format!("connected ({})", hatena.collection_url()))
                } else {
                    Err("connection failed".to_string())
                }
            }
            None => Err("not configured".to_string()),
        };
        report.push(("Hatena Blog", hatena));

        report
    }

    /// Titles of the latest posts, used to steer suggestions away from repeats.
    async fn recent_titles(&self) -> Vec<String> {
        if let Some(hatena) = &self.hatena {
            match hatena.list_entries(None).await {
                Ok(page) => {
                    return page
                        .entries
                        .into_iter()
                        .take(RECENT_TITLES)
                        .map(|e| e.title)
                        .collect()
                }
                Err(e) => tracing::warn!("Could not list recent entries: {}", e),
            }
        }

        let snapshot = self.checker.check().await;
        snapshot.latest_title().map(str::to_string).into_iter().collect()
    }

    pub async fn suggest(&self, theme: Option<&str>, count: usize) -> Result<Vec<TopicSuggestion>> {
        let suggester = self.suggester()?;
        match theme {
            Some(theme) => suggester.suggest_with_theme(theme, count).await,
            None => {
                let recent = self.recent_titles().await;
                suggester.suggest_topics(count, &recent).await
            }
        }
    }

    /// Post suggestions, wait for someone to react with a number, then draft
    /// an outline for the chosen topic. `None` when nobody picked in time.
    pub async fn suggest_interactive(
        &self,
        theme: Option<&str>,
        count: usize,
    ) -> Result<Option<(TopicSuggestion, String)>> {
        if !self.notifier.can_read_reactions() {
            return Err(AppError::Config(
                "interactive selection needs [discord] bot_token and channel_id".to_string(),
            ));
        }

        let count = count.clamp(1, NUMBER_EMOJIS.len());
        let suggestions = self.suggest(theme, count).await?;
        let title = match theme {
            Some(theme) => format!("🤖 「{}」のブログテーマ提案", theme),
            None => "🤖 AIによるブログテーマ提案".to_string(),
        };

        let message_id = self
            .notifier
            .send_suggestions(&title, &suggestions)
            .await?
            .ok_or_else(|| AppError::DiscordApi("bot message had no id".to_string()))?;

        let mut selections = PendingSelections::default();
        selections.insert(message_id.clone(), suggestions.clone(), Utc::now());
        if let Some(expires_at) = selections.expires_at(&message_id) {
            tracing::info!(%message_id, %expires_at, "Waiting for a reaction");
        }

        let Some(choice) = self
            .wait_for_choice(&mut selections, &message_id, suggestions.len(), POLL_INTERVAL)
            .await?
        else {
            self.notifier
                .send_text("⏰ 選択の受付時間が終了しました。もう一度 `suggest` を実行してください。")
                .await?;
            return Ok(None);
        };

        self.notifier
            .send_text(&format!(
                "✅ 「{}」が選択されました。アウトラインを生成中...",
                choice.title
            ))
            .await?;

        let outline = self.suggester()?.generate_outline(&choice.title).await?;

        match &self.hatena {
            Some(hatena) => {
                let result = hatena
                    .post_article(&PublishRequest::new(choice.title.clone(), outline.clone()))
                    .await;
                self.notifier.send_text(&publish_message(&result)).await?;
            }
            None => {
                self.notifier
                    .send_text(truncate_chars(&outline, MESSAGE_LIMIT))
                    .await?;
            }
        }

        Ok(Some((choice, outline)))
    }

    async fn wait_for_choice(
        &self,
        selections: &mut PendingSelections,
        message_id: &str,
        count: usize,
        every: Duration,
    ) -> Result<Option<TopicSuggestion>> {
        loop {
            tokio::time::sleep(every).await;
            let now = Utc::now();
            if !selections.is_pending(message_id, now) {
                selections.purge_expired(now);
                return Ok(None);
            }

            for (index, emoji) in NUMBER_EMOJIS.iter().take(count).enumerate() {
                let users = match self.notifier.reaction_users(message_id, emoji).await {
                    Ok(users) if !users.is_empty() => users,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!(choice = index + 1, "Could not read reactions: {}", e);
                        continue;
                    }
                };
                tracing::info!(choice = index + 1, user = %users[0], "Suggestion picked");
                if let Some(choice) = selections.resolve(message_id, index + 1, now) {
                    return Ok(Some(choice));
                }
            }
        }
    }

    pub async fn outline(&self, title: &str) -> Result<String> {
        self.suggester()?.generate_outline(title).await
    }

    pub async fn section(&self, detail: &str) -> Result<String> {
        self.suggester()?.generate_section(detail).await
    }

    pub async fn ask(&self, question: &str) -> Result<String> {
        self.suggester()?.answer(question).await
    }

    pub async fn review(&self, article: &str) -> Result<String> {
        if article.trim().is_empty() {
            return Err(AppError::Other(anyhow::anyhow!("article is empty")));
        }
        self.suggester()?.review_article(article).await
    }

    pub async fn tags(&self, title: &str, content: &str) -> Result<Vec<String>> {
        self.suggester()?.generate_tags(title, content).await
    }

    pub async fn publish(
        &self,
        title: &str,
        content: &str,
        categories: Vec<String>,
        public: bool,
        auto_tags: bool,
    ) -> Result<PublishResult> {
        let hatena = self.hatena()?;

        let categories = if auto_tags {
            let generated = self.tags(title, content).await?;
            merge_categories(categories, generated)
        } else {
            categories
        };

        let request = PublishRequest::new(title, content)
            .with_categories(categories)
            .with_draft(!public);
        Ok(hatena.post_article(&request).await)
    }

    pub async fn entries(&self, page: Option<&str>) -> Result<EntryPage> {
        self.hatena()?
            .list_entries(page)
            .await
            .map_err(AppError::HatenaApi)
    }

    pub async fn retag(&self, edit_url: &str, categories: Vec<String>) -> Result<PublishResult> {
        Ok(self.hatena()?.update_categories(edit_url, categories).await)
    }
}

/// Keep the user's categories first and drop generated duplicates.
fn merge_categories(mut categories: Vec<String>, generated: Vec<String>) -> Vec<String> {
    for tag in generated {
        if !categories.iter().any(|c| c.eq_ignore_ascii_case(&tag)) {
            categories.push(tag);
        }
    }
    categories
}

fn publish_message(result: &PublishResult) -> String {
    if result.success {
        format!(
            "📝 下書きを投稿しました: {}",
            result.article_url.as_deref().unwrap_or_default()
        )
    } else {
        format!(
            "❌ 下書きの投稿に失敗しました: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::Duration as ChronoDuration;
    use std::sync::{Arc, Mutex};

    type Posts = Arc<Mutex<Vec<serde_json::Value>>>;

    fn rss(pub_date: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Blog</title>
<item><title>Latest</title><link>https://example.hateblo.jp/entry/1</link><pubDate>{pub_date}</pubDate></item>
</channel></rss>"#
        )
    }

    async fn world(feed: Option<String>) -> (Config, Posts) {
        let posts: Posts = Arc::default();
        let mut app = Router::new().route(
            "/hook",
            post(|State(posts): State<Posts>, Json(body): Json<serde_json::Value>| async move {
                posts.lock().unwrap().push(body);
                StatusCode::NO_CONTENT
            }),
        );
        app = match feed {
            Some(feed) => app.route("/rss", get(move || async move { feed })),
            None => app.route("/rss", get(|| async { StatusCode::NOT_FOUND })),
        };
        let base = serve(app.with_state(posts.clone())).await;

        let config = Config::parse(&format!(
            r#"
[blog]
url = "https://example.hateblo.jp/"
rss_feed_url = "{base}/rss"

[discord]
webhook_url = "{base}/hook"

[notification]
threshold_days = 7
"#
        ))
        .unwrap();
        (config, posts)
    }

    fn days_ago(days: i64) -> String {
        (Utc::now() - ChronoDuration::days(days) - ChronoDuration::hours(1)).to_rfc2822()
    }

    #[tokio::test]
    async fn stale_blog_gets_a_reminder() {
        let (config, posts) = world(Some(rss(&days_ago(10)))).await;
        let app = App::new(config).unwrap();

        let decision = app.check_and_notify().await.unwrap();
        assert_eq!(decision, Decision::Stale { days: 10 });

        let posts = posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["embeds"][0]["title"], "⚠️ ブログ更新リマインダー");
    }

    #[tokio::test]
    async fn fresh_blog_stays_quiet() {
        let (config, posts) = world(Some(rss(&days_ago(2)))).await;
        let app = App::new(config).unwrap();

        assert_eq!(app.check_and_notify().await.unwrap(), Decision::Fresh { days: 2 });
        assert!(posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_check_reports_feed_url() {
        let (config, posts) = world(None).await;
        let feed_url = config.feed_url().to_string();
        let app = App::new(config).unwrap();

        assert_eq!(app.check_and_notify().await.unwrap(), Decision::CheckFailed);

        let posts = posts.lock().unwrap();
        assert_eq!(posts.len(), 1);
        let content = posts[0]["content"].as_str().unwrap();
        assert!(content.contains(&feed_url), "{content}");
    }

    #[tokio::test]
    async fn status_always_posts() {
        let (config, posts) = world(Some(rss(&days_ago(1)))).await;
        let app = App::new(config).unwrap();

        let snapshot = app.status().await.unwrap();
        assert!(snapshot.is_success());

        let posts = posts.lock().unwrap();
        assert_eq!(posts[0]["embeds"][0]["title"], "📊 ブログ更新状況");
    }

    #[tokio::test]
    async fn failed_reaction_poll_keeps_waiting() {
        let calls = Arc::new(Mutex::new(0u32));
        let base = serve(
            Router::new()
                .route(
                    "/channels/42/messages/1001/reactions/:emoji",
                    get(|State(calls): State<Arc<Mutex<u32>>>| async move {
                        let mut calls = calls.lock().unwrap();
                        *calls += 1;
                        if *calls == 1 {
                            (StatusCode::TOO_MANY_REQUESTS, "slow down".to_string())
                        } else {
                            (StatusCode::OK, r#"[{"id":"7"}]"#.to_string())
                        }
                    }),
                )
                .with_state(calls.clone()),
        )
        .await;

        let (config, _) = world(Some(rss(&days_ago(1)))).await;
        let mut app = App::new(config).unwrap();
        app.notifier = DiscordNotifier::new(
            crate::services::DiscordTarget::Bot {
                token: "token".into(),
                channel_id: "42".into(),
            },
            chrono_tz::UTC,
        )
        .unwrap()
        .with_api_base(base);

        let suggestions: Vec<TopicSuggestion> = ["A", "B", "C"]
            .iter()
            .map(|t| TopicSuggestion {
                title: t.to_string(),
                summary: None,
            })
            .collect();
        let mut selections = PendingSelections::default();
        selections.insert("1001", suggestions, Utc::now());

        let picked = app
            .wait_for_choice(&mut selections, "1001", 3, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(picked.map(|s| s.title).as_deref(), Some("B"));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn missing_integrations_are_config_errors() {
        let (config, _) = world(Some(rss(&days_ago(1)))).await;
        let app = App::new(config).unwrap();

        assert!(matches!(app.outline("t").await, Err(AppError::Config(_))));
        assert!(matches!(
            app.publish("t", "c", Vec::new(), false, false).await,
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            app.suggest_interactive(None, 3).await,
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = Config::parse("[blog]\nurl = \"\"\n").unwrap();
        assert!(matches!(App::new(config), Err(AppError::Config(_))));
    }

    #[test]
    fn merged_categories_keep_user_order() {
        let merged = merge_categories(
            vec!["Rust".into(), "Blog".into()],
            vec!["rust".into(), "tokio".into()],
        );
        assert_eq!(merged, vec!["Rust", "Blog", "tokio"]);
    }

    #[test]
    fn publish_message_reports_outcome() {
        let ok = PublishResult::created(201, "https://blog.hatena.ne.jp/a/b/".into(), None);
        assert!(publish_message(&ok).contains("https://blog.hatena.ne.jp/a/b/"));
        let failed = PublishResult::rejected(401, "Unauthorized".into());
        assert!(publish_message(&failed).contains("Unauthorized"));
    }
}
