use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::prompts::truncate_chars;
use crate::error::{AppError, Result};
use crate::models::{FeedSnapshot, TopicSuggestion};

pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

const RED: u32 = 0xFF0000;
const ORANGE: u32 = 0xFF9900;
const YELLOW: u32 = 0xFFFF00;
const GREEN: u32 = 0x00FF00;
const PURPLE: u32 = 0x9B59B6;

const FOOTER: &str = "RSS Checker";
const FIELD_NAME_LIMIT: usize = 256;
const FIELD_VALUE_LIMIT: usize = 1024;
const DATE_FORMAT: &str = "%Y年%m月%d日 %H:%M";

/// Keycap digits used to vote on suggestions.
pub const NUMBER_EMOJIS: [&str; 9] = [
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
];

#[derive(Debug, Clone)]
pub enum DiscordTarget {
    Webhook { url: String },
    Bot { token: String, channel_id: String },
}

impl DiscordTarget {
    pub fn label(&self) -> &'static str {
        match self {
            DiscordTarget::Webhook { .. } => "Webhook",
            DiscordTarget::Bot { .. } => "Bot",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmbedFooter {
    pub text: String,
}

impl Embed {
    fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: None,
            color,
            fields: Vec::new(),
            footer: None,
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    embeds: &'a [Embed],
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ReactionUser {
    id: String,
    #[serde(default)]
    bot: bool,
}

/// Embed for the scheduled "you haven't posted in a while" nag.
pub fn reminder_embed(snapshot: &FeedSnapshot, tz: Tz, ai_enabled: bool) -> Embed {
    let days = snapshot.days_since_update().unwrap_or_default();
    let color = match days {
        d if d >= 14 => RED,
        d if d >= 7 => ORANGE,
        _ => YELLOW,
    };

    let mut embed = Embed::new("⚠️ ブログ更新リマインダー", color)
        .description(format!("ブログが **{}日間** 更新されていません！", days))
        .field("📝 最新記事", post_link(snapshot), false)
        .field("📅 最終更新日", local_date(snapshot, tz), true)
        .field("⏱️ 経過日数", format!("{}日", days), true)
        .field("💬 メッセージ", motivation(days), false);

    if ai_enabled {
        embed = embed.field(
            "🤖 AIでテーマを提案",
            "書くテーマが思いつかない？ `suggest` でAIに提案してもらいましょう！",
            false,
        );
    }

    embed.footer(FOOTER)
}

/// Embed for an on-demand check, stale or not.
pub fn status_embed(snapshot: &FeedSnapshot, tz: Tz, threshold_days: u32, stale: bool) -> Embed {
    let embed = Embed::new("📊 ブログ更新状況", if stale { ORANGE } else { GREEN })
        .field("📝 最新記事", post_link(snapshot), false)
        .field("📅 最終更新", local_date(snapshot, tz), true)
        .field(
            "⏱️ 経過日数",
            format!("{}日", snapshot.days_since_update().unwrap_or_default()),
            true,
        )
        .field("🎯 しきい値", format!("{}日", threshold_days), true);

    let embed = if stale {
        embed.field("⚠️ 状態", "更新が必要です！", false)
    } else {
        embed.field("✅ 状態", "問題ありません", false)
    };
    embed.footer(FOOTER)
}

pub fn suggestions_embed(title: &str, suggestions: &[TopicSuggestion]) -> Embed {
    let mut embed = Embed::new(title, PURPLE).description("リアクションでテーマを選択してください");
    for (emoji, suggestion) in NUMBER_EMOJIS.iter().zip(suggestions) {
        let prefix = format!("{} ", emoji);
        let room = FIELD_NAME_LIMIT - prefix.chars().count();
        let summary = suggestion
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("-");
        embed = embed.field(
            format!("{}{}", prefix, truncate_chars(&suggestion.title, room)),
            truncate_chars(summary, FIELD_VALUE_LIMIT),
            false,
        );
    }
    embed.footer("Powered by Google Gemini AI")
}

pub fn check_failure_message(feed_url: &str, error: &str) -> String {
    format!("❌ RSSフィード {} のチェックに失敗しました: {}", feed_url, error)
}

fn post_link(snapshot: &FeedSnapshot) -> String {
    if snapshot.link().is_empty() {
        snapshot.title().to_string()
    } else {
        format!("[{}]({})", snapshot.title(), snapshot.link())
    }
}

fn local_date(snapshot: &FeedSnapshot, tz: Tz) -> String {
    snapshot
        .last_updated()
        .map(|at| at.with_timezone(&tz).format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn motivation(days: i64) -> &'static str {
    if days >= 14 {
        "2週間以上更新がありません。そろそろ新しい記事を書きませんか？📖"
    } else if days >= 7 {
        "1週間更新がありません。ネタは思いつきましたか？💡"
    } else {
        "更新のタイミングです！"
    }
}

pub struct DiscordNotifier {
    client: Client,
    target: DiscordTarget,
    api_base: String,
    timezone: Tz,
}

impl DiscordNotifier {
    pub fn new(target: DiscordTarget, timezone: Tz) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            target,
            api_base: DISCORD_API_URL.to_string(),
            timezone,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn target(&self) -> &DiscordTarget {
        &self.target
    }

    pub fn can_read_reactions(&self) -> bool {
        matches!(self.target, DiscordTarget::Bot { .. })
    }

    pub async fn send_reminder(&self, snapshot: &FeedSnapshot, ai_enabled: bool) -> Result<()> {
        if !snapshot.is_success() {
            return Err(AppError::DiscordApi(
                "Cannot send notification: feed check failed".to_string(),
            ));
        }
        tracing::info!("Sending reminder via {}", self.target.label());
        let embed = reminder_embed(snapshot, self.timezone, ai_enabled);
        // Only a bot message can ping everyone without extra webhook setup
        let content = matches!(self.target, DiscordTarget::Bot { .. }).then_some("@everyone");
        self.send(content, &[embed]).await.map(|_| ())
    }

    pub async fn send_status(&self, snapshot: &FeedSnapshot, threshold_days: u32, stale: bool) -> Result<()> {
        let embed = status_embed(snapshot, self.timezone, threshold_days, stale);
        self.send(None, &[embed]).await.map(|_| ())
    }

    pub async fn send_check_failure(&self, feed_url: &str, error: &str) -> Result<()> {
        let message = check_failure_message(feed_url, error);
        self.send(Some(&message), &[]).await.map(|_| ())
    }

    pub async fn send_test_message(&self) -> Result<()> {
        let embed = Embed::new("✅ RSS Checker テストメッセージ", GREEN)
            .description("Discord通知が正しく設定されています！")
            .field("状態", "✓ 接続成功", true)
            .field("通知方法", self.target.label(), true);
        self.send(None, &[embed]).await.map(|_| ())
    }

    pub async fn send_text(&self, content: &str) -> Result<Option<String>> {
        self.send(Some(content), &[]).await
    }

    /// Post the numbered suggestions and, when running as a bot, seed one
    /// reaction per suggestion. Returns the message id for bot messages.
    pub async fn send_suggestions(
        &self,
        title: &str,
        suggestions: &[TopicSuggestion],
    ) -> Result<Option<String>> {
        let message_id = self.send(None, &[suggestions_embed(title, suggestions)]).await?;

        if let Some(message_id) = &message_id {
            for emoji in NUMBER_EMOJIS.iter().take(suggestions.len()) {
                self.add_reaction(message_id, emoji).await?;
            }
        }

        Ok(message_id)
    }

    pub async fn add_reaction(&self, message_id: &str, emoji: &str) -> Result<()> {
        let (token, channel_id) = self.bot_credentials()?;
        let url = format!(
            "{}/channels/{}/messages/{}/reactions/{}/@me",
            self.api_base,
            channel_id,
            message_id,
            encode_emoji(emoji)
        );
        let response = self
            .client
            .put(url)
            .header("Authorization", format!("Bot {}", token))
            .header("Content-Length", "0")
            .send()
            .await?;
        expect_success(response).await.map(|_| ())
    }

    /// Ids of the humans who reacted with `emoji` on a message.
    pub async fn reaction_users(&self, message_id: &str, emoji: &str) -> Result<Vec<String>> {
        let (token, channel_id) = self.bot_credentials()?;
        let url = format!(
            "{}/channels/{}/messages/{}/reactions/{}",
            self.api_base,
            channel_id,
            message_id,
            encode_emoji(emoji)
        );
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bot {}", token))
            .send()
            .await?;
        let body = expect_success(response).await?;
        let users: Vec<ReactionUser> = serde_json::from_str(&body)?;
        Ok(users.into_iter().filter(|u| !u.bot).map(|u| u.id).collect())
    }

    async fn send(&self, content: Option<&str>, embeds: &[Embed]) -> Result<Option<String>> {
        let payload = MessagePayload { content, embeds };

        match &self.target {
            DiscordTarget::Webhook { url } => {
                let response = self.client.post(url).json(&payload).send().await?;
                expect_success(response).await?;
                tracing::info!("Message sent via webhook");
                Ok(None)
            }
            DiscordTarget::Bot { token, channel_id } => {
                let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
                let response = self
                    .client
                    .post(url)
                    .header("Authorization", format!("Bot {}", token))
                    .json(&payload)
                    .send()
                    .await?;
                let body = expect_success(response).await?;
                let message: MessageResponse = serde_json::from_str(&body)?;
                tracing::info!(message_id = %message.id, "Message sent via bot");
                Ok(Some(message.id))
            }
        }
    }

    fn bot_credentials(&self) -> Result<(&str, &str)> {
        match &self.target {
            DiscordTarget::Bot { token, channel_id } => Ok((token, channel_id)),
            DiscordTarget::Webhook { .. } => Err(AppError::DiscordApi(
                "reactions need a bot token and channel id".to_string(),
            )),
        }
    }
}

async fn expect_success(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(AppError::DiscordApi(format!("{}: {}", status, body)))
    }
}

fn encode_emoji(emoji: &str) -> String {
    url::form_urlencoded::byte_serialize(emoji.as_bytes()).collect()
}
