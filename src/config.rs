//! TOML configuration for blog-reminder.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::services::hatena::DEFAULT_HOST;
use crate::services::{DiscordTarget, HatenaAccount};

pub const LOCAL_CONFIG_FILE: &str = "rss.toml";
const APP_DIR: &str = "blog-reminder";

/// Hosted Hatena Blog domains; the first label of the host is the owner id.
const HATENA_DOMAINS: [&str; 6] = [
    ".hateblo.jp",
    ".hatenablog.com",
    ".hatenablog.jp",
    ".hatenadiary.com",
    ".hatenadiary.jp",
    ".hatenadiary.org",
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub blog: BlogConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlogConfig {
    #[serde(default)]
    pub url: String,
    /// Falls back to `url` when unset.
    pub rss_feed_url: Option<String>,
    /// AtomPub secret from the blog's advanced settings page.
    pub api_key: Option<String>,
    pub hatena_id: Option<String>,
    pub blog_id: Option<String>,
    #[serde(default = "default_api_host")]
    pub api_host: String,
}

fn default_api_host() -> String {
    DEFAULT_HOST.to_string()
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            rss_feed_url: None,
            api_key: None,
            hatena_id: None,
            blog_id: None,
            api_host: default_api_host(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_threshold_days")]
    pub threshold_days: u32,
    /// Local time of day, `HH:MM`.
    #[serde(default = "default_notification_time")]
    pub notification_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_threshold_days() -> u32 {
    7
}

fn default_notification_time() -> String {
    "09:00".to_string()
}

fn default_timezone() -> String {
    "Asia/Tokyo".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            threshold_days: default_threshold_days(),
            notification_time: default_notification_time(),
            timezone: default_timezone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    crate::ai::suggester::DEFAULT_MODEL.to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Empty strings and `YOUR_..._HERE` placeholders count as unset.
fn configured(value: &Option<String>) -> Option<&str> {
    let value = value.as_deref()?.trim();
    let placeholder = value.starts_with("YOUR_") && value.ends_with("_HERE");
    (!value.is_empty() && !placeholder).then_some(value)
}

impl Config {
    /// Load from `path`, or from `rss.toml` in the working directory, or from
    /// the per-user config directory, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path().ok_or_else(|| {
                AppError::Config(format!(
                    "no configuration found; create {} or {}",
                    LOCAL_CONFIG_FILE,
                    Self::user_config_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| format!("<config dir>/{}/config.toml", APP_DIR))
                ))
            })?,
        };

        tracing::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        Self::user_config_path().filter(|p| p.exists())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Check everything the network code relies on, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.blog.url.trim().is_empty() {
            problems.push("[blog] url is required".to_string());
        } else if let Err(e) = Url::parse(&self.blog.url) {
            problems.push(format!("[blog] url is not a valid URL: {}", e));
        }
        if let Some(feed) = configured(&self.blog.rss_feed_url) {
            if let Err(e) = Url::parse(feed) {
                problems.push(format!("[blog] rss_feed_url is not a valid URL: {}", e));
            }
        }

        if self.discord_target().is_none() {
            problems.push(
                "[discord] needs webhook_url, or bot_token together with channel_id".to_string(),
            );
        }

        if self.notification.threshold_days < 1 {
            problems.push("[notification] threshold_days must be at least 1".to_string());
        }
        if let Err(e) = self.parse_notification_time() {
            problems.push(e);
        }
        if let Err(e) = self.parse_timezone() {
            problems.push(e);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(
                problems
                    .iter()
                    .map(|p| format!("  - {}", p))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ))
        }
    }

    pub fn feed_url(&self) -> &str {
        configured(&self.blog.rss_feed_url).unwrap_or(self.blog.url.trim())
    }

    pub fn threshold_days(&self) -> u32 {
        self.notification.threshold_days
    }

    pub fn notification_time(&self) -> Result<NaiveTime> {
        self.parse_notification_time().map_err(AppError::Config)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.parse_timezone().map_err(AppError::Config)
    }

    fn parse_notification_time(&self) -> std::result::Result<NaiveTime, String> {
        let raw = &self.notification.notification_time;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|_| format!("[notification] notification_time must be HH:MM, got {:?}", raw))
    }

    fn parse_timezone(&self) -> std::result::Result<Tz, String> {
        let raw = &self.notification.timezone;
        raw.trim()
            .parse::<Tz>()
            .map_err(|_| format!("[notification] unknown timezone {:?}", raw))
    }

    /// A bot is preferred when both are configured since only a bot can read reactions.
    pub fn discord_target(&self) -> Option<DiscordTarget> {
        let discord = &self.discord;
        if let (Some(token), Some(channel_id)) =
            (configured(&discord.bot_token), configured(&discord.channel_id))
        {
            return Some(DiscordTarget::Bot {
                token: token.to_string(),
                channel_id: channel_id.to_string(),
            });
        }
        configured(&discord.webhook_url).map(|url| DiscordTarget::Webhook {
            url: url.to_string(),
        })
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        configured(&self.ai.gemini_api_key)
    }

    pub fn hatena_id(&self) -> Option<String> {
        if let Some(id) = configured(&self.blog.hatena_id) {
            return Some(id.to_string());
        }
        let host = self.blog_host()?;
        HATENA_DOMAINS.iter().find_map(|domain| {
            host.strip_suffix(domain)
                .filter(|id| !id.is_empty() && !id.contains('.'))
                .map(str::to_string)
        })
    }

    pub fn blog_id(&self) -> Option<String> {
        configured(&self.blog.blog_id)
            .map(str::to_string)
            .or_else(|| self.blog_host())
    }

    fn blog_host(&self) -> Option<String> {
        Url::parse(self.blog.url.trim())
            .ok()?
            .host_str()
            .map(str::to_string)
    }

    /// Publishing credentials, when all three parts are known.
    pub fn hatena_account(&self) -> Option<HatenaAccount> {
        Some(HatenaAccount {
            hatena_id: self.hatena_id()?,
            blog_id: self.blog_id()?,
            api_key: configured(&self.blog.api_key)?.to_string(),
            host: self.blog.api_host.trim().to_string(),
        })
    }
}
