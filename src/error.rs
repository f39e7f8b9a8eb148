use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing failed: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration:\n{0}")]
    Config(String),

    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    #[error("Discord API error: {0}")]
    DiscordApi(String),

    #[error("Hatena Blog API error: {0}")]
    HatenaApi(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl From<quick_xml::Error> for AppError {
    fn from(err: quick_xml::Error) -> Self {
        AppError::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
