use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{parse, prompts};
use crate::error::{AppError, Result};
use crate::models::TopicSuggestion;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

const CREATIVE: GenerationConfig = GenerationConfig {
    temperature: 0.9,
    top_p: 0.95,
    top_k: 40,
    max_output_tokens: 2048,
};

const REVIEW: GenerationConfig = GenerationConfig {
    temperature: 0.7,
    top_p: 0.95,
    top_k: 40,
    max_output_tokens: 2048,
};

const TAGGING: GenerationConfig = GenerationConfig {
    temperature: 0.5,
    top_p: 0.9,
    top_k: 30,
    max_output_tokens: 200,
};

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

pub struct Suggester {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl Suggester {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_base: GEMINI_API_URL.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn suggest_topics(
        &self,
        count: usize,
        recent_titles: &[String],
    ) -> Result<Vec<TopicSuggestion>> {
        tracing::info!("Requesting {} blog topic suggestions", count);
        let text = self.generate(prompts::topics(count, recent_titles), CREATIVE).await?;
        suggestions_from(&text)
    }

    pub async fn suggest_with_theme(&self, theme: &str, count: usize) -> Result<Vec<TopicSuggestion>> {
        tracing::info!("Requesting suggestions for theme: {}", theme);
        let text = self.generate(prompts::themed_topics(theme, count), CREATIVE).await?;
        suggestions_from(&text)
    }

    /// Markdown outline starting with the `[:contents]` table-of-contents marker.
    pub async fn generate_outline(&self, title: &str) -> Result<String> {
        tracing::info!("Generating article outline for: {}", title);
        let text = self.generate(prompts::outline(title), CREATIVE).await?;
        Ok(parse::strip_code_fence(&text).to_string())
    }

    pub async fn generate_section(&self, detail: &str) -> Result<String> {
        let text = self.generate(prompts::section(detail), CREATIVE).await?;
        Ok(parse::strip_code_fence(&text).to_string())
    }

    pub async fn answer(&self, question: &str) -> Result<String> {
        let text = self.generate(prompts::answer(question), CREATIVE).await?;
        Ok(parse::strip_code_fence(&text).to_string())
    }

    pub async fn review_article(&self, article: &str) -> Result<String> {
        tracing::info!("Generating article review");
        self.generate(prompts::review(article), REVIEW).await
    }

    pub async fn generate_tags(&self, title: &str, content: &str) -> Result<Vec<String>> {
        tracing::info!("Generating tags for article: {}", title);
        let text = self.generate(prompts::tags(title, content), TAGGING).await?;
        let tags = parse::parse_tags(&text);
        tracing::info!("Generated {} tags", tags.len());
        Ok(tags)
    }

    async fn generate(&self, prompt: String, config: GenerationConfig) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: config,
        };

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::GeminiApi(format!("API error {}: {}", status, error_text)));
        }

        let response: GenerateResponse = response.json().await?;

        let text = response
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(AppError::GeminiApi("response contained no text".to_string()));
        }
        Ok(text)
    }
}

fn suggestions_from(text: &str) -> Result<Vec<TopicSuggestion>> {
    let suggestions = parse::parse_suggestions(text);
    if suggestions.is_empty() {
        return Err(AppError::GeminiApi(format!(
            "could not find any suggestions in reply: {}",
            prompts::truncate_chars(text, 200)
        )));
    }
    Ok(suggestions)
}
