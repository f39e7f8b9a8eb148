use serde::Serialize;

/// A single topic idea pulled out of the model's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSuggestion {
    pub title: String,
    pub summary: Option<String>,
}
