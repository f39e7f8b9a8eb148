mod article;
mod snapshot;
mod suggestion;

pub use article::{ArticleContent, BlogEntry, EntryPage, PublishRequest, PublishResult};
pub use snapshot::FeedSnapshot;
pub use suggestion::TopicSuggestion;
