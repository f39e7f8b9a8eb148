pub mod checker;
pub mod date;
pub mod decision;
pub mod fetcher;
pub mod parser;

pub use checker::FeedChecker;
pub use decision::{evaluate, Decision};
