pub mod parse;
pub mod prompts;
pub mod suggester;

pub use suggester::Suggester;
