use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod ai;
mod app;
mod config;
mod error;
mod feed;
mod logging;
mod models;
mod scheduler;
mod selection;
mod services;
#[cfg(test)]
mod test_support;

use app::App;
use config::Config;
use error::Result;
use feed::Decision;
use models::{PublishResult, TopicSuggestion};

#[derive(Parser)]
#[command(name = "blog-reminder", version)]
#[command(about = "Watch a blog's feed, nag on Discord when it goes stale, and draft posts with AI")]
struct Cli {
    /// Configuration file (defaults to ./rss.toml, then the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check once and send a reminder if the blog is stale
    Check,
    /// Check every day at the configured time until Ctrl-C
    Schedule,
    /// Send a test message and check every configured service
    Test,
    /// Check once and always post the current status
    Status,
    /// Ask the AI for topic ideas
    Suggest {
        #[arg(short, long)]
        theme: Option<String>,
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,
        /// Post to Discord and wait for a reaction, then draft an outline
        #[arg(short, long)]
        interactive: bool,
    },
    /// Generate an outline for a title
    Outline { title: String },
    /// Write one section from a description
    Section { detail: String },
    /// Get a short answer to a technical question
    Ask { question: String },
    /// Review an article file
    Review { file: PathBuf },
    /// Suggest tags for an article file
    Tags {
        #[arg(short, long)]
        title: String,
        file: PathBuf,
    },
    /// Post an article file to Hatena Blog (as a draft unless --public)
    Publish {
        #[arg(short, long)]
        title: String,
        file: PathBuf,
        #[arg(short = 'C', long = "category")]
        categories: Vec<String>,
        #[arg(long)]
        public: bool,
        /// Add AI-generated tags to the categories
        #[arg(long)]
        auto_tags: bool,
    },
    /// List blog entries, newest first
    Entries {
        /// Page URL from a previous listing
        #[arg(long)]
        page: Option<String>,
    },
    /// Replace the categories of an existing entry
    Retag {
        edit_url: String,
        #[arg(short = 'C', long = "category", required = true)]
        categories: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config.logging.level);

    let app = App::new(config)?;

    match cli.command.unwrap_or(Command::Check) {
        Command::Check => match app.check_and_notify().await? {
            Decision::Stale { days } => println!("Reminder sent: {} days since the last post", days),
            Decision::Fresh { days } => println!("Up to date: {} days since the last post", days),
            Decision::CheckFailed => println!("Feed check failed, error reported to Discord"),
        },
        Command::Schedule => app.run_scheduled().await?,
        Command::Test => {
            let mut all_ok = true;
            for (name, outcome) in app.test_setup().await {
                match outcome {
                    Ok(detail) => println!("✓ {}: {}", name, detail),
                    Err(detail) => {
                        all_ok = false;
                        println!("✗ {}: {}", name, detail);
                    }
                }
            }
            if !all_ok {
                println!("\nSome integrations are not available; check your configuration.");
            }
        }
        Command::Status => {
            let snapshot = app.status().await?;
            match snapshot.error() {
                None => println!(
                    "{} ({} days ago)",
                    snapshot.title(),
                    snapshot.days_since_update().unwrap_or_default()
                ),
                Some(error) => println!("Check failed: {}", error),
            }
        }
        Command::Suggest {
            theme,
            count,
            interactive,
        } => {
            if interactive {
                match app.suggest_interactive(theme.as_deref(), count).await? {
                    Some((choice, outline)) => {
                        println!("Selected: {}\n\n{}", choice.title, outline)
                    }
                    None => println!("No suggestion was picked in time"),
                }
            } else {
                print_suggestions(&app.suggest(theme.as_deref(), count).await?);
            }
        }
        Command::Outline { title } => println!("{}", app.outline(&title).await?),
        Command::Section { detail } => println!("{}", app.section(&detail).await?),
        Command::Ask { question } => println!("{}", app.ask(&question).await?),
        Command::Review { file } => {
            let article = std::fs::read_to_string(file)?;
            println!("{}", app.review(&article).await?);
        }
        Command::Tags { title, file } => {
            let content = std::fs::read_to_string(file)?;
            println!("{}", app.tags(&title, &content).await?.join(", "));
        }
        Command::Publish {
            title,
            file,
            categories,
            public,
            auto_tags,
        } => {
            let content = std::fs::read_to_string(file)?;
            let result = app
                .publish(&title, &content, categories, public, auto_tags)
                .await?;
            print_publish_result(&result);
        }
        Command::Entries { page } => {
            let page = app.entries(page.as_deref()).await?;
            for entry in &page.entries {
                let draft = if entry.is_draft { " [draft]" } else { "" };
                println!("{}{}", entry.title, draft);
                println!("    {}", entry.edit_url);
                if !entry.categories.is_empty() {
                    println!("    categories: {}", entry.categories.join(", "));
                }
            }
            if let Some(next) = page.next_page {
                println!("\nNext page: blog-reminder entries --page '{}'", next);
            }
        }
        Command::Retag {
            edit_url,
            categories,
        } => print_publish_result(&app.retag(&edit_url, categories).await?),
    }

    Ok(())
}

fn print_suggestions(suggestions: &[TopicSuggestion]) {
    for (index, suggestion) in suggestions.iter().enumerate() {
        println!("{}. {}", index + 1, suggestion.title);
        if let Some(summary) = &suggestion.summary {
            println!("   {}", summary);
        }
    }
}

fn print_publish_result(result: &PublishResult) {
    if result.success {
        println!("Done: {}", result.article_url.as_deref().unwrap_or_default());
        if let Some(edit_url) = &result.edit_url {
            println!("Edit URL: {}", edit_url);
        }
    } else {
        let status = result
            .status_code
            .map(|code| format!("HTTP {}", code))
            .unwrap_or_else(|| "no response".to_string());
        println!(
            "Failed ({}): {}",
            status,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}
