use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::provider::youtube::{YouTubeConfig, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT};
use crate::title::TitleRule;

#[derive(Parser, Debug)]
#[command(name = "tubefeed", version, about = "Curated, scheduled YouTube feed")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the public feed and the admin API.
    Serve,
    /// Delete every entry whose title starts with PREFIX.
    Purge {
        #[arg(long, default_value = "TEST -")]
        prefix: String,
    },
}

/// Runtime settings. Every flag can also come from the environment or a
/// `.env` file.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// SQLite database file.
    #[arg(long, env = "TUBEFEED_DB", default_value = "tubefeed.sqlite")]
    pub database: PathBuf,

    #[arg(long, env = "TUBEFEED_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Videos per feed page.
    #[arg(long, env = "TUBEFEED_PAGE_SIZE", default_value_t = crate::feed::DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    pub page_size: usize,

    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    #[arg(long, env = "YOUTUBE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub youtube_api_base: String,

    /// Upper bound for expanding a single playlist, in milliseconds.
    #[arg(long, env = "TUBEFEED_EXPANSION_TIMEOUT_MS", default_value_t = 5000)]
    pub expansion_timeout_ms: u64,

    /// Provider pages fetched per playlist at most.
    #[arg(long, env = "TUBEFEED_MAX_PAGES", default_value_t = crate::expand::DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// How suggested titles are built from the prefix and counter.
    #[arg(long, env = "TUBEFEED_TITLE_RULE", value_enum, default_value_t = TitleRule::Spaced)]
    pub title_rule: TitleRule,

    /// Emit logs as JSON lines.
    #[arg(long, env = "TUBEFEED_LOG_JSON")]
    pub log_json: bool,
}

impl Settings {
    pub fn expansion_timeout(&self) -> Duration {
        Duration::from_millis(self.expansion_timeout_ms)
    }

    pub fn youtube(&self) -> YouTubeConfig {
        YouTubeConfig {
            api_base: self.youtube_api_base.clone(),
            api_key: self.youtube_api_key.clone().filter(|key| !key.is_empty()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT.min(self.expansion_timeout()),
        }
    }
}

fn parse_page_size(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("page size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}
