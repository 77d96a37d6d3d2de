use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warp::Filter;

use tubefeed::config::{Cli, Command, Settings};
use tubefeed::curate::{self, Curator};
use tubefeed::db::Database;
use tubefeed::expand::PlaylistExpander;
use tubefeed::feed::FeedAssembler;
use tubefeed::provider::youtube::YouTubeProvider;
use tubefeed::server::make_server;
use tubefeed::title::TitleAllocator;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    // .env has to be loaded before clap reads the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.settings.log_json);

    let db = Database::file(&cli.settings.database)
        .with_context(|| format!("opening database {}", cli.settings.database.display()))?;

    match cli.command {
        Command::Serve => serve(&cli.settings, db).await,
        Command::Purge { prefix } => purge(db, &prefix),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn expander(settings: &Settings) -> anyhow::Result<PlaylistExpander<YouTubeProvider>> {
    let provider = YouTubeProvider::new(settings.youtube()).context("building YouTube client")?;

    Ok(PlaylistExpander::new(Arc::new(provider))
        .with_timeout(settings.expansion_timeout())
        .with_max_pages(settings.max_pages))
}

async fn serve(settings: &Settings, db: Database) -> anyhow::Result<()> {
    if settings.youtube().api_key.is_none() {
        warn!("no YouTube API key configured, playlists will be shown unexpanded");
    }

    let db = Arc::new(db);
    let expander = expander(settings)?;

    let feed = FeedAssembler::new(Arc::clone(&db), expander.clone()).with_page_size(settings.page_size);
    let allocator = TitleAllocator::new(Arc::clone(&db), settings.title_rule);
    let curator = Curator::new(db, allocator, expander);

    let routes = make_server(feed, curator).with(warp::trace::request());

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(settings.bind, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .with_context(|| format!("binding {}", settings.bind))?;

    info!(%addr, page_size = settings.page_size, "serving feed");
    server.await;

    Ok(())
}

fn purge(db: Database, prefix: &str) -> anyhow::Result<()> {
    let removed = curate::purge(&db, prefix)?;

    println!("Deleted {removed} entr{} titled \"{prefix}...\"", if removed == 1 { "y" } else { "ies" });

    Ok(())
}
