//! Anime catalog CLI.
//!
//! Runs one catalog operation against the configured backend and prints the
//! normalized result as JSON on stdout.

use anime_client::{catalog, CachedClient, CatalogSource};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shared::{Backend, Config, SearchQuery, StreamCategory};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the configured backend (jikan or aniwatch)
    #[arg(short, long)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Landing page sections
    Home,
    /// Search the catalog
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        /// Restrict results to a type (tv, movie, ova, ...)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },
    /// Full details of one anime
    Anime { id: String },
    /// Character list of one anime
    Characters { id: String },
    /// Recommendations for one anime
    Recommendations { id: String },
    /// Top ranked anime
    Top {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },
    /// Currently airing anime
    Airing {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Most popular anime
    Popular {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Movies
    Movies {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// TV series
    Series {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// One anime picked at random
    Random,
    /// Episode list of one anime
    Episodes { id: String },
    /// Streaming servers for one episode
    Servers { episode_id: String },
    /// Playable sources for one episode
    Sources {
        episode_id: String,
        #[arg(short, long, default_value = "hd-1")]
        server: String,
        #[arg(long, default_value_t = StreamCategory::Sub)]
        category: StreamCategory,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

async fn execute(catalog: &dyn CatalogSource, command: Command) -> Result<()> {
    match command {
        Command::Home => print_json(&catalog.home().await?),
        Command::Search { query, page, kind } => {
            let mut query = SearchQuery::new(query).page(page);
            if let Some(kind) = kind {
                query = query.kind(kind);
            }
            print_json(&catalog.search(&query).await?)
        }
        Command::Anime { id } => print_json(&catalog.anime(&id).await?),
        Command::Characters { id } => print_json(&catalog.characters(&id).await?),
        Command::Recommendations { id } => print_json(&catalog.recommendations(&id).await?),
        Command::Top { page, kind } => print_json(&catalog.top_anime(kind.as_deref(), page).await?),
        Command::Airing { page } => print_json(&catalog.top_airing(page).await?),
        Command::Popular { page } => print_json(&catalog.popular(page).await?),
        Command::Movies { page } => print_json(&catalog.movies(page).await?),
        Command::Series { page } => print_json(&catalog.series(page).await?),
        Command::Random => print_json(&catalog.random().await?),
        Command::Episodes { id } => print_json(&catalog.episodes(&id).await?),
        Command::Servers { episode_id } => print_json(&catalog.episode_servers(&episode_id).await?),
        Command::Sources {
            episode_id,
            server,
            category,
        } => print_json(&catalog.episode_sources(&episode_id, &server, category).await?),
    }
}

async fn run(args: Args) -> Result<()> {
    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(backend) = args.backend {
        config.upstream.backend = backend;
    }

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        shared::logging::parse_level(&config.logging.default_level)
    };

    shared::logging::init(shared::LogConfig {
        log_dir: config.log_dir().to_string_lossy().to_string(),
        component: "anime-client".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!(
        config_file = %args.config.display(),
        backend = %config.upstream.backend,
        base_url = %config.base_url(),
        "Loaded configuration"
    );

    let client = Arc::new(CachedClient::from_config(&config).context("Failed to create HTTP client")?);
    let catalog = catalog::from_config(&config, Arc::clone(&client))
        .context("Failed to create catalog")?;

    let result = execute(catalog.as_ref(), args.command).await;

    let stats = client.cache_stats();
    debug!(
        entries = stats.total_entries,
        fresh = stats.fresh_entries,
        "Cache statistics"
    );

    result
}

/// The single line shown to the user for any failure
fn failure_message(error: &anyhow::Error) -> String {
    format!("Something went wrong: {:#}", error)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        debug!(error = ?e, "Command failed");
        eprintln!("{}", failure_message(&e));
        std::process::exit(1);
    }
}
