// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::fs::File;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use reelcache::Config;
use reelcache::media::MediaKind;
use reelcache::rows::Page;
use reelcache::watchmode::Source;

mod cli;
use cli::{
    CacheCommand, CommandContext, DetailsCommand, OutputFormat, RecsCommand, RowsCommand,
    SearchCommand, SeasonCommand, TopCommand, TrendingCommand, WatchCommand,
};

fn cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser)]
#[command(name = "reelcache")]
#[command(about = "Browse movie and TV catalogs with a local response cache")]
#[command(version)]
#[command(styles = cargo_style())]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging to file (reelcache_debug.log)
    #[arg(long, global = true)]
    debug_log: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trending titles for the week (or today)
    Trending {
        /// Media kind (movie, tv)
        #[arg(short, long, default_value = "movie")]
        kind: String,
        /// Use the daily list instead of the weekly one
        #[arg(long)]
        today: bool,
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
        /// Leave out Japanese animation
        #[arg(long)]
        no_anime: bool,
    },

    /// Search movies and shows
    Search {
        /// Search query
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Show details for a title
    Details { kind: String, id: u64 },

    /// List the episodes of a season
    Season { id: u64, season: u32 },

    /// Recommendations based on a title
    Recs { kind: String, id: u64 },

    /// Load the browse rows for a page
    Rows {
        /// Page (home, movies, shows, new)
        #[arg(short, long, default_value = "home")]
        page: String,
    },

    /// Top titles on streaming services
    Top {
        /// Service names (netflix, prime, ...) or numeric source IDs
        #[arg(required = true)]
        sources: Vec<String>,
        /// Only keep one media kind (movie, tv)
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Build a player session and print its embed URL
    Watch {
        kind: String,
        id: u64,
        #[arg(short, long)]
        season: Option<u32>,
        #[arg(short, long)]
        episode: Option<u32>,
    },

    /// Manage cache
    #[command(subcommand)]
    Cache(CacheSubCommand),
}

#[derive(Subcommand)]
enum CacheSubCommand {
    /// List cached keys
    List,
    /// Clear cache
    Clear,
}

fn init_logging(cli: &Cli) -> Result<()> {
    if cli.debug_log {
        let file = File::create("reelcache_debug.log")?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_level(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                EnvFilter::from_default_env()
                    .add_directive("reelcache=debug".parse()?)
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into())
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn"))
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = Config::load_or_default(Config::default_path()).with_env_overrides();
    let format = OutputFormat::from_str(&cli.format)?;
    let context = CommandContext::new(config)?;

    match cli.command {
        Commands::Trending {
            kind,
            today,
            refresh,
            no_anime,
        } => {
            let cmd = TrendingCommand {
                kind: MediaKind::from_str(&kind)?,
                today,
                refresh,
                no_anime,
                format,
            };
            cmd.execute(context).await?;
        }

        Commands::Search { query, page } => {
            let cmd = SearchCommand {
                query,
                page,
                format,
            };
            cmd.execute(context).await?;
        }

        Commands::Details { kind, id } => {
            let cmd = DetailsCommand {
                kind: MediaKind::from_str(&kind)?,
                id,
                format,
            };
            cmd.execute(context).await?;
        }

        Commands::Season { id, season } => {
            let cmd = SeasonCommand { id, season, format };
            cmd.execute(context).await?;
        }

        Commands::Recs { kind, id } => {
            let cmd = RecsCommand {
                kind: MediaKind::from_str(&kind)?,
                id,
                format,
            };
            cmd.execute(context).await?;
        }

        Commands::Rows { page } => {
            let cmd = RowsCommand {
                page: Page::from_str(&page)?,
                format,
            };
            cmd.execute(context).await?;
        }

        Commands::Top { sources, kind } => {
            let source_ids = sources
                .iter()
                .map(|s| Source::parse_id(s))
                .collect::<Result<Vec<_>>>()?;
            let cmd = TopCommand {
                source_ids,
                kind: kind.map(|k| MediaKind::from_str(&k)).transpose()?,
                format,
            };
            cmd.execute(context).await?;
        }

        Commands::Watch {
            kind,
            id,
            season,
            episode,
        } => {
            let cmd = WatchCommand {
                kind: MediaKind::from_str(&kind)?,
                id,
                season,
                episode,
                format,
            };
            cmd.execute(context).await?;
        }

        Commands::Cache(cache_cmd) => {
            let cmd = match cache_cmd {
                CacheSubCommand::List => CacheCommand::List,
                CacheSubCommand::Clear => CacheCommand::Clear,
            };
            cmd.execute(context).await?;
        }
    }

    Ok(())
}
