//! pet-launcher - Desktop pet that finds and launches your games
//!
//! The pet window itself is driven through the interactive `shell`; the other
//! subcommands expose the background search, search roots and the games
//! catalog directly.

mod config;
mod games;
mod overlay;
mod platform;
mod search;
mod shell;

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pet_launcher_core::{SearchEvent, SearchRequest, SearchStats};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::games::Catalog;
use crate::search::{resolver_for, SearchSession, Ticker};
use crate::shell::{lock, Shell};

/// pet-launcher - Desktop pet game launcher
#[derive(Parser)]
#[command(name = "pet-launcher")]
#[command(author = "Misha")]
#[command(version = "0.1.0")]
#[command(about = "Desktop pet that finds and launches your games", long_about = None)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pet in the terminal
    Shell,

    /// Search for executables and shortcuts
    Search {
        /// Search term (matches file names and whole directory names)
        term: String,

        /// Search this directory instead of the configured roots (repeatable)
        #[arg(short, long)]
        root: Vec<PathBuf>,

        /// Do not read shortcut targets
        #[arg(long)]
        no_resolve: bool,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show or edit the search roots
    Roots {
        #[command(subcommand)]
        action: Option<RootsCommand>,
    },

    /// Manage the games menu
    Games {
        #[command(subcommand)]
        action: Option<GamesCommand>,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum RootsCommand {
    /// List the roots a search would use
    List,
    /// Add a search root
    Add { path: String },
    /// Remove a search root
    Remove { path: String },
}

#[derive(Subcommand)]
enum GamesCommand {
    /// List games
    List,
    /// Add a game
    Add { name: String, path: String },
    /// Rename a game or change its path
    Edit {
        name: String,
        #[arg(long)]
        new_name: Option<String>,
        #[arg(long)]
        path: Option<String>,
    },
    /// Remove a game
    Remove { name: String },
    /// Launch a game
    Launch { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Shell => {
            info!("Starting pet shell...");
            Shell::new(config).run().await?;
        }

        Commands::Search {
            term,
            root,
            no_resolve,
            json,
        } => {
            search_files(&config, &term, root, no_resolve, json).await?;
        }

        Commands::Roots { action } => {
            manage_roots(&mut config, action.unwrap_or(RootsCommand::List))?;
        }

        Commands::Games { action } => {
            manage_games(&mut config, action.unwrap_or(GamesCommand::List))?;
        }

        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}

/// Run one search, printing results as they arrive
async fn search_files(
    config: &Config,
    term: &str,
    roots: Vec<PathBuf>,
    no_resolve: bool,
    json: bool,
) -> Result<()> {
    let roots = if roots.is_empty() {
        config.root_set()
    } else {
        roots
    };
    let request = SearchRequest::new(term, roots)?;

    let resolver = resolver_for(config.search.resolve_shortcuts && !no_resolve);
    let session = Arc::new(Mutex::new(SearchSession::new(resolver)));
    let generation = lock(&session).start(request)?;

    let summary: Arc<Mutex<Option<SearchStats>>> = Arc::new(Mutex::new(None));
    let ticker_session = Arc::clone(&session);
    let ticker_summary = Arc::clone(&summary);

    let mut ticker = Ticker::start(config.poll_interval(), move || {
        for event in lock(&ticker_session).poll() {
            if json {
                match event.to_json() {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to encode event: {}", e),
                }
            }

            match event {
                SearchEvent::Found { result, .. } => {
                    if !json {
                        println!("  {} -> {}", result.display_name, result.target_path.display());
                    }
                }
                SearchEvent::Complete { generation: g, stats } if g == generation => {
                    *lock(&ticker_summary) = Some(stats);
                    return ControlFlow::Break(());
                }
                SearchEvent::Complete { .. } => {}
            }
        }
        ControlFlow::Continue(())
    });

    let mut cancelled = false;
    loop {
        tokio::select! {
            _ = ticker.wait() => break,
            signal = tokio::signal::ctrl_c(), if !cancelled => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Cancelling search...");
                lock(&session).cancel();
                cancelled = true;
            }
        }
    }
    lock(&session).stop();

    if json {
        return Ok(());
    }

    let stats = lock(&summary).unwrap_or_default();
    println!();
    if stats.cancelled {
        println!("Search cancelled after {} results", stats.matched);
    } else if stats.matched == 0 {
        println!("No games found for '{}'", term);
    } else {
        println!("Found {} results", stats.matched);
    }
    if stats.skipped_subtrees > 0 || stats.skipped_roots > 0 {
        println!(
            "Skipped {} unreadable directories and {} missing roots",
            stats.skipped_subtrees, stats.skipped_roots
        );
    }

    Ok(())
}

/// Show or edit search roots
fn manage_roots(config: &mut Config, action: RootsCommand) -> Result<()> {
    match action {
        RootsCommand::List => {
            let source = if config.has_custom_roots() {
                "configured"
            } else {
                "default"
            };
            println!("Search roots ({}):", source);
            for root in config.root_set() {
                let marker = if root.is_dir() { "+" } else { "?" };
                println!("  {} {}", marker, root.display());
            }
        }
        RootsCommand::Add { path } => {
            if !config.add_root(&path) {
                bail!("Root already configured: {}", path);
            }
            config.save()?;
            println!("Added root: {}", path);
        }
        RootsCommand::Remove { path } => {
            if !config.remove_root(&path) {
                bail!("Root not configured: {}", path);
            }
            config.save()?;
            println!("Removed root: {}", path);
        }
    }
    Ok(())
}

/// Edit or launch entries of the games menu
fn manage_games(config: &mut Config, action: GamesCommand) -> Result<()> {
    match action {
        GamesCommand::List => {
            let catalog = Catalog::new(&mut config.games);
            println!("Games ({}):", catalog.list().len());
            for game in catalog.list() {
                println!("  {} -> {}", game.name, game.path);
            }
            return Ok(());
        }
        GamesCommand::Launch { name } => {
            let catalog = Catalog::new(&mut config.games);
            let entry = catalog
                .get(&name)
                .with_context(|| format!("No game named '{}'", name))?;
            let pid = games::launch(entry)?;
            println!("Launched {} (pid {})", entry.name, pid);
            return Ok(());
        }
        GamesCommand::Add { name, path } => {
            let mut catalog = Catalog::new(&mut config.games);
            let entry = catalog.add(&name, &path)?;
            println!("Added {} -> {}", entry.name, entry.path);
        }
        GamesCommand::Edit {
            name,
            new_name,
            path,
        } => {
            let mut catalog = Catalog::new(&mut config.games);
            let entry = catalog.edit(&name, new_name.as_deref(), path.as_deref())?;
            println!("Updated {} -> {}", entry.name, entry.path);
        }
        GamesCommand::Remove { name } => {
            let entry = Catalog::new(&mut config.games).remove(&name)?;
            println!("Removed {}", entry.name);
        }
    }

    config.save()
}

/// Show current configuration
fn show_config(config: &Config) -> Result<()> {
    println!("pet-launcher configuration");
    println!("==========================");
    println!("Config file: {}", config.config_path.display());
    println!();
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}
