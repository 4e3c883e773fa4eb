//! Machine health client CLI
//!
//! - `init`   : write username / server URL to the config file
//! - `fetch`  : pull the user's history and mirror the newest record locally
//! - `submit` : send readings, print the score, cache the result
//! - `show`   : print the cached view (works offline)
//! - `scores` : overwrite cached scores locally (offline flow)
//! - `reset`  : clear the local cache

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use health_client::config::ClientConfig;
use health_client::sync::{refresh, submit_and_cache};
use health_client::{ClientCache, FileKvStore, SyncClient};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "health-client", about = "Submit machine readings and keep a local view")]
struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Username, overrides the configured one
    #[arg(long, short, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Init {
        /// Kernel base URL
        #[arg(long)]
        server: Option<String>,
    },
    Fetch,
    Submit { file: PathBuf },
    Show,
    Scores { file: PathBuf },
    Reset,
}

async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load(cli.config.as_deref())
        .await
        .context("failed to load config")?;

    if let Command::Init { server } = &cli.command {
        if let Some(user) = &cli.user {
            config.username = Some(user.clone());
        }
        if let Some(server) = server {
            config.server.base_url = server.clone();
        }
        config.save(cli.config.as_deref()).await.context("failed to save config")?;
        return print_json(&config);
    }

    let cache_dir = config.cache_dir()?;
    let cache = ClientCache::open(
        FileKvStore::new(&cache_dir)
            .with_context(|| format!("failed to open cache at {}", cache_dir.display()))?,
    );

    let username = || -> Result<String> {
        cli.user
            .clone()
            .or_else(|| config.username.clone())
            .context("no username: pass --user or set `username` in the config")
    };
    let client = || SyncClient::new(&config.server.base_url, config.timeout());

    match &cli.command {
        Command::Init { .. } => {}
        Command::Fetch => {
            let user = username()?;
            match refresh(&cache, &client()?, &user).await? {
                Some(view) => print_json(&view)?,
                None => println!("no history for {user}"),
            }
        }
        Command::Submit { file } => {
            let user = username()?;
            let submission = read_json(file).await?;
            let score = submit_and_cache(&cache, &client()?, &user, &submission).await?;
            info!("submission stored for {user}");
            print_json(&score)?;
        }
        Command::Show => match cache.view() {
            Some(view) => print_json(&view)?,
            None => println!("cache is empty"),
        },
        Command::Scores { file } => {
            let scores = read_json(file).await?;
            print_json(&cache.set_scores(scores)?)?;
        }
        Command::Reset => {
            cache.reset()?;
            println!("cache cleared");
        }
    }
    Ok(())
}
