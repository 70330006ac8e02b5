mod config;
mod database;
mod discovery;
mod entities;
mod loader;
mod logging;
mod transform;

#[cfg(test)]
mod test_utils;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    database::{ConflictPolicy, Database},
    loader::{CommitScope, Loader},
    logging::init_tracing,
};

/// Load song metadata and listening logs into the sparkify tables
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "SPARKIFY_ETL_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `sparkify_etl=debug`
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Root directory of the song metadata files
    #[arg(long, env = "SPARKIFY_SONG_DATA")]
    song_data: Option<PathBuf>,

    /// Root directory of the event log files
    #[arg(long, env = "SPARKIFY_LOG_DATA")]
    log_data: Option<PathBuf>,

    /// What to do when a row's key is already loaded
    #[arg(long, value_enum)]
    conflict_policy: Option<ConflictPolicy>,

    /// Commit after each file or once for the whole run
    #[arg(long, value_enum)]
    commit_scope: Option<CommitScope>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_tracing(&args.log_level)?;

    tracing::debug!("Loading configuration");
    let mut config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load sparkify-etl config")?;

    if let Some(url) = args.database_url {
        config.set_database_url(url);
    }
    if let Some(path) = &args.song_data {
        config.set_song_data(path);
    }
    if let Some(path) = &args.log_data {
        config.set_log_data(path);
    }
    if let Some(policy) = args.conflict_policy {
        config.conflict_policy = policy;
    }
    if let Some(scope) = args.commit_scope {
        config.commit_scope = scope;
    }

    let database = Database::connect(config.database_url()).await?;

    let summary = Loader::new(&database, config.conflict_policy, config.commit_scope)
        .run(&config.song_data_path(), &config.log_data_path())
        .await?;

    tracing::info!(
        "Loaded {} files: {} songs, {} artists, {} time rows, {} users, {} songplays",
        summary.files,
        summary.songs,
        summary.artists,
        summary.time,
        summary.users,
        summary.songplays
    );

    database.close().await?;

    Ok(())
}
