//! RetroPhoto CLI - drive the offline upload queue from the terminal
//!
//! Queue photos while offline, then fire the same sync and push events the
//! background worker reacts to.

mod cli;
mod commands;
mod error;


use clap::Parser;
use retrophoto_core::config::WorkerConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::enqueue::run_enqueue;
use crate::commands::list::run_list;
use crate::commands::purge::run_purge;
use crate::commands::push::run_push;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        if let Some(hint) = error.hint() {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("retrophoto=info,retrophoto_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let config = WorkerConfig::from_env()?;

    match cli.command {
        Commands::Enqueue {
            file,
            fingerprint,
            session_id,
            content_type,
        } => {
            run_enqueue(
                &file,
                &fingerprint,
                session_id.as_deref(),
                content_type.as_deref(),
                &db_path,
                &config,
            )
            .await?;
        }
        Commands::List { limit, json } => run_list(limit, json, &db_path, &config).await?,
        Commands::Status { json } => run_status(json, &db_path, &config).await?,
        Commands::Sync { tag } => run_sync(tag.as_deref(), &db_path, &config).await?,
        Commands::Push { payload } => run_push(payload.as_deref(), &config).await?,
        Commands::Purge => run_purge(&db_path, &config).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
