use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "retrophoto")]
#[command(about = "Queue photo uploads offline and deliver them when the network returns")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the upload queue database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue a photo for upload
    #[command(alias = "add")]
    Enqueue {
        /// Image file to queue
        file: PathBuf,
        /// Client fingerprint attached to the upload
        #[arg(long, value_name = "TOKEN")]
        fingerprint: String,
        /// Restoration session the upload belongs to
        #[arg(long, value_name = "ID")]
        session_id: Option<String>,
        /// Override the MIME type guessed from the file extension
        #[arg(long, value_name = "MIME")]
        content_type: Option<String>,
    },
    /// List uploads waiting for delivery, oldest first
    List {
        /// Number of uploads to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show queue counts per status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fire a background sync signal and drain the queue
    Sync {
        /// Sync tag to deliver (defaults to the upload queue tag)
        #[arg(long, value_name = "TAG")]
        tag: Option<String>,
    },
    /// Show a notification from a push payload
    Push {
        /// JSON payload, e.g. '{"title":"RetroPhoto","url":"/result/1"}'
        #[arg(long, value_name = "JSON")]
        payload: Option<String>,
    },
    /// Remove delivered and expired uploads
    Purge,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
