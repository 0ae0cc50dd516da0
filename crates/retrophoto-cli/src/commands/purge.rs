use std::path::Path;

use retrophoto_core::config::WorkerConfig;

use crate::commands::common::open_queue;
use crate::error::CliError;

pub async fn run_purge(db_path: &Path, config: &WorkerConfig) -> Result<(), CliError> {
    let queue = open_queue(db_path, config).await?;
    let purged = queue.purge().await?;
    println!("Purged {purged} finished upload(s)");
    Ok(())
}
