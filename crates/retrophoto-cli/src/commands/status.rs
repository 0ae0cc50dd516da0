use std::path::Path;

use retrophoto_core::config::WorkerConfig;

use crate::commands::common::open_queue;
use crate::error::CliError;

pub async fn run_status(
    as_json: bool,
    db_path: &Path,
    config: &WorkerConfig,
) -> Result<(), CliError> {
    let queue = open_queue(db_path, config).await?;
    let counts = queue.counts().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    println!("pending    {}", counts.pending);
    println!("failed     {}", counts.failed);
    println!("in flight  {}", counts.in_flight);
    println!("delivered  {}", counts.delivered);
    println!("expired    {}", counts.expired);
    Ok(())
}
