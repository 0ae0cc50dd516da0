use std::path::Path;

use retrophoto_core::config::WorkerConfig;
use retrophoto_core::db::UploadQueue;
use retrophoto_core::QueueItem;

use crate::commands::common::{
    format_queue_lines, open_queue, queue_item_to_list_item, QueueListItem,
};
use crate::error::CliError;

pub async fn run_list(
    limit: usize,
    as_json: bool,
    db_path: &Path,
    config: &WorkerConfig,
) -> Result<(), CliError> {
    let items = pending_items(limit, db_path, config).await?;

    if as_json {
        let json_items = items
            .iter()
            .map(queue_item_to_list_item)
            .collect::<Vec<QueueListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No uploads waiting.");
        return Ok(());
    }

    for line in format_queue_lines(&items) {
        println!("{line}");
    }
    Ok(())
}

/// Oldest deliverable uploads, at most `limit` of them
pub async fn pending_items(
    limit: usize,
    db_path: &Path,
    config: &WorkerConfig,
) -> Result<Vec<QueueItem>, CliError> {
    let queue = open_queue(db_path, config).await?;

    let mut items = Vec::new();
    let mut cursor = queue.list_pending();
    while items.len() < limit {
        let Some(item) = cursor.try_next().await? else {
            break;
        };
        items.push(item);
    }
    Ok(items)
}
