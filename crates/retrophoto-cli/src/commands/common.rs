use std::path::{Path, PathBuf};

use chrono::Utc;
use retrophoto_core::config::WorkerConfig;
use retrophoto_core::db::LibSqlUploadQueue;
use retrophoto_core::models::NotificationOptions;
use retrophoto_core::notify::{NotificationPlatform, PlatformError};
use retrophoto_core::QueueItem;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct QueueListItem {
    pub id: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub status: String,
    pub attempts: u32,
    pub enqueued_at: i64,
    pub enqueued_at_iso: String,
    pub relative_time: String,
    pub last_error: Option<String>,
}

/// Prints notifications to the terminal in place of a system notification center
pub struct TerminalNotifier;

impl NotificationPlatform for TerminalNotifier {
    fn supports_notifications(&self) -> bool {
        true
    }

    async fn show(&self, title: &str, options: &NotificationOptions) -> Result<(), PlatformError> {
        println!("[{title}] {} -> {}", options.body, options.data.url);
        Ok(())
    }

    async fn close(&self, _notification_id: &str) -> Result<(), PlatformError> {
        Ok(())
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retrophoto")
        .join("upload-queue.db")
}

pub fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(default_db_path)
}

pub async fn open_queue(
    db_path: &Path,
    config: &WorkerConfig,
) -> Result<LibSqlUploadQueue, CliError> {
    Ok(LibSqlUploadQueue::open(db_path, config.queue.clone()).await?)
}

/// MIME type for common photo extensions
pub fn guess_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

pub fn queue_item_to_list_item(item: &QueueItem) -> QueueListItem {
    let now_ms = Utc::now().timestamp_millis();
    QueueListItem {
        id: item.id.to_string(),
        file_name: item.payload.file_name.clone(),
        content_type: item.payload.content_type.clone(),
        size_bytes: item.payload.size_bytes(),
        status: item.status.to_string(),
        attempts: item.attempts,
        enqueued_at: item.enqueued_at,
        enqueued_at_iso: format_timestamp(item.enqueued_at),
        relative_time: format_relative_time(item.enqueued_at, now_ms),
        last_error: item.last_error.clone(),
    }
}

pub fn format_queue_lines(items: &[QueueItem]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    items
        .iter()
        .map(|item| {
            let id = item.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let name = item.payload.file_name.chars().take(32).collect::<String>();
            let status = item.status.as_str();
            let relative_time = format_relative_time(item.enqueued_at, now_ms);

            match &item.last_error {
                Some(error) => format!(
                    "{short_id:<13}  {name:<32}  {status:<9}  {relative_time:<10}  attempts={}  {error}",
                    item.attempts
                ),
                None => format!("{short_id:<13}  {name:<32}  {status:<9}  {relative_time}"),
            }
        })
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}
