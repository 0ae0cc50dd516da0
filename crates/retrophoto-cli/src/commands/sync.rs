use std::path::Path;

use retrophoto_core::config::WorkerConfig;
use retrophoto_core::notify::NotificationDispatcher;
use retrophoto_core::sync::{DrainReport, SyncCoordinator, SyncOutcome, UPLOAD_SYNC_TAG};
use retrophoto_core::upload::HttpUploadClient;
use retrophoto_core::worker::Worker;

use crate::commands::common::{open_queue, TerminalNotifier};
use crate::error::CliError;

pub async fn run_sync(
    tag: Option<&str>,
    db_path: &Path,
    config: &WorkerConfig,
) -> Result<(), CliError> {
    let base_url = config.require_api_base_url()?;
    let transport = HttpUploadClient::new(base_url, config.upload_timeout)?;
    let queue = open_queue(db_path, config).await?;

    let worker = Worker::new(
        SyncCoordinator::new(queue, transport),
        NotificationDispatcher::new(TerminalNotifier, config.notifications.clone()),
    );

    let tag = tag.unwrap_or(UPLOAD_SYNC_TAG);
    let outcome = worker.on_sync(tag).await;
    tracing::info!(tag, outcome = ?outcome, "Sync finished");

    match outcome {
        SyncOutcome::Ignored => {
            println!("Ignored sync tag `{tag}`");
            Ok(())
        }
        SyncOutcome::Completed(report) => {
            println!("{}", format_drain_report(&report));
            Ok(())
        }
        SyncOutcome::Reschedule(report) => {
            let summary = format_drain_report(&report);
            println!("{summary}");
            Err(CliError::SyncIncomplete(summary))
        }
    }
}

pub fn format_drain_report(report: &DrainReport) -> String {
    let mut summary = format!(
        "delivered={} retrying={} expired={} skipped={}",
        report.delivered, report.retrying, report.expired, report.skipped
    );
    if let Some(error) = &report.storage_error {
        summary.push_str(" storage_error=");
        summary.push_str(error);
    }
    summary
}
