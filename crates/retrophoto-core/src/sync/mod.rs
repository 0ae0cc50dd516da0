//! Background sync: drains the durable upload queue when connectivity returns.

use serde::Serialize;

use crate::db::{FailureDisposition, UploadQueue};
use crate::error::{Error, Result};
use crate::models::{NotificationIntent, QueueItem, DEFAULT_NOTIFICATION_TITLE, DEFAULT_TARGET_URL};
use crate::upload::{DeliveryError, UploadTransport};

/// Sync tag registered for the upload queue
pub const UPLOAD_SYNC_TAG: &str = "retrophoto-upload-queue";

/// Tally of one drain cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Items accepted by the upload endpoint
    pub delivered: usize,
    /// Items that failed and will be retried on a later cycle
    pub retrying: usize,
    /// Items that hit the retry ceiling or were rejected outright
    pub expired: usize,
    /// Items another claimant already held
    pub skipped: usize,
    /// Set when the queue storage failed and the cycle stopped early
    pub storage_error: Option<String>,
}

impl DrainReport {
    /// Whether the platform should run the sync again later
    pub const fn needs_retry(&self) -> bool {
        self.retrying > 0 || self.storage_error.is_some()
    }

    /// Items the cycle attempted to deliver
    pub const fn attempted(&self) -> usize {
        self.delivered + self.retrying + self.expired
    }

    /// Notification to show after photos were delivered, if any were
    pub fn completion_intent(&self) -> Option<NotificationIntent> {
        let body = match self.delivered {
            0 => return None,
            1 => "Your photo was uploaded and is being restored.".to_string(),
            n => format!("{n} photos were uploaded and are being restored."),
        };
        Some(NotificationIntent::new(
            DEFAULT_NOTIFICATION_TITLE,
            body,
            DEFAULT_TARGET_URL,
        ))
    }
}

/// What a sync signal resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "report", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The tag belongs to another registration
    Ignored,
    /// Nothing retryable is left
    Completed(DrainReport),
    /// At least one item should be retried; the platform must reschedule
    Reschedule(DrainReport),
}

impl SyncOutcome {
    /// Whether the platform should treat this sync as failed
    pub const fn should_reschedule(&self) -> bool {
        matches!(self, Self::Reschedule(_))
    }

    /// Drain report, when a drain ran
    pub const fn report(&self) -> Option<&DrainReport> {
        match self {
            Self::Ignored => None,
            Self::Completed(report) | Self::Reschedule(report) => Some(report),
        }
    }
}

/// Reconciles the durable queue against the upload endpoint
pub struct SyncCoordinator<Q, T> {
    queue: Q,
    transport: T,
}

impl<Q: UploadQueue, T: UploadTransport> SyncCoordinator<Q, T> {
    pub const fn new(queue: Q, transport: T) -> Self {
        Self { queue, transport }
    }

    pub const fn queue(&self) -> &Q {
        &self.queue
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Handle a platform sync signal.
    ///
    /// Never fails: per-item errors become queue transitions and storage
    /// errors turn into a reschedule request.
    pub async fn on_sync_signal(&self, tag: &str) -> SyncOutcome {
        if tag != UPLOAD_SYNC_TAG {
            tracing::debug!("Ignoring sync signal with unrelated tag '{tag}'");
            return SyncOutcome::Ignored;
        }

        let report = self.drain().await;
        tracing::info!(
            delivered = report.delivered,
            retrying = report.retrying,
            expired = report.expired,
            skipped = report.skipped,
            storage_error = report.storage_error.is_some(),
            "Upload queue drain finished"
        );

        if report.needs_retry() {
            SyncOutcome::Reschedule(report)
        } else {
            SyncOutcome::Completed(report)
        }
    }

    /// Run one drain cycle over every deliverable item, oldest first
    pub async fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let mut cursor = self.queue.list_pending();

        loop {
            let item = match cursor.try_next().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!("Stopping drain, failed to read upload queue: {error}");
                    report.storage_error = Some(error.to_string());
                    break;
                }
            };

            if let Err(error) = self.process(&item, &mut report).await {
                tracing::warn!(id = %item.id, "Stopping drain, failed to update upload queue: {error}");
                report.storage_error = Some(error.to_string());
                break;
            }
        }

        report
    }

    async fn process(&self, item: &QueueItem, report: &mut DrainReport) -> Result<()> {
        match self.queue.mark_in_flight(&item.id).await {
            Ok(true) => {}
            Ok(false) | Err(Error::NotFound(_)) => {
                report.skipped += 1;
                return Ok(());
            }
            Err(error) => return Err(error),
        }

        match self.transport.deliver(item).await {
            Ok(receipt) => {
                self.queue.mark_delivered(&item.id).await?;
                tracing::debug!(id = %item.id, remote_id = ?receipt.remote_id, "Delivered queued upload");
                report.delivered += 1;
            }
            Err(error @ DeliveryError::Rejected { .. }) => {
                self.queue.mark_expired(&item.id, &error.to_string()).await?;
                report.expired += 1;
            }
            Err(error @ DeliveryError::Transient(_)) => {
                tracing::warn!(id = %item.id, "Queued upload failed: {error}");
                match self.queue.mark_failed(&item.id, &error.to_string()).await? {
                    FailureDisposition::Retrying { .. } => report.retrying += 1,
                    FailureDisposition::Expired { .. } => report.expired += 1,
                }
            }
        }

        Ok(())
    }
}
