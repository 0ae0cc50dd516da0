//! Durable upload queue implementation

use std::collections::VecDeque;
use std::path::Path;

use libsql::{params, Connection, Row, Value};
use serde::Serialize;

use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::models::{QueueItem, QueueItemId, QueueStatus, UploadPayload};
use crate::util::unix_millis_now;

use super::Database;

const SELECT_COLUMNS: &str = "seq, id, file_name, content_type, bytes, fingerprint, session_id,
     attempts, enqueued_at, updated_at, status, last_error";

/// Position of an item in queue order, used for keyset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CursorPosition {
    pub enqueued_at: i64,
    pub seq: i64,
}

/// Result of recording a failed delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Still under the ceiling; the item will be retried on a later cycle
    Retrying { attempts: u32 },
    /// The retry ceiling was reached and the item is now terminal
    Expired { attempts: u32 },
}

impl FailureDisposition {
    /// Whether the item remains eligible for delivery
    pub const fn is_retrying(self) -> bool {
        matches!(self, Self::Retrying { .. })
    }
}

/// Trait for durable upload queue operations (async)
#[allow(async_fn_in_trait)]
pub trait UploadQueue {
    /// Persist a new pending upload
    async fn enqueue(&self, payload: UploadPayload) -> Result<QueueItemId>;

    /// Fetch up to `limit` deliverable items strictly after `after`, oldest first
    async fn pending_page(
        &self,
        after: Option<CursorPosition>,
        limit: usize,
    ) -> Result<Vec<(CursorPosition, QueueItem)>>;

    /// Claim an item for delivery; `false` when it was not claimable
    async fn mark_in_flight(&self, id: &QueueItemId) -> Result<bool>;

    /// Record a successful delivery
    async fn mark_delivered(&self, id: &QueueItemId) -> Result<()>;

    /// Record a failed delivery attempt
    async fn mark_failed(&self, id: &QueueItemId, reason: &str) -> Result<FailureDisposition>;

    /// Give up on an item that can never be delivered
    async fn mark_expired(&self, id: &QueueItemId, reason: &str) -> Result<()>;

    /// Rows fetched per cursor page
    fn page_size(&self) -> usize;

    /// Lazy cursor over deliverable items in enqueue order
    fn list_pending(&self) -> PendingCursor<'_, Self>
    where
        Self: Sized,
    {
        PendingCursor::new(self)
    }
}

/// Lazy, finite, restartable sequence of deliverable queue items.
///
/// Items are fetched a page at a time. Because pagination is keyed on queue
/// position, items that change state while the cursor is open never show up
/// twice and the cursor always terminates.
pub struct PendingCursor<'q, Q> {
    queue: &'q Q,
    position: Option<CursorPosition>,
    buffer: VecDeque<(CursorPosition, QueueItem)>,
    exhausted: bool,
}

impl<'q, Q: UploadQueue> PendingCursor<'q, Q> {
    fn new(queue: &'q Q) -> Self {
        Self {
            queue,
            position: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Next deliverable item, or `None` once the queue has been walked
    pub async fn try_next(&mut self) -> Result<Option<QueueItem>> {
        if self.buffer.is_empty() && !self.exhausted {
            let limit = self.queue.page_size().max(1);
            let page = self.queue.pending_page(self.position, limit).await?;
            if page.len() < limit {
                self.exhausted = true;
            }
            self.buffer.extend(page);
        }

        let Some((position, item)) = self.buffer.pop_front() else {
            return Ok(None);
        };
        self.position = Some(position);
        Ok(Some(item))
    }

    /// Rewind to the oldest deliverable item
    pub fn restart(&mut self) {
        self.position = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    /// Drain the remaining items into a vector
    pub async fn collect_remaining(mut self) -> Result<Vec<QueueItem>> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next().await? {
            items.push(item);
        }
        Ok(items)
    }
}

/// What the open-time recovery pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Items left in flight by an interrupted cycle, now pending again
    pub reset_in_flight: u64,
    /// Items expired for exceeding the maximum age
    pub expired_by_age: u64,
    /// Delivered and expired rows deleted
    pub purged: u64,
}

/// Number of items per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: u64,
    pub in_flight: u64,
    pub failed: u64,
    pub delivered: u64,
    pub expired: u64,
}

impl QueueCounts {
    /// Items a future drain cycle would attempt
    pub const fn deliverable(&self) -> u64 {
        self.pending + self.failed
    }

    /// All rows in the store
    pub const fn total(&self) -> u64 {
        self.pending + self.in_flight + self.failed + self.delivered + self.expired
    }
}

/// libSQL implementation of `UploadQueue`
pub struct LibSqlUploadQueue {
    db: Database,
    config: QueueConfig,
}

impl LibSqlUploadQueue {
    /// Open the queue at `path` and run recovery.
    pub async fn open(path: impl AsRef<Path>, config: QueueConfig) -> Result<Self> {
        let db = Database::open(path).await?;
        Self::with_database(db, config).await
    }

    /// Open an in-memory queue (useful for testing)
    pub async fn open_in_memory(config: QueueConfig) -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Self::with_database(db, config).await
    }

    async fn with_database(db: Database, config: QueueConfig) -> Result<Self> {
        let queue = Self { db, config };
        let report = queue.recover().await?;
        if report != RecoveryReport::default() {
            tracing::info!(
                reset_in_flight = report.reset_in_flight,
                expired_by_age = report.expired_by_age,
                purged = report.purged,
                "Recovered upload queue"
            );
        }
        Ok(queue)
    }

    /// Queue policy in effect
    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn conn(&self) -> &Connection {
        self.db.connection()
    }

    /// Persist a new pending upload with an explicit enqueue timestamp
    pub async fn enqueue_at(&self, payload: UploadPayload, enqueued_at: i64) -> Result<QueueItemId> {
        let id = QueueItemId::new();
        let size = payload.size_bytes();
        let session_id = payload.session_id.map_or(Value::Null, Value::Text);

        self.conn()
            .execute(
                "INSERT INTO upload_queue
                    (id, file_name, content_type, bytes, fingerprint, session_id,
                     attempts, enqueued_at, updated_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7, 'pending')",
                params![
                    id.as_str(),
                    payload.file_name,
                    payload.content_type,
                    payload.bytes,
                    payload.fingerprint,
                    session_id,
                    enqueued_at
                ],
            )
            .await?;

        tracing::debug!(%id, size, "Enqueued upload");
        Ok(id)
    }

    /// Get a queue item by ID, whatever its status
    pub async fn get(&self, id: &QueueItemId) -> Result<Option<QueueItem>> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM upload_queue WHERE id = ?1"),
                params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_row(&row)?.1)),
            None => Ok(None),
        }
    }

    /// Count items per status
    pub async fn counts(&self) -> Result<QueueCounts> {
        let mut rows = self
            .conn()
            .query(
                "SELECT status, COUNT(*) FROM upload_queue GROUP BY status",
                (),
            )
            .await?;

        let mut counts = QueueCounts::default();
        while let Some(row) = rows.next().await? {
            let status: QueueStatus = row.get::<String>(0)?.parse()?;
            let count = u64::try_from(row.get::<i64>(1)?).unwrap_or_default();
            match status {
                QueueStatus::Pending => counts.pending = count,
                QueueStatus::InFlight => counts.in_flight = count,
                QueueStatus::Failed => counts.failed = count,
                QueueStatus::Delivered => counts.delivered = count,
                QueueStatus::Expired => counts.expired = count,
            }
        }
        Ok(counts)
    }

    /// Reset interrupted items, expire stale ones and purge terminal rows
    pub async fn recover(&self) -> Result<RecoveryReport> {
        self.recover_at(unix_millis_now()).await
    }

    /// Recovery pass evaluated at an explicit time (Unix ms)
    pub async fn recover_at(&self, now: i64) -> Result<RecoveryReport> {
        let reset_in_flight = self
            .conn()
            .execute(
                "UPDATE upload_queue SET status = 'pending', updated_at = ?1
                 WHERE status = 'in_flight'",
                params![now],
            )
            .await?;
        if reset_in_flight > 0 {
            tracing::warn!("Reset {reset_in_flight} interrupted upload(s) to pending");
        }

        let cutoff = now.saturating_sub(self.config.max_age_millis());
        let expired_by_age = self
            .conn()
            .execute(
                "UPDATE upload_queue SET status = 'expired', updated_at = ?1,
                     last_error = COALESCE(last_error, 'exceeded maximum queue age')
                 WHERE status IN ('pending', 'failed') AND enqueued_at < ?2",
                params![now, cutoff],
            )
            .await?;

        let purged = self.purge().await?;

        Ok(RecoveryReport {
            reset_in_flight,
            expired_by_age,
            purged,
        })
    }

    /// Delete delivered and expired rows
    pub async fn purge(&self) -> Result<u64> {
        let purged = self
            .conn()
            .execute(
                "DELETE FROM upload_queue WHERE status IN ('delivered', 'expired')",
                (),
            )
            .await?;
        if purged > 0 {
            tracing::debug!("Purged {purged} finished upload(s)");
        }
        Ok(purged)
    }

    /// Build the error for a transition that matched no claimable row
    async fn transition_error(&self, id: &QueueItemId, target: &'static str) -> Error {
        match self.get(id).await {
            Ok(Some(item)) => Error::InvalidTransition {
                id: id.to_string(),
                status: item.status.to_string(),
                target,
            },
            Ok(None) => Error::NotFound(id.to_string()),
            Err(error) => error,
        }
    }
}

impl UploadQueue for LibSqlUploadQueue {
    async fn enqueue(&self, payload: UploadPayload) -> Result<QueueItemId> {
        self.enqueue_at(payload, unix_millis_now()).await
    }

    async fn pending_page(
        &self,
        after: Option<CursorPosition>,
        limit: usize,
    ) -> Result<Vec<(CursorPosition, QueueItem)>> {
        let after = after.unwrap_or(CursorPosition {
            enqueued_at: i64::MIN,
            seq: i64::MIN,
        });
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLUMNS}
                     FROM upload_queue
                     WHERE status IN ('pending', 'failed')
                       AND (enqueued_at > ?1 OR (enqueued_at = ?1 AND seq > ?2))
                     ORDER BY enqueued_at ASC, seq ASC
                     LIMIT ?3"
                ),
                params![after.enqueued_at, after.seq, limit],
            )
            .await?;

        let mut page = Vec::new();
        while let Some(row) = rows.next().await? {
            page.push(parse_row(&row)?);
        }
        Ok(page)
    }

    async fn mark_in_flight(&self, id: &QueueItemId) -> Result<bool> {
        let claimed = self
            .conn()
            .execute(
                "UPDATE upload_queue SET status = 'in_flight', updated_at = ?2
                 WHERE id = ?1 AND status IN ('pending', 'failed')",
                params![id.as_str(), unix_millis_now()],
            )
            .await?;

        if claimed == 1 {
            tracing::debug!(%id, "Claimed upload for delivery");
            return Ok(true);
        }

        match self.get(id).await? {
            Some(item) => {
                tracing::debug!(%id, status = %item.status, "Upload not claimable");
                Ok(false)
            }
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn mark_delivered(&self, id: &QueueItemId) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE upload_queue
                 SET status = 'delivered', updated_at = ?2, last_error = NULL, bytes = X''
                 WHERE id = ?1 AND status = 'in_flight'",
                params![id.as_str(), unix_millis_now()],
            )
            .await?;

        if rows == 0 {
            return Err(self.transition_error(id, "delivered").await);
        }
        tracing::debug!(%id, "Upload delivered");
        Ok(())
    }

    async fn mark_failed(&self, id: &QueueItemId, reason: &str) -> Result<FailureDisposition> {
        let max_attempts = i64::from(self.config.max_attempts);
        let mut rows = self
            .conn()
            .query(
                "UPDATE upload_queue
                 SET attempts = attempts + 1,
                     last_error = ?2,
                     updated_at = ?3,
                     status = CASE WHEN attempts + 1 >= ?4 THEN 'expired' ELSE 'failed' END
                 WHERE id = ?1 AND status = 'in_flight'
                 RETURNING attempts, status",
                params![id.as_str(), reason, unix_millis_now(), max_attempts],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            drop(rows);
            return Err(self.transition_error(id, "failed").await);
        };
        let attempts = u32::try_from(row.get::<i64>(0)?).unwrap_or(u32::MAX);
        let status: QueueStatus = row.get::<String>(1)?.parse()?;
        drop(rows);

        if status == QueueStatus::Expired {
            tracing::warn!(%id, attempts, "Upload reached retry ceiling: {reason}");
            Ok(FailureDisposition::Expired { attempts })
        } else {
            tracing::debug!(%id, attempts, "Upload attempt failed: {reason}");
            Ok(FailureDisposition::Retrying { attempts })
        }
    }

    async fn mark_expired(&self, id: &QueueItemId, reason: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE upload_queue SET status = 'expired', last_error = ?2, updated_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'in_flight', 'failed')",
                params![id.as_str(), reason, unix_millis_now()],
            )
            .await?;

        if rows == 0 {
            return Err(self.transition_error(id, "expired").await);
        }
        tracing::warn!(%id, "Upload expired: {reason}");
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.config.page_size
    }
}

/// Parse a queue row selected with `SELECT_COLUMNS`
fn parse_row(row: &Row) -> Result<(CursorPosition, QueueItem)> {
    let id: String = row.get(1)?;
    let id = id
        .parse()
        .map_err(|_| Error::InvalidInput(format!("Invalid queue item ID: {id}")))?;

    let position = CursorPosition {
        enqueued_at: row.get(8)?,
        seq: row.get(0)?,
    };

    let item = QueueItem {
        id,
        payload: UploadPayload {
            file_name: row.get(2)?,
            content_type: row.get(3)?,
            bytes: row.get(4)?,
            fingerprint: row.get(5)?,
            session_id: optional_text(row, 6)?,
        },
        attempts: u32::try_from(row.get::<i64>(7)?).unwrap_or(u32::MAX),
        enqueued_at: position.enqueued_at,
        updated_at: row.get(9)?,
        status: row.get::<String>(10)?.parse()?,
        last_error: optional_text(row, 11)?,
    };

    Ok((position, item))
}

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Text(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}
