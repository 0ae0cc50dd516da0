//! Queue item model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A unique identifier for a queued upload, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueItemId(Uuid);

impl QueueItemId {
    /// Create a new unique queue item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Delivery state of a queued upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Waiting for the next drain cycle
    Pending,
    /// Claimed by the active drain cycle
    InFlight,
    /// Last attempt failed; retried on the next drain cycle
    Failed,
    /// Accepted by the upload endpoint
    Delivered,
    /// Gave up (retry ceiling, age limit, or permanent rejection)
    Expired,
}

impl QueueStatus {
    /// Column value stored in the queue table
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Failed => "failed",
            Self::Delivered => "delivered",
            Self::Expired => "expired",
        }
    }

    /// Whether a drain cycle should attempt this item
    pub const fn is_deliverable(self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }

    /// Whether the item is waiting to be purged
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Expired)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_flight" => Ok(Self::InFlight),
            "failed" => Ok(Self::Failed),
            "delivered" => Ok(Self::Delivered),
            "expired" => Ok(Self::Expired),
            other => Err(Error::InvalidInput(format!("Unknown queue status: {other}"))),
        }
    }
}

/// Photo bytes and metadata captured when the original upload failed
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPayload {
    /// Original file name
    pub file_name: String,
    /// Image MIME type
    pub content_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// Client fingerprint used for quota and ownership tracking
    pub fingerprint: String,
    /// Restoration session the upload belongs to, if one was already created
    pub session_id: Option<String>,
}

impl UploadPayload {
    /// Create a validated upload payload.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
        fingerprint: impl Into<String>,
    ) -> Result<Self> {
        let file_name = file_name.into().trim().to_string();
        let content_type = content_type.into().trim().to_string();
        let fingerprint = fingerprint.into().trim().to_string();

        if file_name.is_empty() {
            return Err(Error::InvalidInput(
                "Upload file_name cannot be empty".to_string(),
            ));
        }
        if !content_type.starts_with("image/") {
            return Err(Error::InvalidInput(format!(
                "Upload content_type must be an image type, got '{content_type}'"
            )));
        }
        if bytes.is_empty() {
            return Err(Error::InvalidInput(
                "Upload bytes cannot be empty".to_string(),
            ));
        }
        if fingerprint.is_empty() {
            return Err(Error::InvalidInput(
                "Upload fingerprint cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            file_name,
            content_type,
            bytes,
            fingerprint,
            session_id: None,
        })
    }

    /// Attach the restoration session id
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = crate::util::non_blank(Some(session_id.into().as_str()));
        self
    }

    /// Payload size in bytes
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for UploadPayload {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UploadPayload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("fingerprint", &self.fingerprint)
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// One deferred upload in the durable queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique identifier
    pub id: QueueItemId,
    /// Captured upload
    pub payload: UploadPayload,
    /// Number of failed delivery attempts so far
    pub attempts: u32,
    /// Enqueue timestamp (Unix ms)
    pub enqueued_at: i64,
    /// Last state transition timestamp (Unix ms)
    pub updated_at: i64,
    /// Current delivery state
    pub status: QueueStatus,
    /// Reason recorded by the last failed attempt
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> UploadPayload {
        UploadPayload::new("grandma.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff], "fp-123").unwrap()
    }

    #[test]
    fn test_queue_item_id_unique() {
        let id1 = QueueItemId::new();
        let id2 = QueueItemId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_queue_item_id_parse() {
        let id = QueueItemId::new();
        let parsed: QueueItemId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_status_column_values() {
        for status in [
            QueueStatus::Pending,
            QueueStatus::InFlight,
            QueueStatus::Failed,
            QueueStatus::Delivered,
            QueueStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<QueueStatus>().unwrap(), status);
        }
        assert!("lost".parse::<QueueStatus>().is_err());
    }

    #[test]
    fn test_status_classification() {
        assert!(QueueStatus::Pending.is_deliverable());
        assert!(QueueStatus::Failed.is_deliverable());
        assert!(!QueueStatus::InFlight.is_deliverable());
        assert!(QueueStatus::Delivered.is_terminal());
        assert!(QueueStatus::Expired.is_terminal());
        assert!(!QueueStatus::Failed.is_terminal());
    }

    #[test]
    fn test_payload_new() {
        let payload = payload().with_session_id("  session-1 ");
        assert_eq!(payload.file_name, "grandma.jpg");
        assert_eq!(payload.size_bytes(), 3);
        assert_eq!(payload.session_id.as_deref(), Some("session-1"));
    }

    #[test]
    fn test_payload_validation() {
        assert!(UploadPayload::new("", "image/png", vec![1], "fp").is_err());
        assert!(UploadPayload::new("a.png", "text/plain", vec![1], "fp").is_err());
        assert!(UploadPayload::new("a.png", "image/png", Vec::new(), "fp").is_err());
        assert!(UploadPayload::new("a.png", "image/png", vec![1], "  ").is_err());
    }

    #[test]
    fn test_payload_debug_hides_bytes() {
        let debug = format!("{:?}", payload());
        assert!(debug.contains("<3 bytes>"));
        assert!(!debug.contains("255"));
    }
}
