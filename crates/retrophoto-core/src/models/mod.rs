//! Data models for RetroPhoto

mod notification;
mod queue_item;

pub use notification::{
    ClientWindow, NotificationClick, NotificationData, NotificationIntent, NotificationOptions,
    PushPayload, DEFAULT_NOTIFICATION_BODY, DEFAULT_NOTIFICATION_TITLE, DEFAULT_TARGET_URL,
};
pub use queue_item::{QueueItem, QueueItemId, QueueStatus, UploadPayload};
