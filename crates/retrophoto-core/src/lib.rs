//! retrophoto-core - Core library for the RetroPhoto upload worker
//!
//! This crate contains the durable offline upload queue, the background sync
//! coordinator that drains it, and the notification flow that reports
//! restored photos back to the user.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod sync;
pub mod upload;
pub mod util;
pub mod worker;

pub use error::{Error, Result};
pub use models::{QueueItem, QueueItemId, QueueStatus, UploadPayload};
