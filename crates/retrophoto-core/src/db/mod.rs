//! Database layer for RetroPhoto

mod connection;
mod migrations;
mod queue_repository;

pub use connection::Database;
pub use queue_repository::{
    CursorPosition, FailureDisposition, LibSqlUploadQueue, PendingCursor, QueueCounts,
    RecoveryReport, UploadQueue,
};
