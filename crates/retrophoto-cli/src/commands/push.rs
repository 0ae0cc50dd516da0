use retrophoto_core::config::WorkerConfig;
use retrophoto_core::models::PushPayload;
use retrophoto_core::notify::{DispatchOutcome, NotificationDispatcher};

use crate::commands::common::TerminalNotifier;
use crate::error::CliError;

/// Simulate a push message; malformed payloads fall back to the default notification
pub async fn run_push(payload: Option<&str>, config: &WorkerConfig) -> Result<(), CliError> {
    let dispatcher = NotificationDispatcher::new(TerminalNotifier, config.notifications.clone());
    let intent = PushPayload::from_data(payload.map(str::as_bytes)).into_intent();

    match dispatcher.dispatch(&intent).await {
        DispatchOutcome::Shown => {}
        DispatchOutcome::Unsupported => println!("Notifications are not supported here"),
        DispatchOutcome::Failed => tracing::warn!("Notification could not be shown"),
    }
    Ok(())
}
