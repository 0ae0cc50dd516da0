//! Event adapter for the background worker.
//!
//! Maps the platform's `sync`, `push` and `notificationclick` events onto the
//! coordinator and dispatcher. Every returned future resolves only after the
//! queue transitions it caused are committed, so hosts can hand it straight to
//! their keep-alive mechanism.

use crate::db::UploadQueue;
use crate::models::{NotificationClick, PushPayload};
use crate::notify::{
    ClickDecision, ClientWindows, DispatchOutcome, NotificationDispatcher, NotificationPlatform,
};
use crate::sync::{DrainReport, SyncCoordinator, SyncOutcome};
use crate::upload::UploadTransport;

/// A platform event delivered to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Connectivity restored for a registered sync tag
    Sync { tag: String },
    /// Server-initiated push message
    Push { data: Option<Vec<u8>> },
    /// The user clicked a displayed notification
    NotificationClick(NotificationClick),
}

/// Outcome of a handled event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerResponse {
    Sync(SyncOutcome),
    Push(DispatchOutcome),
    Click(ClickDecision),
}

pub struct Worker<Q, T, P> {
    coordinator: SyncCoordinator<Q, T>,
    dispatcher: NotificationDispatcher<P>,
}

impl<Q, T, P> Worker<Q, T, P>
where
    Q: UploadQueue,
    T: UploadTransport,
    P: NotificationPlatform,
{
    pub const fn new(
        coordinator: SyncCoordinator<Q, T>,
        dispatcher: NotificationDispatcher<P>,
    ) -> Self {
        Self {
            coordinator,
            dispatcher,
        }
    }

    pub const fn coordinator(&self) -> &SyncCoordinator<Q, T> {
        &self.coordinator
    }

    pub const fn dispatcher(&self) -> &NotificationDispatcher<P> {
        &self.dispatcher
    }

    pub async fn handle<C: ClientWindows>(
        &self,
        event: WorkerEvent,
        clients: &C,
    ) -> WorkerResponse {
        match event {
            WorkerEvent::Sync { tag } => WorkerResponse::Sync(self.on_sync(&tag).await),
            WorkerEvent::Push { data } => WorkerResponse::Push(self.on_push(data.as_deref()).await),
            WorkerEvent::NotificationClick(click) => {
                WorkerResponse::Click(self.on_notification_click(&click, clients).await)
            }
        }
    }

    /// Drain the queue, then tell the user about delivered photos
    pub async fn on_sync(&self, tag: &str) -> SyncOutcome {
        let outcome = self.coordinator.on_sync_signal(tag).await;
        if let Some(intent) = outcome.report().and_then(DrainReport::completion_intent) {
            self.dispatcher.dispatch(&intent).await;
        }
        outcome
    }

    pub async fn on_push(&self, data: Option<&[u8]>) -> DispatchOutcome {
        let intent = PushPayload::from_data(data).into_intent();
        self.dispatcher.dispatch(&intent).await
    }

    pub async fn on_notification_click<C: ClientWindows>(
        &self,
        click: &NotificationClick,
        clients: &C,
    ) -> ClickDecision {
        self.dispatcher.on_click(click, clients).await
    }
}
