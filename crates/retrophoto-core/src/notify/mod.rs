//! System notifications and the click-to-focus flow.

use thiserror::Error;
use url::Url;

use crate::config::NotificationConfig;
use crate::models::{
    ClientWindow, NotificationClick, NotificationData, NotificationIntent, NotificationOptions,
    DEFAULT_TARGET_URL,
};

/// Failure reported by a platform capability
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The platform lacks the capability altogether
    #[error("Unsupported platform feature: {0}")]
    Unsupported(&'static str),
    /// The platform call failed
    #[error("Platform call failed: {0}")]
    Failed(String),
}

/// Notification display API
#[allow(async_fn_in_trait)]
pub trait NotificationPlatform {
    /// Whether notifications can be shown at all
    fn supports_notifications(&self) -> bool;

    async fn show(&self, title: &str, options: &NotificationOptions) -> Result<(), PlatformError>;

    /// Dismiss a displayed notification
    async fn close(&self, notification_id: &str) -> Result<(), PlatformError>;
}

/// Application window enumeration, focus and open API
#[allow(async_fn_in_trait)]
pub trait ClientWindows {
    async fn list(&self) -> Result<Vec<ClientWindow>, PlatformError>;

    async fn focus(&self, client_id: &str) -> Result<(), PlatformError>;

    async fn open(&self, url: &str) -> Result<(), PlatformError>;
}

/// Result of dispatching a notification intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Shown,
    /// The platform cannot show notifications; nothing was done
    Unsupported,
    /// The platform refused; logged and otherwise ignored
    Failed,
}

/// What a notification click did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickDecision {
    /// An existing window already showed the target and was focused
    Focus { client_id: String },
    /// A new window was opened at the target
    Open { url: String },
}

/// Shows notifications and routes clicks back into the application
pub struct NotificationDispatcher<P> {
    platform: P,
    config: NotificationConfig,
}

impl<P: NotificationPlatform> NotificationDispatcher<P> {
    pub const fn new(platform: P, config: NotificationConfig) -> Self {
        Self { platform, config }
    }

    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Options handed to the display API for `intent`
    pub fn options_for(&self, intent: &NotificationIntent) -> NotificationOptions {
        NotificationOptions {
            body: intent.body.clone(),
            icon: self.config.icon.clone(),
            badge: self.config.badge.clone(),
            vibrate: self.config.vibrate.clone(),
            data: NotificationData {
                url: intent.target_url.clone(),
            },
        }
    }

    /// Show `intent`, degrading to a no-op when notifications are unavailable
    pub async fn dispatch(&self, intent: &NotificationIntent) -> DispatchOutcome {
        if !self.platform.supports_notifications() {
            tracing::debug!("Notifications unsupported, dropping '{}'", intent.title);
            return DispatchOutcome::Unsupported;
        }

        let options = self.options_for(intent);
        match self.platform.show(&intent.title, &options).await {
            Ok(()) => DispatchOutcome::Shown,
            Err(PlatformError::Unsupported(feature)) => {
                tracing::debug!("Notification feature unsupported: {feature}");
                DispatchOutcome::Unsupported
            }
            Err(error) => {
                tracing::warn!("Failed to show notification: {error}");
                DispatchOutcome::Failed
            }
        }
    }

    /// Handle a notification click: dismiss it, then focus or open exactly one window
    pub async fn on_click<C: ClientWindows>(
        &self,
        click: &NotificationClick,
        clients: &C,
    ) -> ClickDecision {
        if let Err(error) = self.platform.close(&click.notification_id).await {
            tracing::debug!("Failed to close notification: {error}");
        }

        let target = click.target_url.as_deref().unwrap_or(DEFAULT_TARGET_URL);
        let windows = clients.list().await.unwrap_or_else(|error| {
            tracing::warn!("Failed to enumerate client windows: {error}");
            Vec::new()
        });

        match decide_click(target, &windows, &self.config.app_origin) {
            ClickDecision::Focus { client_id } => match clients.focus(&client_id).await {
                Ok(()) => ClickDecision::Focus { client_id },
                Err(error) => {
                    tracing::warn!("Failed to focus client window, opening instead: {error}");
                    let url = resolve_target(target, &self.config.app_origin);
                    open_window(clients, url).await
                }
            },
            ClickDecision::Open { url } => open_window(clients, url).await,
        }
    }
}

async fn open_window<C: ClientWindows>(clients: &C, url: String) -> ClickDecision {
    if let Err(error) = clients.open(&url).await {
        tracing::warn!("Failed to open client window at {url}: {error}");
    }
    ClickDecision::Open { url }
}

/// Pick the window to focus for `target`, or the URL to open.
///
/// Relative targets are resolved against `app_origin`; fragments are ignored
/// when comparing. A focused matching window wins over an unfocused one.
pub fn decide_click(target: &str, clients: &[ClientWindow], app_origin: &str) -> ClickDecision {
    let resolved = resolve_target(target, app_origin);
    let matches = |client: &&ClientWindow| urls_match(&client.url, &resolved);

    clients
        .iter()
        .filter(matches)
        .find(|client| client.focused)
        .or_else(|| clients.iter().find(matches))
        .map_or(ClickDecision::Open { url: resolved.clone() }, |client| {
            ClickDecision::Focus {
                client_id: client.id.clone(),
            }
        })
}

fn resolve_target(target: &str, app_origin: &str) -> String {
    Url::parse(app_origin)
        .and_then(|origin| origin.join(target))
        .map_or_else(|_| target.to_string(), String::from)
}

fn urls_match(client_url: &str, target: &str) -> bool {
    match (Url::parse(client_url), Url::parse(target)) {
        (Ok(mut client), Ok(mut target)) => {
            client.set_fragment(None);
            target.set_fragment(None);
            client == target
        }
        _ => client_url == target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    const ORIGIN: &str = "https://retrophoto.example.com";

    #[derive(Default)]
    struct RecordingPlatform {
        unsupported: bool,
        shown: Mutex<Vec<(String, NotificationOptions)>>,
        closed: Mutex<Vec<String>>,
    }

    impl NotificationPlatform for RecordingPlatform {
        fn supports_notifications(&self) -> bool {
            !self.unsupported
        }

        async fn show(
            &self,
            title: &str,
            options: &NotificationOptions,
        ) -> Result<(), PlatformError> {
            self.shown
                .lock()
                .unwrap()
                .push((title.to_string(), options.clone()));
            Ok(())
        }

        async fn close(&self, notification_id: &str) -> Result<(), PlatformError> {
            self.closed
                .lock()
                .unwrap()
                .push(notification_id.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeClients {
        windows: Vec<ClientWindow>,
        focus_fails: bool,
        focused: Mutex<Vec<String>>,
        opened: Mutex<Vec<String>>,
    }

    impl FakeClients {
        fn with_window(id: &str, url: &str) -> Self {
            Self {
                windows: vec![window(id, url, false)],
                ..Self::default()
            }
        }
    }

    impl ClientWindows for FakeClients {
        async fn list(&self) -> Result<Vec<ClientWindow>, PlatformError> {
            Ok(self.windows.clone())
        }

        async fn focus(&self, client_id: &str) -> Result<(), PlatformError> {
            if self.focus_fails {
                return Err(PlatformError::Failed("window gone".to_string()));
            }
            self.focused.lock().unwrap().push(client_id.to_string());
            Ok(())
        }

        async fn open(&self, url: &str) -> Result<(), PlatformError> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn window(id: &str, url: &str, focused: bool) -> ClientWindow {
        ClientWindow {
            id: id.to_string(),
            url: url.to_string(),
            focused,
        }
    }

    fn dispatcher(platform: RecordingPlatform) -> NotificationDispatcher<RecordingPlatform> {
        NotificationDispatcher::new(
            platform,
            NotificationConfig {
                app_origin: ORIGIN.to_string(),
                ..NotificationConfig::default()
            },
        )
    }

    fn click(target_url: Option<&str>) -> NotificationClick {
        NotificationClick {
            notification_id: "n-1".to_string(),
            target_url: target_url.map(ToString::to_string),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_shows_notification_with_options() {
        let dispatcher = dispatcher(RecordingPlatform::default());
        let intent = NotificationIntent::new("RetroPhoto", "Done!", "/result/1");

        assert_eq!(dispatcher.dispatch(&intent).await, DispatchOutcome::Shown);

        let shown = dispatcher.platform().shown.lock().unwrap().clone();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, "RetroPhoto");
        assert_eq!(shown[0].1.body, "Done!");
        assert_eq!(shown[0].1.data.url, "/result/1");
        assert_eq!(shown[0].1.vibrate, vec![100, 50, 100]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_without_support_is_noop() {
        let dispatcher = dispatcher(RecordingPlatform {
            unsupported: true,
            ..RecordingPlatform::default()
        });

        let outcome = dispatcher.dispatch(&NotificationIntent::default()).await;

        assert_eq!(outcome, DispatchOutcome::Unsupported);
        assert!(dispatcher.platform().shown.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn click_focuses_existing_window() {
        let dispatcher = dispatcher(RecordingPlatform::default());
        let clients = FakeClients::with_window("w-1", "https://retrophoto.example.com/foo");

        let decision = dispatcher.on_click(&click(Some("/foo")), &clients).await;

        assert_eq!(
            decision,
            ClickDecision::Focus {
                client_id: "w-1".to_string()
            }
        );
        assert_eq!(*clients.focused.lock().unwrap(), vec!["w-1".to_string()]);
        assert!(clients.opened.lock().unwrap().is_empty());
        assert_eq!(
            *dispatcher.platform().closed.lock().unwrap(),
            vec!["n-1".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn click_opens_window_when_none_match() {
        let dispatcher = dispatcher(RecordingPlatform::default());
        let clients = FakeClients::with_window("w-1", "https://retrophoto.example.com/pricing");

        let decision = dispatcher.on_click(&click(Some("/foo")), &clients).await;

        assert_eq!(
            decision,
            ClickDecision::Open {
                url: "https://retrophoto.example.com/foo".to_string()
            }
        );
        assert!(clients.focused.lock().unwrap().is_empty());
        assert_eq!(clients.opened.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn click_without_target_uses_root() {
        let dispatcher = dispatcher(RecordingPlatform::default());
        let clients = FakeClients::default();

        let decision = dispatcher.on_click(&click(None), &clients).await;

        assert_eq!(
            decision,
            ClickDecision::Open {
                url: "https://retrophoto.example.com/".to_string()
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_focus_falls_back_to_single_open() {
        let dispatcher = dispatcher(RecordingPlatform::default());
        let clients = FakeClients {
            focus_fails: true,
            ..FakeClients::with_window("w-1", "https://retrophoto.example.com/foo")
        };

        let decision = dispatcher.on_click(&click(Some("/foo")), &clients).await;

        assert!(matches!(decision, ClickDecision::Open { .. }));
        assert!(clients.focused.lock().unwrap().is_empty());
        assert_eq!(clients.opened.lock().unwrap().len(), 1);
    }

    #[test]
    fn decide_click_prefers_focused_match() {
        let clients = vec![
            window("a", "https://retrophoto.example.com/foo", false),
            window("b", "https://retrophoto.example.com/foo#compare", true),
        ];
        assert_eq!(
            decide_click("/foo", &clients, ORIGIN),
            ClickDecision::Focus {
                client_id: "b".to_string()
            }
        );
    }

    #[test]
    fn decide_click_ignores_other_origins() {
        let clients = vec![window("a", "https://elsewhere.example.com/foo", true)];
        assert!(matches!(
            decide_click("/foo", &clients, ORIGIN),
            ClickDecision::Open { .. }
        ));
    }

    #[test]
    fn decide_click_accepts_absolute_targets() {
        let clients = vec![window("a", "https://retrophoto.example.com/result/9", false)];
        assert_eq!(
            decide_click("https://retrophoto.example.com/result/9", &clients, ORIGIN),
            ClickDecision::Focus {
                client_id: "a".to_string()
            }
        );
    }
}
