//! Notification models

use serde::{Deserialize, Serialize};

use crate::util::non_blank;

/// Title used when a push message carries none
pub const DEFAULT_NOTIFICATION_TITLE: &str = "RetroPhoto";
/// Body used when a push message carries none
pub const DEFAULT_NOTIFICATION_BODY: &str = "Your photo has been restored!";
/// Route opened when a notification carries no target
pub const DEFAULT_TARGET_URL: &str = "/";

/// A user-facing signal waiting to be displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    /// Display title
    pub title: String,
    /// Display body
    pub body: String,
    /// Application route to focus or open on click
    pub target_url: String,
}

impl NotificationIntent {
    /// Create a new notification intent
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            target_url: target_url.into(),
        }
    }
}

impl Default for NotificationIntent {
    fn default() -> Self {
        Self::new(
            DEFAULT_NOTIFICATION_TITLE,
            DEFAULT_NOTIFICATION_BODY,
            DEFAULT_TARGET_URL,
        )
    }
}

/// JSON body of a push message; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PushPayload {
    /// Parse the raw push data.
    ///
    /// Missing data yields an empty payload. Data that is not a JSON object is
    /// logged and also treated as empty so the user still gets a notification.
    pub fn from_data(data: Option<&[u8]>) -> Self {
        let Some(data) = data.filter(|data| !data.iter().all(u8::is_ascii_whitespace)) else {
            return Self::default();
        };

        match serde_json::from_slice::<Self>(data) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!("Ignoring malformed push payload: {error}");
                Self::default()
            }
        }
    }

    /// Resolve into a notification intent, filling in defaults
    pub fn into_intent(self) -> NotificationIntent {
        let or_default = |value: Option<String>, default: &str| {
            non_blank(value.as_deref()).unwrap_or_else(|| default.to_string())
        };
        NotificationIntent {
            title: or_default(self.title, DEFAULT_NOTIFICATION_TITLE),
            body: or_default(self.body, DEFAULT_NOTIFICATION_BODY),
            target_url: or_default(self.url, DEFAULT_TARGET_URL),
        }
    }
}

/// Data attached to a displayed notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
}

/// Options handed to the platform notification display API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
}

/// A click on a displayed notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationClick {
    /// Platform handle of the clicked notification
    pub notification_id: String,
    /// `data.url` of the clicked notification, if any
    pub target_url: Option<String>,
}

/// An application window known to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientWindow {
    /// Platform handle used to focus the window
    pub id: String,
    /// Absolute URL currently shown in the window
    pub url: String,
    /// Whether the window currently has focus
    pub focused: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_push_data_uses_defaults() {
        let intent = PushPayload::from_data(None).into_intent();
        assert_eq!(intent, NotificationIntent::default());
        assert_eq!(intent.title, "RetroPhoto");
        assert_eq!(intent.body, "Your photo has been restored!");
        assert_eq!(intent.target_url, "/");
    }

    #[test]
    fn test_partial_push_payload_keeps_given_fields() {
        let intent =
            PushPayload::from_data(Some(br#"{"body":"Done!","url":"/result/abc"}"#)).into_intent();
        assert_eq!(
            intent,
            NotificationIntent::new("RetroPhoto", "Done!", "/result/abc")
        );
    }

    #[test]
    fn test_malformed_push_payload_falls_back() {
        let intent = PushPayload::from_data(Some(b"not json")).into_intent();
        assert_eq!(intent, NotificationIntent::default());
    }

    #[test]
    fn test_blank_fields_fall_back() {
        let intent = PushPayload::from_data(Some(br#"{"title":"  ","body":""}"#)).into_intent();
        assert_eq!(intent, NotificationIntent::default());
    }

    #[test]
    fn test_notification_options_shape() {
        let options = NotificationOptions {
            body: "b".to_string(),
            icon: "/icon.png".to_string(),
            badge: "/badge.png".to_string(),
            vibrate: vec![100, 50, 100],
            data: NotificationData {
                url: "/".to_string(),
            },
        };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["data"]["url"], "/");
        assert_eq!(json["vibrate"][1], 50);
    }
}
