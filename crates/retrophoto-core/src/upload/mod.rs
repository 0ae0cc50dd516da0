//! Delivery of queued uploads to the RetroPhoto upload API.
//!
//! `UploadTransport` is the seam the sync coordinator delivers through;
//! `HttpUploadClient` is the production implementation.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::models::QueueItem;
use crate::util::{http_base_url, non_blank, response_excerpt};

const UPLOAD_ROUTE: &str = "/api/upload";

/// Why a delivery attempt did not succeed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Network or server trouble; worth retrying later
    #[error("Delivery failed: {0}")]
    Transient(String),
    /// The endpoint refused the upload; retrying cannot help
    #[error("Upload rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl DeliveryError {
    /// Whether a later attempt could succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Acknowledgement returned by the upload endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Server-side upload or session identifier, when the endpoint returns one
    pub remote_id: Option<String>,
}

/// Something that can deliver a queued upload over the network
#[allow(async_fn_in_trait)]
pub trait UploadTransport {
    async fn deliver(&self, item: &QueueItem) -> std::result::Result<DeliveryReceipt, DeliveryError>;
}

/// HTTP client for the upload endpoint
#[derive(Debug, Clone)]
pub struct HttpUploadClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUploadClient {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into().as_str())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("Failed to construct HTTP client: {error}")))?;
        Ok(Self { base_url, client })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn upload_url(&self) -> String {
        format!("{}{}", self.base_url, UPLOAD_ROUTE)
    }
}

impl UploadTransport for HttpUploadClient {
    async fn deliver(&self, item: &QueueItem) -> std::result::Result<DeliveryReceipt, DeliveryError> {
        let payload = &item.payload;
        let mut request = self
            .client
            .post(self.upload_url())
            .header(CONTENT_TYPE, payload.content_type.as_str())
            .header(ACCEPT, "application/json")
            .header("X-Fingerprint", payload.fingerprint.as_str())
            .header("X-File-Name", payload.file_name.as_str())
            .header("X-Upload-Id", item.id.as_str());
        if let Some(session_id) = &payload.session_id {
            request = request.header("X-Session-Id", session_id.as_str());
        }

        let response = request
            .body(payload.bytes.clone())
            .send()
            .await
            .map_err(|error| DeliveryError::Transient(format!("Upload request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let body = response.text().await.unwrap_or_default();
        Ok(parse_receipt(&body))
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_receipt(body: &str) -> DeliveryReceipt {
    let remote_id = serde_json::from_str::<UploadResponse>(body)
        .ok()
        .and_then(|response| response.session_id.or(response.id))
        .and_then(|id| non_blank(Some(&id)));
    DeliveryReceipt { remote_id }
}

fn classify_failure(status: StatusCode, body: &str) -> DeliveryError {
    let detail = serde_json::from_str::<UploadErrorBody>(body)
        .ok()
        .and_then(|payload| payload.message.or(payload.error))
        .map_or_else(|| response_excerpt(body), |message| response_excerpt(&message));
    let code = status.as_u16();

    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        let message = if detail.is_empty() {
            format!("HTTP {code}")
        } else {
            format!("HTTP {code}: {detail}")
        };
        DeliveryError::Transient(message)
    } else {
        let message = if detail.is_empty() {
            status.canonical_reason().unwrap_or("no response body").to_string()
        } else {
            detail
        };
        DeliveryError::Rejected {
            status: code,
            message,
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(Error::Config("API base URL must not be empty".to_string()));
    }
    http_base_url(raw).ok_or_else(|| {
        Error::Config(format!(
            "API base URL must be an absolute http:// or https:// URL, got '{raw}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueueItemId, QueueStatus, UploadPayload};
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::net::TcpListener;

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn queued(session_id: Option<&str>) -> QueueItem {
        let mut payload =
            UploadPayload::new("grandma.jpg", "image/jpeg", b"jpeg-bytes".to_vec(), "fp-1")
                .unwrap();
        if let Some(session_id) = session_id {
            payload = payload.with_session_id(session_id);
        }
        QueueItem {
            id: QueueItemId::new(),
            payload,
            attempts: 0,
            enqueued_at: 1_000,
            updated_at: 1_000,
            status: QueueStatus::InFlight,
            last_error: None,
        }
    }

    fn client_for(server: &MockServer) -> HttpUploadClient {
        HttpUploadClient::new(server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn deliver_posts_photo_with_upload_headers() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start_async().await;
        let item = queued(Some("session-7"));
        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/upload")
                    .header("content-type", "image/jpeg")
                    .header("accept", "application/json")
                    .header("x-fingerprint", "fp-1")
                    .header("x-file-name", "grandma.jpg")
                    .header("x-upload-id", item.id.as_str())
                    .header("x-session-id", "session-7")
                    .body("jpeg-bytes");
                then.status(201).json_body(json!({ "session_id": "abc12" }));
            })
            .await;

        let receipt = client_for(&server).deliver(&item).await.unwrap();

        upload.assert_async().await;
        assert_eq!(
            receipt,
            DeliveryReceipt {
                remote_id: Some("abc12".to_string())
            }
        );
    }

    #[tokio::test]
    async fn deliver_omits_session_header_without_session() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/upload")
                    .header_missing("x-session-id");
                then.status(200).body("");
            })
            .await;

        let receipt = client_for(&server).deliver(&queued(None)).await.unwrap();

        upload.assert_async().await;
        assert_eq!(receipt, DeliveryReceipt::default());
    }

    #[tokio::test]
    async fn deliver_maps_server_errors_to_transient() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/upload");
                then.status(503);
            })
            .await;

        let error = client_for(&server)
            .deliver(&queued(None))
            .await
            .unwrap_err();

        assert_eq!(error, DeliveryError::Transient("HTTP 503".to_string()));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn deliver_maps_client_errors_to_rejection() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/upload");
                then.status(413)
                    .json_body(json!({ "error": "File exceeds 20MB" }));
            })
            .await;

        let error = client_for(&server)
            .deliver(&queued(None))
            .await
            .unwrap_err();

        assert_eq!(
            error,
            DeliveryError::Rejected {
                status: 413,
                message: "File exceeds 20MB".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn deliver_treats_refused_connection_as_transient() {
        if !can_bind_localhost() {
            eprintln!("Skipping connection test: cannot bind to localhost");
            return;
        }

        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client =
            HttpUploadClient::new(format!("http://127.0.0.1:{port}"), Duration::from_secs(5))
                .unwrap();

        let error = client.deliver(&queued(None)).await.unwrap_err();

        assert!(error.is_retryable(), "unexpected error: {error:?}");
    }

    #[test]
    fn rejections_without_body_use_reason_phrase() {
        assert_eq!(
            classify_failure(StatusCode::NOT_FOUND, ""),
            DeliveryError::Rejected {
                status: 404,
                message: "Not Found".to_string(),
            }
        );
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("example.com").is_err());
    }

    #[test]
    fn client_builds_upload_url() {
        let client =
            HttpUploadClient::new("https://retrophoto.example.com/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.base_url(), "https://retrophoto.example.com");
        assert_eq!(
            client.upload_url(),
            "https://retrophoto.example.com/api/upload"
        );
    }

    #[test]
    fn server_errors_are_transient() {
        let error = classify_failure(StatusCode::BAD_GATEWAY, "");
        assert_eq!(error, DeliveryError::Transient("HTTP 502".to_string()));
        assert_eq!(
            classify_failure(StatusCode::SERVICE_UNAVAILABLE, r#"{"message":"maintenance"}"#),
            DeliveryError::Transient("HTTP 503: maintenance".to_string())
        );
        assert!(error.is_retryable());
        assert!(classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down").is_retryable());
        assert!(classify_failure(StatusCode::REQUEST_TIMEOUT, "").is_retryable());
    }

    #[test]
    fn client_errors_are_rejections() {
        let error = classify_failure(
            StatusCode::PAYLOAD_TOO_LARGE,
            r#"{"error":"File exceeds 20MB"}"#,
        );
        assert_eq!(
            error,
            DeliveryError::Rejected {
                status: 413,
                message: "File exceeds 20MB".to_string(),
            }
        );
        assert!(!error.is_retryable());
    }

    #[test]
    fn receipt_prefers_session_id() {
        assert_eq!(
            parse_receipt(r#"{"id":"u1","session_id":"s1"}"#).remote_id.as_deref(),
            Some("s1")
        );
        assert_eq!(parse_receipt(r#"{"id":"u1"}"#).remote_id.as_deref(), Some("u1"));
        assert_eq!(parse_receipt("").remote_id, None);
    }
}
