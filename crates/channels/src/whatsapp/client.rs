//! Delivery client for the Graph API `/messages` endpoint.
//!
//! One POST per call, bearer-token auth, fixed timeout. No retries: a
//! failed send is classified, logged and returned to the caller.

use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{error, info};
use wabridge_core::error::{ChannelError, DeliveryError};
use wabridge_core::message::DeliveryReceipt;

use super::codec::Envelope;

pub struct CloudApiClient {
    messages_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl CloudApiClient {
    pub fn new(
        messages_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            messages_url: messages_url.into(),
            access_token: access_token.into(),
            client,
        })
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    /// POST one envelope.
    pub async fn send_envelope(&self, envelope: &Envelope) -> Result<DeliveryReceipt, DeliveryError> {
        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, "application/json")
            .json(envelope)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            error!(
                status = status.as_u16(),
                body = %body,
                recipient = %envelope.recipient(),
                "Send API rejected message"
            );
            return Err(DeliveryError::RequestFailed {
                status: Some(status.as_u16()),
                reason: body,
            });
        }

        info!(
            status = status.as_u16(),
            content_type = content_type.as_deref().unwrap_or(""),
            body = %body,
            "Message sent"
        );

        Ok(DeliveryReceipt {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

fn classify_transport_error(e: reqwest::Error) -> DeliveryError {
    if e.is_timeout() {
        error!(error = %e, "Timeout occurred while sending message");
        DeliveryError::Timeout(e.to_string())
    } else {
        error!(error = %e, "Request failed");
        DeliveryError::RequestFailed {
            status: e.status().map(|s| s.as_u16()),
            reason: e.to_string(),
        }
    }
}

impl std::fmt::Debug for CloudApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudApiClient")
            .field("messages_url", &self.messages_url)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use std::sync::{Arc, Mutex};

    /// A request captured by the fake send API: (Authorization header, JSON body).
    pub type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    #[derive(Clone)]
    struct FakeApi {
        status: StatusCode,
        captured: Captured,
    }

    async fn messages(
        State(api): State<FakeApi>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        api.captured.lock().unwrap().push((auth, body));
        (
            api.status,
            Json(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [{"id": "wamid.reply"}]
            })),
        )
    }

    /// Spawn a fake Graph API answering `status`. Returns its messages URL.
    pub async fn spawn_send_api(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route("/v18.0/{phone_number_id}/messages", post(messages))
            .with_state(FakeApi {
                status,
                captured: captured.clone(),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/v18.0/1098/messages"), captured)
    }

    /// Spawn a server that accepts connections and never answers.
    pub async fn spawn_black_hole() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}/v18.0/1098/messages")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::whatsapp::codec::{build_template_envelope, build_text_envelope};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn successful_send_returns_receipt() {
        let (url, captured) = spawn_send_api(StatusCode::OK).await;
        let client = CloudApiClient::new(url, "EAAB-token", Duration::from_secs(5)).unwrap();

        let receipt = client
            .send_envelope(&build_text_envelope("5511999999999", "HELLO"))
            .await
            .unwrap();

        assert_eq!(receipt.status, 200);
        assert!(receipt.content_type.unwrap().starts_with("application/json"));
        assert!(receipt.body.contains("wamid.reply"));

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0.as_deref(), Some("Bearer EAAB-token"));
        assert_eq!(captured[0].1["to"], "5511999999999");
        assert_eq!(captured[0].1["text"]["body"], "HELLO");
        assert_eq!(captured[0].1["text"]["preview_url"], false);
    }

    #[tokio::test]
    async fn template_envelope_is_posted() {
        let (url, captured) = spawn_send_api(StatusCode::OK).await;
        let client = CloudApiClient::new(url, "t", Duration::from_secs(5)).unwrap();

        client
            .send_envelope(&build_template_envelope("1", "hello_world", "en_US"))
            .await
            .unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured[0].1["type"], "template");
        assert_eq!(captured[0].1["template"]["name"], "hello_world");
    }

    #[tokio::test]
    async fn non_success_status_is_request_error() {
        let (url, _captured) = spawn_send_api(StatusCode::UNAUTHORIZED).await;
        let client = CloudApiClient::new(url, "expired", Duration::from_secs(5)).unwrap();

        let err = client
            .send_envelope(&build_text_envelope("1", "x"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "request_error");
        assert_eq!(err.status_code(), 500);
        assert!(matches!(
            err,
            DeliveryError::RequestFailed {
                status: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out() {
        let url = spawn_black_hole().await;
        let client = CloudApiClient::new(url, "t", Duration::from_millis(200)).unwrap();

        let err = client
            .send_envelope(&build_text_envelope("1", "x"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.status_code(), 408);
        assert_eq!(err.public_message(), "Request timed out");
    }

    #[tokio::test]
    async fn connection_refused_is_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = CloudApiClient::new(
            format!("http://{addr}/v18.0/1/messages"),
            "t",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client
            .send_envelope(&build_text_envelope("1", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::RequestFailed { status: None, .. }));
    }

    #[test]
    fn debug_redacts_token() {
        let client =
            CloudApiClient::new("http://localhost/x", "EAAB-secret", Duration::from_secs(1)).unwrap();
        assert!(!format!("{client:?}").contains("EAAB-secret"));
    }
}
