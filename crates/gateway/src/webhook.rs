//! `/webhook` handlers: the registration handshake and inbound events.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use wabridge_channels::whatsapp::codec::{self, EventKind, WebhookEvent};
use wabridge_channels::whatsapp::format::normalize_markup;
use wabridge_core::error::WebhookError;
use wabridge_core::message::{InboundMessage, OutboundMessage};

use crate::SharedState;

/// Outcome of a subscription handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// Echo the challenge back
    Accepted(String),
    Rejected,
    MissingParameters,
}

/// Decide a `GET /webhook` handshake.
///
/// Both `mode` and `token` must be present and non-empty. The challenge is
/// echoed only for `mode == "subscribe"` with the expected token.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: &str,
) -> Handshake {
    let mode = mode.filter(|m| !m.is_empty());
    let token = token.filter(|t| !t.is_empty());
    match (mode, token) {
        (Some(mode), Some(token)) => {
            if mode == "subscribe" && token == expected_token {
                Handshake::Accepted(challenge.unwrap_or_default().to_string())
            } else {
                Handshake::Rejected
            }
        }
        _ => Handshake::MissingParameters,
    }
}

impl IntoResponse for Handshake {
    fn into_response(self) -> Response {
        match self {
            Handshake::Accepted(challenge) => (StatusCode::OK, challenge).into_response(),
            Handshake::Rejected => error_response(StatusCode::FORBIDDEN, "Verification failed"),
            Handshake::MissingParameters => {
                error_response(StatusCode::BAD_REQUEST, "Missing parameters")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

pub async fn handshake_handler(
    State(state): State<SharedState>,
    Query(query): Query<SubscriptionQuery>,
) -> Handshake {
    let outcome = verify_subscription(
        query.mode.as_deref(),
        query.verify_token.as_deref(),
        query.challenge.as_deref(),
        &state.verify_token,
    );
    match &outcome {
        Handshake::Accepted(_) => info!("WEBHOOK_VERIFIED"),
        Handshake::Rejected => info!("VERIFICATION_FAILED"),
        Handshake::MissingParameters => info!("MISSING_PARAMETER"),
    }
    outcome
}

/// `POST /webhook`. The signature has already been checked by middleware.
pub async fn event_handler(State(state): State<SharedState>, body: Bytes) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "Failed to decode JSON");
            return reject(WebhookError::MalformedPayload(e.to_string()));
        }
    };

    if codec::is_status_update_value(&value) {
        info!("Received a WhatsApp status update");
        return ok_response();
    }

    let event = match WebhookEvent::from_value(value) {
        Ok(event) => event,
        Err(e) => return reject(WebhookError::UnrecognizedEvent(e.to_string())),
    };

    match event.classify() {
        EventKind::StatusUpdate => {
            info!("Received a WhatsApp status update");
            return ok_response();
        }
        EventKind::Unrecognized => {
            return reject(WebhookError::UnrecognizedEvent(
                "no entry[0].changes[0].value.messages".into(),
            ));
        }
        EventKind::Message => {}
    }

    let inbound = match codec::extract_inbound_message(&event) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "Ignoring message that carries no text");
            return ok_response();
        }
    };

    if let Some(id) = inbound.message_id.as_deref() {
        if !state.dedupe.first_sighting(id) {
            info!(message_id = id, "Duplicate delivery ignored");
            return ok_response();
        }
    }

    reply(&state, inbound).await;
    ok_response()
}

/// Generate and deliver the reply. Failures are logged, never surfaced.
async fn reply(state: &SharedState, inbound: InboundMessage) {
    info!(
        sender = %inbound.sender.id,
        name = %inbound.sender.display_name,
        text_len = inbound.text.len(),
        "Inbound message"
    );

    let generated = match state
        .responder
        .generate(&inbound.text, &inbound.sender)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            error!(responder = state.responder.name(), error = %e, "Reply generation failed");
            return;
        }
    };

    let body = if state.responder.emits_markdown() {
        normalize_markup(&generated)
    } else {
        generated
    };

    let recipient = state
        .default_recipient
        .clone()
        .unwrap_or_else(|| inbound.sender.id.clone());
    let outbound = OutboundMessage::text(recipient, body);

    match state.channel.send(&outbound).await {
        Ok(receipt) => debug!(status = receipt.status, "Reply delivered"),
        Err(e) => error!(
            kind = e.kind(),
            status = e.status_code(),
            error = %e,
            "{}",
            e.public_message()
        ),
    }
}

pub(crate) fn ok_response() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "status": "error", "message": message })),
    )
        .into_response()
}

pub(crate) fn reject(err: WebhookError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
    error_response(status, err.public_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_accepts_matching_token() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("tok"), Some("X"), "tok"),
            Handshake::Accepted("X".into())
        );
    }

    #[test]
    fn handshake_rejects_wrong_token_or_mode() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("wrong"), Some("X"), "tok"),
            Handshake::Rejected
        );
        assert_eq!(
            verify_subscription(Some("unsubscribe"), Some("tok"), Some("X"), "tok"),
            Handshake::Rejected
        );
    }

    #[test]
    fn handshake_needs_mode_and_token() {
        assert_eq!(
            verify_subscription(None, None, Some("X"), "tok"),
            Handshake::MissingParameters
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), None, Some("X"), "tok"),
            Handshake::MissingParameters
        );
        assert_eq!(
            verify_subscription(Some(""), Some("tok"), Some("X"), "tok"),
            Handshake::MissingParameters
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), Some(""), Some("X"), ""),
            Handshake::MissingParameters
        );
    }

    #[test]
    fn rejection_status_follows_error() {
        assert_eq!(reject(WebhookError::InvalidSignature).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            reject(WebhookError::MalformedPayload("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            reject(WebhookError::UnrecognizedEvent("x".into())).status(),
            StatusCode::NOT_FOUND
        );
    }
}
