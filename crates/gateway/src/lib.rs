//! HTTP webhook gateway for wabridge.
//!
//! Exposes the WhatsApp webhook (`GET` handshake, signed `POST` events)
//! and a health check. Each inbound text message is answered through the
//! configured responder and delivered through the WhatsApp channel.
//!
//! Built on Axum.

pub mod dedupe;
pub mod webhook;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Json, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use wabridge_channels::whatsapp::signature::SIGNATURE_HEADER;
use wabridge_channels::{SignatureVerifier, WhatsAppChannel, WhatsAppChannelConfig};
use wabridge_config::AppConfig;
use wabridge_core::error::{Error, WebhookError};
use wabridge_core::{Channel, Responder};

use dedupe::RecentMessages;

const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub verify_token: String,
    pub verifier: SignatureVerifier,
    pub responder: Arc<dyn Responder>,
    pub channel: Arc<dyn Channel>,
    /// Fixed reply recipient; the sender when `None`
    pub default_recipient: Option<String>,
    pub dedupe: RecentMessages,
    pub max_body_bytes: usize,
}

impl GatewayState {
    pub fn new(
        verify_token: impl Into<String>,
        verifier: SignatureVerifier,
        responder: Arc<dyn Responder>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            verify_token: verify_token.into(),
            verifier,
            responder,
            channel,
            default_recipient: None,
            dedupe: RecentMessages::new(0),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_default_recipient(mut self, recipient: Option<String>) -> Self {
        self.default_recipient = recipient.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_dedupe_capacity(mut self, capacity: usize) -> Self {
        self.dedupe = RecentMessages::new(capacity);
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// `POST /webhook` sits behind signature verification; the handshake and
/// health check do not.
pub fn build_router(state: SharedState) -> Router {
    let max_body = state.max_body_bytes;
    let events = Router::new()
        .route("/webhook", axum::routing::post(webhook::event_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            signature_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook", get(webhook::handshake_handler))
        .merge(events)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Every collaborator is built once up front; missing secrets or send
/// settings stop startup rather than surfacing per request.
pub async fn start(config: AppConfig) -> wabridge_core::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let verifier = SignatureVerifier::new(config.whatsapp.app_secret.clone().unwrap_or_default())?;
    let verify_token = config
        .whatsapp
        .verify_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::Config {
            message: "VERIFY_TOKEN is not set".into(),
        })?;

    let channel = WhatsAppChannel::new(WhatsAppChannelConfig::from_config(&config.whatsapp)?)?;
    let responder = wabridge_providers::build_from_config(&config).await?;

    let state = GatewayState::new(verify_token, verifier, responder, Arc::new(channel))
        .with_default_recipient(config.whatsapp.recipient_waid.clone())
        .with_dedupe_capacity(config.gateway.dedupe_capacity)
        .with_max_body_bytes(config.gateway.max_body_bytes);
    let app = build_router(Arc::new(state));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check `X-Hub-Signature-256` against the raw body before any parsing.
///
/// The body is buffered, verified, then handed on unchanged.
async fn signature_middleware(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Rejected oversized or unreadable webhook body");
            return webhook::error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large");
        }
    };

    let header = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if !state.verifier.verify_header(&bytes, header) {
        info!("Signature verification failed!");
        return webhook::reject(WebhookError::InvalidSignature);
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
