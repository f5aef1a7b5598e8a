//! End-to-end tests for the wabridge pipeline.
//!
//! A signed webhook event enters the gateway router, the static responder
//! produces the reply, and the real WhatsApp channel delivers it to a local
//! stand-in for the Graph API `/messages` endpoint.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    routing::post,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use wabridge_channels::whatsapp::codec::sample_event;
use wabridge_channels::whatsapp::signature::SIGNATURE_HEADER;
use wabridge_channels::{SignatureVerifier, WhatsAppChannel, WhatsAppChannelConfig};
use wabridge_gateway::{GatewayState, build_router};
use wabridge_providers::UppercaseResponder;

const SECRET: &str = "e2e-secret";

#[derive(Default)]
struct GraphApi {
    requests: Mutex<Vec<(Option<String>, Value)>>,
}

async fn messages(
    State(api): State<Arc<GraphApi>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    api.requests.lock().unwrap().push((auth, body));
    (
        StatusCode::OK,
        Json(json!({
            "messaging_product": "whatsapp",
            "messages": [{ "id": "wamid.outbound" }]
        })),
    )
}

async fn spawn_graph_api() -> (String, Arc<GraphApi>) {
    let api = Arc::new(GraphApi::default());
    let app = Router::new()
        .route("/v18.0/{phone_number_id}/messages", post(messages))
        .with_state(api.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v18.0/106540352242922/messages"), api)
}

fn gateway(messages_url: String, recipient: Option<&str>) -> Router {
    let channel = WhatsAppChannel::new(WhatsAppChannelConfig {
        messages_url,
        access_token: "EAAG-test".into(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let state = GatewayState::new(
        "verify",
        SignatureVerifier::new(SECRET).unwrap(),
        Arc::new(UppercaseResponder),
        Arc::new(channel),
    )
    .with_default_recipient(recipient.map(str::to_string))
    .with_dedupe_capacity(16);
    build_router(Arc::new(state))
}

fn signed(event: &Value) -> Request<Body> {
    let body = serde_json::to_vec(event).unwrap();
    let signature = SignatureVerifier::new(SECRET).unwrap().header_value(&body);
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn inbound_text_is_answered_through_graph_api() {
    let (url, api) = spawn_graph_api().await;
    let app = gateway(url, Some("15550001111"));

    let response = app
        .oneshot(signed(&sample_event("5511987654321", "Alice", "what time is it?")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], br#"{"status":"ok"}"#);

    let requests = api.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (auth, envelope) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer EAAG-test"));
    assert_eq!(envelope["messaging_product"], "whatsapp");
    assert_eq!(envelope["recipient_type"], "individual");
    assert_eq!(envelope["to"], "15550001111");
    assert_eq!(envelope["type"], "text");
    assert_eq!(envelope["text"]["preview_url"], false);
    assert_eq!(envelope["text"]["body"], "WHAT TIME IS IT?");
}

#[tokio::test]
async fn retried_delivery_sends_one_reply() {
    let (url, api) = spawn_graph_api().await;
    let app = gateway(url, None);
    let event = sample_event("5511987654321", "Alice", "hi");

    for _ in 0..3 {
        let response = app.clone().oneshot(signed(&event)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let requests = api.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1["to"], "5511987654321");
}

#[tokio::test]
async fn unreachable_graph_api_still_acknowledges_webhook() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = gateway(format!("http://{addr}/v18.0/1/messages"), None);
    let response = app
        .oneshot(signed(&sample_event("5511", "Alice", "hi")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
