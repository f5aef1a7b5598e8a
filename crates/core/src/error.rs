//! Error types for the wabridge domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] aggregates them.

use thiserror::Error;

/// The top-level error type for all wabridge operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inbound webhook errors ---
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    // --- Outbound delivery errors ---
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    // --- Reply generation errors ---
    #[error("Responder error: {0}")]
    Responder(#[from] ResponderError),

    // --- Session store errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures that terminate an inbound webhook request.
///
/// These are never retried; each maps to a direct HTTP error response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid JSON provided: {0}")]
    MalformedPayload(String),

    #[error("Not a WhatsApp API event: {0}")]
    UnrecognizedEvent(String),
}

impl WebhookError {
    /// HTTP status code returned to the platform for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidSignature => 403,
            Self::MalformedPayload(_) => 400,
            Self::UnrecognizedEvent(_) => 404,
        }
    }

    /// Short human-readable message for the response body.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "Invalid signature",
            Self::MalformedPayload(_) => "Invalid JSON provided",
            Self::UnrecognizedEvent(_) => "Not a WhatsApp API event",
        }
    }
}

/// Outbound send failures, classified as `timeout` or `request_error`.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Failed to send message (status: {status:?}): {reason}")]
    RequestFailed { status: Option<u16>, reason: String },
}

impl DeliveryError {
    /// Classification label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::RequestFailed { .. } => "request_error",
        }
    }

    /// HTTP semantics of the failure: 408 for timeouts, 500 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Timeout(_) => 408,
            Self::RequestFailed { .. } => 500,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "Request timed out",
            Self::RequestFailed { .. } => "Failed to send message",
        }
    }
}

#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("Conversational backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Assistant run {run_id} ended with status {status}")]
    RunFailed { run_id: String, status: String },

    #[error("Assistant run did not complete within {waited_secs}s")]
    TimedOut { waited_secs: u64 },

    #[error("Assistant produced no reply")]
    EmptyReply,

    #[error("Session lookup failed: {0}")]
    Session(#[from] SessionError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid webhook payload: missing {0}")]
    InvalidPayload(String),
}
