//! Conversational responder backed by an OpenAI-Assistants-style thread API.
//!
//! Each sender gets one backend thread, created on first contact and
//! remembered in a [`SessionStore`]. Every inbound message is appended to
//! that thread, a run is started, and the run is polled until it finishes.
//!
//! Polling yields to the runtime between attempts, backs off up to a cap,
//! and is bounded by a maximum total wait. A run that outlives the bound
//! is cancelled on the backend on a best-effort basis.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wabridge_config::AssistantConfig;
use wabridge_core::error::ResponderError;
use wabridge_core::message::SenderIdentity;
use wabridge_core::responder::Responder;
use wabridge_core::session::SessionStore;

/// How run status is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            initial_interval: Duration::from_millis(config.poll_interval_ms),
            max_interval: Duration::from_millis(config.max_poll_interval_ms),
            max_wait: Duration::from_secs(config.max_wait_secs),
        }
    }

    /// Doubling backoff, capped at `max_interval`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_interval)
    }
}

// --- Backend API types ---

#[derive(Debug, Deserialize)]
struct Thread {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Run {
    id: String,
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    text: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: String,
}

/// Responder that delegates to an assistant backend.
pub struct AssistantResponder {
    base_url: String,
    api_key: String,
    assistant_id: String,
    client: reqwest::Client,
    sessions: Arc<dyn SessionStore>,
    poll: PollPolicy,
    personalize: bool,
    /// Serializes first contact per sender so one thread is created.
    first_contact: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AssistantResponder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
        sessions: Arc<dyn SessionStore>,
        request_timeout: Duration,
    ) -> Result<Self, ResponderError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ResponderError::BackendUnavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            client,
            sessions,
            poll: PollPolicy {
                initial_interval: Duration::from_millis(500),
                max_interval: Duration::from_secs(4),
                max_wait: Duration::from_secs(60),
            },
            personalize: false,
            first_contact: Mutex::new(HashMap::new()),
        })
    }

    /// Build from validated configuration.
    pub fn from_config(
        config: &AssistantConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, ResponderError> {
        let api_key = config.api_key.clone().unwrap_or_default();
        let assistant_id = config.assistant_id.clone().unwrap_or_default();
        Ok(Self::new(
            config.base_url.clone(),
            api_key,
            assistant_id,
            sessions,
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_poll_policy(PollPolicy::from_config(config))
        .with_personalization(config.personalize))
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Tell the assistant the sender's display name on every run.
    pub fn with_personalization(mut self, enabled: bool) -> Self {
        self.personalize = enabled;
        self
    }

    // --- HTTP plumbing ---

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn decode<T: DeserializeOwned>(
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, ResponderError> {
        let response = response.map_err(|e| ResponderError::BackendUnavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Assistant backend returned error");
            return Err(ResponderError::BackendUnavailable(format!(
                "status {}: {body}",
                status.as_u16()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ResponderError::BackendUnavailable(format!("Failed to parse response: {e}")))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ResponderError> {
        Self::decode(self.request(reqwest::Method::POST, path).json(&body).send().await).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ResponderError> {
        Self::decode(self.request(reqwest::Method::GET, path).send().await).await
    }

    // --- Sessions ---

    /// The sender's thread id, creating the thread on first contact.
    async fn session_for(&self, sender: &SenderIdentity) -> Result<String, ResponderError> {
        if let Some(thread_id) = self.sessions.get(&sender.id).await? {
            info!(
                name = %sender.display_name,
                wa_id = %sender.id,
                "Retrieving existing thread"
            );
            return Ok(thread_id);
        }

        let lock = {
            let mut locks = self.first_contact.lock().await;
            locks.entry(sender.id.clone()).or_default().clone()
        };

        let result = {
            let _guard = lock.lock().await;
            self.create_session(sender).await
        };

        // Waiters hold clones, so only the last holder drops the entry.
        let mut locks = self.first_contact.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&sender.id);
        }
        drop(lock);
        drop(locks);
        result
    }

    /// Must run under the sender's first-contact lock.
    async fn create_session(&self, sender: &SenderIdentity) -> Result<String, ResponderError> {
        // Another request may have finished first contact while we waited.
        if let Some(thread_id) = self.sessions.get(&sender.id).await? {
            return Ok(thread_id);
        }

        info!(
            name = %sender.display_name,
            wa_id = %sender.id,
            "Creating new thread"
        );
        let thread: Thread = self.post_json("/threads", serde_json::json!({})).await?;
        Ok(self.sessions.put_if_absent(&sender.id, &thread.id).await?)
    }

    // --- Runs ---

    async fn start_run(&self, thread_id: &str, sender: &SenderIdentity) -> Result<Run, ResponderError> {
        let mut body = serde_json::json!({ "assistant_id": self.assistant_id });
        if self.personalize {
            body["additional_instructions"] = serde_json::json!(format!(
                "You are having a conversation with {}",
                sender.display_name
            ));
        }
        self.post_json(&format!("/threads/{thread_id}/runs"), body).await
    }

    /// Poll until the run completes or reaches a terminal failure.
    async fn wait_for_run(&self, thread_id: &str, mut run: Run) -> Result<(), ResponderError> {
        let mut interval = self.poll.initial_interval;
        loop {
            match run.status.as_str() {
                "completed" => return Ok(()),
                "queued" | "in_progress" | "cancelling" => {
                    debug!(run_id = %run.id, status = %run.status, "Run pending");
                }
                other => {
                    let detail = run.last_error.map(|e| e.message).unwrap_or_default();
                    warn!(run_id = %run.id, status = other, detail = %detail, "Run did not complete");
                    return Err(ResponderError::RunFailed {
                        run_id: run.id,
                        status: other.to_string(),
                    });
                }
            }

            tokio::time::sleep(interval).await;
            interval = self.poll.next_interval(interval);
            run = self
                .get_json(&format!("/threads/{thread_id}/runs/{}", run.id))
                .await?;
        }
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) {
        let path = format!("/threads/{thread_id}/runs/{run_id}/cancel");
        if let Err(e) = self
            .post_json::<serde_json::Value>(&path, serde_json::json!({}))
            .await
        {
            warn!(run_id, error = %e, "Failed to cancel stalled run");
        }
    }

    /// Newest assistant text in the thread.
    async fn latest_reply(&self, thread_id: &str) -> Result<String, ResponderError> {
        let list: MessageList = self
            .get_json(&format!("/threads/{thread_id}/messages?order=desc&limit=20"))
            .await?;

        list.data
            .into_iter()
            .filter(|m| m.role == "assistant")
            .find_map(|m| m.content.into_iter().find_map(|c| c.text.map(|t| t.value)))
            .ok_or(ResponderError::EmptyReply)
    }
}

#[async_trait]
impl Responder for AssistantResponder {
    fn name(&self) -> &str {
        "assistant"
    }

    async fn generate(
        &self,
        text: &str,
        sender: &SenderIdentity,
    ) -> Result<String, ResponderError> {
        let thread_id = self.session_for(sender).await?;

        self.post_json::<serde_json::Value>(
            &format!("/threads/{thread_id}/messages"),
            serde_json::json!({ "role": "user", "content": text }),
        )
        .await?;

        let run = self.start_run(&thread_id, sender).await?;
        let run_id = run.id.clone();

        match tokio::time::timeout(self.poll.max_wait, self.wait_for_run(&thread_id, run)).await {
            Ok(outcome) => outcome?,
            Err(_) => {
                warn!(run_id = %run_id, "Run exceeded maximum wait, cancelling");
                self.cancel_run(&thread_id, &run_id).await;
                return Err(ResponderError::TimedOut {
                    waited_secs: self.poll.max_wait.as_secs(),
                });
            }
        }

        let reply = self.latest_reply(&thread_id).await?;
        info!(thread_id = %thread_id, reply_len = reply.len(), "Generated message");
        Ok(reply)
    }

    fn emits_markdown(&self) -> bool {
        true
    }
}
