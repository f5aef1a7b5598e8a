//! Configuration loading, validation, and management for wabridge.
//!
//! Loads configuration from `~/.wabridge/config.toml`, then applies
//! environment variable overrides (the names the WhatsApp Cloud API
//! quick-start uses: `ACCESS_TOKEN`, `APP_SECRET`, `VERIFY_TOKEN`, ...).
//! The resulting [`AppConfig`] is validated once at startup and passed by
//! reference to every component; nothing reads ambient state afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The root configuration structure.
///
/// Maps directly to `~/.wabridge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp Cloud API credentials and send endpoint
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Which reply generator to use
    #[serde(default)]
    pub responder: ResponderConfig,

    /// Conversational backend settings (used when `responder.kind = "assistant"`)
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Sender → conversation handle persistence
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// How many recent inbound message ids to remember for duplicate
    /// suppression. 0 disables the check.
    #[serde(default = "default_dedupe_capacity")]
    pub dedupe_capacity: usize,

    /// Request body limit in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_dedupe_capacity() -> usize {
    1024
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dedupe_capacity: default_dedupe_capacity(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Graph API bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// App secret used to sign inbound webhook payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,

    /// Shared secret for the one-time webhook registration handshake
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_token: Option<String>,

    /// Business phone number id that sends the replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,

    /// Graph API version segment, e.g. "v18.0"
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Fixed recipient for every reply. When unset, replies go to the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_waid: Option<String>,

    /// Send request timeout
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

fn default_api_version() -> String {
    "v18.0".into()
}
fn default_api_base_url() -> String {
    "https://graph.facebook.com".into()
}
fn default_send_timeout_secs() -> u64 {
    10
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            app_secret: None,
            verify_token: None,
            phone_number_id: None,
            api_version: default_api_version(),
            api_base_url: default_api_base_url(),
            recipient_waid: None,
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("access_token", &redact(&self.access_token))
            .field("app_secret", &redact(&self.app_secret))
            .field("verify_token", &redact(&self.verify_token))
            .field("phone_number_id", &self.phone_number_id)
            .field("api_version", &self.api_version)
            .field("api_base_url", &self.api_base_url)
            .field("recipient_waid", &self.recipient_waid)
            .field("send_timeout_secs", &self.send_timeout_secs)
            .finish()
    }
}

impl WhatsAppConfig {
    /// Full URL of the `/messages` send endpoint.
    pub fn messages_url(&self) -> Option<String> {
        let phone_number_id = self.phone_number_id.as_deref()?;
        Some(format!(
            "{}/{}/{}/messages",
            self.api_base_url.trim_end_matches('/'),
            self.api_version,
            phone_number_id
        ))
    }
}

/// Reply generation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderKind {
    /// Upper-case echo, no I/O
    #[default]
    Static,
    /// Stateful conversational backend keyed by sender
    Assistant,
}

impl std::fmt::Display for ResponderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Assistant => "assistant",
        })
    }
}

impl FromStr for ResponderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "assistant" => Ok(Self::Assistant),
            other => Err(ConfigError::ValidationError(format!(
                "unknown responder kind '{other}' (expected 'static' or 'assistant')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponderConfig {
    #[serde(default)]
    pub kind: ResponderKind,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,

    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,

    /// First delay between run status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound the poll delay backs off to
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,

    /// Give up on a run after this long
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Per-request HTTP timeout for backend calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Tell the assistant the sender's display name on every run
    #[serde(default)]
    pub personalize: bool,
}

fn default_assistant_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_max_poll_interval_ms() -> u64 {
    4_000
}
fn default_max_wait_secs() -> u64 {
    60
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            assistant_id: None,
            base_url: default_assistant_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            max_wait_secs: default_max_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            personalize: false,
        }
    }
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &redact(&self.api_key))
            .field("assistant_id", &self.assistant_id)
            .field("base_url", &self.base_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_interval_ms", &self.max_poll_interval_ms)
            .field("max_wait_secs", &self.max_wait_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("personalize", &self.personalize)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    #[default]
    Sqlite,
    InMemory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default)]
    pub backend: SessionBackend,

    /// SQLite database file. Defaults to `~/.wabridge/sessions.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl SessionsConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("sessions.db"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.wabridge/config.toml),
    /// apply environment overrides, and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// File plus environment overrides, without validation. For commands
    /// that need only part of the configuration (sending, diagnostics).
    pub fn load_unvalidated() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// `~/.wabridge/config.toml`
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Parse configuration from a specific file path.
    ///
    /// Does not validate: required secrets usually arrive through the
    /// environment afterwards.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment overrides. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let wa = &mut self.whatsapp;
        for (key, slot) in [
            ("ACCESS_TOKEN", &mut wa.access_token),
            ("APP_SECRET", &mut wa.app_secret),
            ("VERIFY_TOKEN", &mut wa.verify_token),
            ("PHONE_NUMBER_ID", &mut wa.phone_number_id),
            ("RECIPIENT_WAID", &mut wa.recipient_waid),
        ] {
            if let Some(value) = get(key) {
                *slot = Some(value);
            }
        }
        if let Some(version) = get("VERSION") {
            wa.api_version = version;
        }

        if let Some(key) = get("OPENAI_API_KEY") {
            self.assistant.api_key = Some(key);
        }
        if let Some(id) = get("OPENAI_ASSISTANT_ID") {
            self.assistant.assistant_id = Some(id);
        }
        if let Some(kind) = get("WABRIDGE_RESPONDER") {
            self.responder.kind = kind.parse()?;
        }
        if let Some(host) = get("WABRIDGE_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = get("WABRIDGE_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("WABRIDGE_PORT is not a port number: {port}"))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".wabridge")
    }

    /// Validate the configuration.
    ///
    /// Missing signing or handshake secrets are fatal: verification must
    /// never silently succeed against an empty secret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(&self.whatsapp.app_secret) {
            return Err(ConfigError::MissingSetting("APP_SECRET"));
        }
        if is_blank(&self.whatsapp.verify_token) {
            return Err(ConfigError::MissingSetting("VERIFY_TOKEN"));
        }
        if self.whatsapp.send_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "whatsapp.send_timeout_secs must be > 0".into(),
            ));
        }

        if self.responder.kind == ResponderKind::Assistant {
            if is_blank(&self.assistant.api_key) {
                return Err(ConfigError::MissingSetting("OPENAI_API_KEY"));
            }
            if is_blank(&self.assistant.assistant_id) {
                return Err(ConfigError::MissingSetting("OPENAI_ASSISTANT_ID"));
            }
            if self.assistant.poll_interval_ms == 0 || self.assistant.max_wait_secs == 0 {
                return Err(ConfigError::ValidationError(
                    "assistant.poll_interval_ms and assistant.max_wait_secs must be > 0".into(),
                ));
            }
            if self.assistant.max_poll_interval_ms < self.assistant.poll_interval_ms {
                return Err(ConfigError::ValidationError(
                    "assistant.max_poll_interval_ms must be >= assistant.poll_interval_ms".into(),
                ));
            }
        }

        Ok(())
    }

    /// Settings that are optional at startup but needed to send anything.
    pub fn missing_send_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.whatsapp.access_token) {
            missing.push("ACCESS_TOKEN");
        }
        if is_blank(&self.whatsapp.phone_number_id) {
            missing.push("PHONE_NUMBER_ID");
        }
        missing
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Required setting {0} is not configured")]
    MissingSetting(&'static str),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
