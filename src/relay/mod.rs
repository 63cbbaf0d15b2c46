//! Outbound notifications to chat platforms.
//!
//! A [`Platform`] is a pure formatter: it turns a [`Notice`] into an
//! [`OutboundRequest`] and reads the platform's reply back into a
//! [`Delivery`] or a [`RelayError`]. [`Relay`] owns the HTTP client, performs
//! the single POST, and appends every attempt to the [`SendLog`]. There is no
//! retry.

pub mod discord;
pub mod feishu;
pub mod github;
pub mod log;
pub mod offline;
pub mod qq;
pub mod telegram;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::TwinConfig;
pub use log::{SendLog, SendRecord};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// ── Message model ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    TaskComplete,
    DataUpdate,
    Alert,
    Heartbeat,
    SyncRequest,
    Query,
    General,
}

impl MessageKind {
    pub const ALL: [MessageKind; 7] = [
        Self::TaskComplete,
        Self::DataUpdate,
        Self::Alert,
        Self::Heartbeat,
        Self::SyncRequest,
        Self::Query,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskComplete => "task_complete",
            Self::DataUpdate => "data_update",
            Self::Alert => "alert",
            Self::Heartbeat => "heartbeat",
            Self::SyncRequest => "sync_request",
            Self::Query => "query",
            Self::General => "general",
        }
    }

    /// Plain-text marker used in message headers.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::TaskComplete => "[OK]",
            Self::DataUpdate => "[DATA]",
            Self::Alert => "[ALERT]",
            Self::Heartbeat => "[HEART]",
            Self::SyncRequest => "[SYNC]",
            Self::Query => "[?]",
            Self::General => "[MSG]",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown message kind: {s}"))
    }
}

/// A platform-neutral message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: MessageKind,
    pub title: String,
    pub body: String,
    /// Set on alerts; `high` escalates the card colour where a platform has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl Notice {
    pub fn new(kind: MessageKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            priority: None,
        }
    }

    /// Untitled general message.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(MessageKind::General, "", body)
    }

    pub fn task_complete(task: &str, result: &str, details: Option<&str>) -> Self {
        let mut body = format!("**Result:** {result}\n");
        if let Some(d) = details {
            body.push_str(&format!("**Details:** {d}"));
        }
        Self::new(MessageKind::TaskComplete, format!("Task Complete: {task}"), body)
    }

    pub fn data_update(data_type: &str, records: u64, file: Option<&str>) -> Self {
        let mut body = format!("**Records:** {records}\n");
        if let Some(f) = file {
            body.push_str(&format!("**File:** `{f}`"));
        }
        Self::new(MessageKind::DataUpdate, format!("Data Update: {data_type}"), body)
    }

    pub fn alert(alert_type: &str, message: &str, priority: &str) -> Self {
        let mut notice = Self::new(
            MessageKind::Alert,
            format!("Alert: {alert_type} [{}]", priority.to_uppercase()),
            format!("**Priority:** {priority}\n\n**Message:**\n{message}"),
        );
        notice.priority = Some(priority.to_string());
        notice
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority
            .as_deref()
            .is_some_and(|p| p.eq_ignore_ascii_case("high"))
    }

    pub fn heartbeat(status: &str, stats: &[(String, String)]) -> Self {
        let mut body = format!("**Status:** {status}\n");
        if !stats.is_empty() {
            body.push_str("\n**Stats:**\n");
            for (k, v) in stats {
                body.push_str(&format!("- {k}: {v}\n"));
            }
        }
        Self::new(MessageKind::Heartbeat, "Heartbeat", body)
    }

    pub fn sync_request(sync_type: &str) -> Self {
        Self::new(
            MessageKind::SyncRequest,
            format!("Sync Request: {sync_type}"),
            format!("Requesting {sync_type} synchronization.\n\nPlease confirm and start sync."),
        )
    }

    /// Title and body as one block of text.
    pub fn full_text(&self) -> String {
        if self.title.is_empty() {
            self.body.clone()
        } else {
            format!("{}\n{}", self.title, self.body)
        }
    }
}

// ── Platform seam ─────────────────────────────────────────────────────────────

/// A JSON POST ready to send.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl OutboundRequest {
    pub fn new(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

/// A successful send.
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timestamp: String,
}

impl Delivery {
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            message_id: None,
            url: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Payload formatting and reply interpretation for one chat platform.
pub trait Platform: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    /// Build the POST for `notice`. Fails with `NotConfigured` when credentials are missing.
    fn request(&self, notice: &Notice) -> Result<OutboundRequest, RelayError>;

    /// Decide success from the HTTP status and raw response body.
    fn interpret(&self, status: u16, body: &str) -> Result<Delivery, RelayError>;
}

pub(crate) fn parse_json_body(body: &str) -> Result<serde_json::Value, RelayError> {
    serde_json::from_str(body).map_err(|e| {
        let snippet: String = body.chars().take(200).collect();
        RelayError::InvalidResponse(format!("{e}: {snippet}"))
    })
}

/// Every outbound platform built from config, configured or not.
pub fn platforms(config: &TwinConfig) -> Vec<Box<dyn Platform>> {
    vec![
        Box::new(telegram::Telegram::from_config(config)),
        Box::new(discord::Discord::from_config(config)),
        Box::new(feishu::FeishuWebhook::from_config(config)),
        Box::new(github::GitHub::from_config(config)),
        Box::new(qq::Qq::from_config(config)),
    ]
}

/// Look up a platform by name.
pub fn platform(config: &TwinConfig, name: &str) -> Option<Box<dyn Platform>> {
    platforms(config).into_iter().find(|p| p.name() == name)
}

// ── Sender ────────────────────────────────────────────────────────────────────

pub struct Relay {
    client: reqwest::Client,
    log: SendLog,
}

impl Relay {
    pub fn new(timeout: Duration, log_dir: impl Into<PathBuf>) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("twinsync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            log: SendLog::new(log_dir),
        })
    }

    pub fn from_config(config: &TwinConfig) -> Result<Self, RelayError> {
        Self::new(
            Duration::from_secs(config.relay.timeout_secs),
            config.sync_dir().join("messages"),
        )
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn log(&self) -> &SendLog {
        &self.log
    }

    /// Format, POST once, interpret, and log the attempt either way.
    pub async fn send(
        &self,
        platform: &dyn Platform,
        notice: &Notice,
    ) -> Result<Delivery, RelayError> {
        let result = self.try_send(platform, notice).await;

        let record = SendRecord::from_attempt(platform.name(), notice, &result);
        if let Err(e) = self.log.append(&record) {
            warn!(platform = platform.name(), error = %e, "failed to write send log");
        }

        match &result {
            Ok(d) => debug!(platform = platform.name(), message_id = ?d.message_id, "sent"),
            Err(e) => warn!(platform = platform.name(), error = %e, "send failed"),
        }
        result
    }

    async fn try_send(
        &self,
        platform: &dyn Platform,
        notice: &Notice,
    ) -> Result<Delivery, RelayError> {
        if !platform.is_configured() {
            return Err(RelayError::NotConfigured(platform.name()));
        }
        let request = platform.request(notice)?;
        let (status, body) = self.post(&request).await?;
        platform.interpret(status, &body)
    }

    /// Single JSON POST. Returns the status code and body text.
    pub async fn post(&self, request: &OutboundRequest) -> Result<(u16, String), RelayError> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}
