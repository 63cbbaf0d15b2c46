//! Inbound HTTP listener for a go-cqhttp (OneBot) QQ client.
//!
//! - `POST /qq/callback`: event callback; replies to addressed messages
//! - `POST /send`: relay a message to QQ
//! - `GET /status`: liveness

pub mod commands;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::TwinConfig;
use crate::relay::qq::{Qq, QqTarget};
use crate::relay::{Notice, Relay};
use crate::store;

pub struct BridgeState {
    config: TwinConfig,
    relay: Relay,
    log_path: PathBuf,
}

impl BridgeState {
    pub fn new(config: TwinConfig) -> Result<Self> {
        let relay = Relay::from_config(&config)?;
        let log_path = config.sync_dir().join("qq_messages.jsonl");
        Ok(Self {
            config,
            relay,
            log_path,
        })
    }

    async fn send_qq(&self, message: &str, target: QqTarget) -> Result<Value, String> {
        let qq = Qq::from_config(&self.config).with_target(target);
        self.relay
            .send(&qq, &Notice::text(message))
            .await
            .map(|d| json!({ "status": "ok", "delivery": d }))
            .map_err(|e| e.to_string())
    }
}

pub fn router(state: Arc<BridgeState>) -> Router {
    Router::new()
        .route("/qq/callback", post(qq_callback))
        .route("/send", post(send_message))
        .route("/status", get(status))
        .with_state(state)
}

/// Bind `server.host:server.port` and serve until Ctrl-C.
pub async fn serve(config: TwinConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(BridgeState::new(config)?);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "QQ bridge listening at http://{bind_addr}/qq/callback");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutting down QQ bridge");
        })
        .await?;
    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// Always answers `{"status":"ok"}`, even for a body that is not JSON.
async fn qq_callback(State(state): State<Arc<BridgeState>>, body: Bytes) -> Json<Value> {
    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "ignoring malformed QQ callback");
            return Json(json!({ "status": "ok" }));
        }
    };
    if event["post_type"].as_str() == Some("message") {
        let record = json!({ "time": chrono::Local::now().to_rfc3339(), "data": event });
        if let Err(e) = store::append_jsonl(&state.log_path, &record) {
            warn!(error = %e, "failed to log QQ message");
        }
        handle_message(&state, &event).await;
    }
    Json(json!({ "status": "ok" }))
}

async fn handle_message(state: &BridgeState, event: &Value) {
    let message_type = event["message_type"].as_str().unwrap_or_default();
    let raw = event["raw_message"].as_str().unwrap_or_default();
    let nickname = event["sender"]["nickname"].as_str().unwrap_or("unknown");
    info!(message_type, sender = nickname, message = raw, "QQ message");

    let aliases = &state.config.qq.mention_aliases;
    if !commands::is_addressed(message_type, raw, aliases) {
        return;
    }
    let Some(target) = QqTarget::from_ids(event["user_id"].as_i64(), event["group_id"].as_i64()) else {
        warn!("QQ message has neither user_id nor group_id");
        return;
    };

    let command = commands::parse(&commands::strip_mentions(raw, aliases));
    let reply = commands::reply(
        &command,
        &state.config.identity.my_id,
        &state.config.identity.twin_id,
    );
    if let Err(e) = state.send_qq(&reply, target).await {
        warn!(error = %e, "failed to reply on QQ");
    }
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    #[serde(default)]
    message: String,
    user_id: Option<i64>,
    group_id: Option<i64>,
}

async fn send_message(State(state): State<Arc<BridgeState>>, Json(req): Json<SendRequest>) -> Json<Value> {
    if req.message.is_empty() {
        return Json(json!({ "status": "error", "error": "message is required" }));
    }
    let target = QqTarget::from_ids(req.user_id, req.group_id)
        .or_else(|| QqTarget::from_ids(state.config.qq.user_id, state.config.qq.group_id));
    let Some(target) = target else {
        return Json(json!({ "status": "error", "error": "no user_id or group_id" }));
    };

    match state.send_qq(&req.message, target).await {
        Ok(result) => Json(result),
        Err(error) => Json(json!({ "status": "error", "error": error })),
    }
}

async fn status(State(state): State<Arc<BridgeState>>) -> Json<Value> {
    Json(json!({
        "status": "running",
        "time": chrono::Local::now().to_rfc3339(),
        "go-cqhttp": state.config.qq.api_url,
    }))
}
