#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use twinsync::config::TwinConfig;
use twinsync::knowledge::DocumentEntry;

/// Config rooted in a fresh temp dir. Keep the `TempDir` alive for the test.
pub fn test_config() -> (TempDir, TwinConfig) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = TwinConfig::default();
    config.storage.home = dir.path().to_string_lossy().into_owned();
    config.identity.my_id = "twin_a".into();
    config.identity.twin_id = "twin_b".into();
    config.relay.timeout_secs = 5;
    (dir, config)
}

/// Index entry with the given summary and preview.
pub fn doc(path: &str, summary: &str, preview: &str) -> DocumentEntry {
    let mut entry = DocumentEntry::new(path);
    entry.summary = summary.into();
    entry.content_preview = preview.into();
    entry.size = 100;
    entry
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Request bodies captured by a [`MockEndpoint`].
pub type Captured = Arc<Mutex<Vec<Value>>>;

/// Local HTTP server that records every POST body and answers with a fixed status and body.
pub struct MockEndpoint {
    pub addr: SocketAddr,
    pub captured: Captured,
}

impl MockEndpoint {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.captured.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct MockState {
    captured: Captured,
    status: StatusCode,
    reply: String,
}

async fn record(State(state): State<MockState>, Json(body): Json<Value>) -> (StatusCode, String) {
    state.captured.lock().unwrap().push(body);
    (state.status, state.reply.clone())
}

/// Serve `path` on 127.0.0.1 with an ephemeral port.
pub async fn mock_endpoint(path: &str, status: u16, reply: &str) -> MockEndpoint {
    let captured: Captured = Arc::default();
    let state = MockState {
        captured: captured.clone(),
        status: StatusCode::from_u16(status).unwrap(),
        reply: reply.to_string(),
    };
    let app = Router::new().route(path, post(record)).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockEndpoint { addr, captured }
}
