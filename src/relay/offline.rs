//! File-based message exchange for when no remote channel is reachable.
//!
//! Outgoing messages land in `outbox/`; whatever drops a file into `inbox/`
//! (a synced folder, a USB stick) is picked up by [`OfflineExchange::check_inbox`]
//! and renamed to `.read` so it is seen once.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::Notice;
use crate::store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub body: String,
    pub timestamp: String,
}

pub struct OfflineExchange {
    dir: PathBuf,
    my_id: String,
    twin_id: String,
}

impl OfflineExchange {
    pub fn new(dir: impl Into<PathBuf>, my_id: &str, twin_id: &str) -> Self {
        Self {
            dir: dir.into(),
            my_id: my_id.to_string(),
            twin_id: twin_id.to_string(),
        }
    }

    pub fn outbox(&self) -> PathBuf {
        self.dir.join("outbox")
    }

    pub fn inbox(&self) -> PathBuf {
        self.dir.join("inbox")
    }

    /// Write `notice` to `outbox/<id>.json`.
    pub fn send(&self, notice: &Notice) -> Result<OfflineMessage> {
        let now = chrono::Local::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let message = OfflineMessage {
            id: format!("msg_{}_{}_{}", now.format("%Y%m%d_%H%M%S"), self.my_id, &suffix[..8]),
            from: self.my_id.clone(),
            to: self.twin_id.clone(),
            kind: notice.kind.to_string(),
            title: notice.title.clone(),
            body: notice.body.clone(),
            timestamp: now.to_rfc3339(),
        };
        let path = self.outbox().join(format!("{}.json", message.id));
        store::save_json(&path, &message)?;
        info!(id = %message.id, path = %path.display(), "queued offline message");
        Ok(message)
    }

    /// Unread inbox messages, oldest first. Each file is renamed to `.read`.
    pub fn check_inbox(&self) -> Result<Vec<OfflineMessage>> {
        let inbox = self.inbox();
        let entries = match std::fs::read_dir(&inbox) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", inbox.display()))
            }
        };

        // Files already renamed to `.read` must reach the caller, so nothing
        // after the first rename may return early.
        let mut messages = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(dir = %inbox.display(), error = %e, "skipping inbox entry");
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_message(&path) {
                Ok(msg) => {
                    // Delivered either way; an unmarked file shows up again next check.
                    if let Err(e) = std::fs::rename(&path, path.with_extension("read")) {
                        warn!(path = %path.display(), error = %e, "failed to mark inbox file as read");
                    }
                    messages.push(msg);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable inbox file"),
            }
        }
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(messages)
    }
}

fn read_message(path: &Path) -> Result<OfflineMessage> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid message in {}", path.display()))
}
