//! Twin-to-twin sync over shared files and git.
//!
//! Twins exchange one message each way through `to_twin.json` and
//! `from_twin.json` in the sync directory. Every step is appended to
//! `sync_log.json`, and the owner gets entries in `notifications.json`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::TwinConfig;
use crate::scheduler::runner::run_with_timeout;
use crate::store;

const GIT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinMessage {
    pub from: String,
    pub to: String,
    pub timestamp: String,
    pub message: Value,
    /// `pending` when written, `unread` when delivered, `read` once received.
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Urgent,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Urgent => "urgent",
        })
    }
}

impl FromStr for NotifyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown level {other:?}, expected info, warning or urgent")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub timestamp: String,
    pub level: NotifyLevel,
    pub message: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GitSyncOutcome {
    pub committed: bool,
    pub pushed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailySyncReport {
    pub sent: TwinMessage,
    pub received: Option<TwinMessage>,
    pub git: GitSyncOutcome,
    pub notified: Notification,
}

pub struct TwinSync {
    dir: PathBuf,
    workspace: PathBuf,
    my_id: String,
    twin_id: String,
}

impl TwinSync {
    pub fn new(dir: impl Into<PathBuf>, workspace: impl Into<PathBuf>, my_id: &str, twin_id: &str) -> Self {
        Self {
            dir: dir.into(),
            workspace: workspace.into(),
            my_id: my_id.to_string(),
            twin_id: twin_id.to_string(),
        }
    }

    pub fn from_config(config: &TwinConfig) -> Self {
        Self::new(
            config.sync_dir(),
            config.resolved_home(),
            &config.identity.my_id,
            &config.identity.twin_id,
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join("sync_log.json")
    }

    fn notifications_path(&self) -> PathBuf {
        self.dir.join("notifications.json")
    }

    pub fn outgoing_path(&self) -> PathBuf {
        self.dir.join("to_twin.json")
    }

    pub fn incoming_path(&self) -> PathBuf {
        self.dir.join("from_twin.json")
    }

    // ── Log ───────────────────────────────────────────────────────────────────

    pub fn log_sync(&self, kind: &str, data: Value) -> Result<SyncEvent> {
        let event = SyncEvent {
            timestamp: chrono::Utc::now().to_rfc3339(),
            kind: kind.to_string(),
            data,
            source: self.my_id.clone(),
        };
        let mut events: Vec<SyncEvent> = store::load_json_or_default(&self.log_path());
        events.push(event.clone());
        store::save_json(&self.log_path(), &events)?;
        Ok(event)
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        store::load_json_or_default(&self.log_path())
    }

    // ── Twin exchange ─────────────────────────────────────────────────────────

    /// Overwrite `to_twin.json` with a pending message.
    pub fn send_to_twin(&self, message: Value) -> Result<TwinMessage> {
        let record = TwinMessage {
            from: self.my_id.clone(),
            to: self.twin_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            message,
            status: "pending".into(),
        };
        store::save_json(&self.outgoing_path(), &record)?;
        self.log_sync("send_to_twin", record.message.clone())?;
        info!(to = %self.twin_id, "message left for twin");
        Ok(record)
    }

    /// Take the twin's message if it is still unread, marking it read.
    pub fn receive_from_twin(&self) -> Result<Option<TwinMessage>> {
        let path = self.incoming_path();
        if !path.exists() {
            return Ok(None);
        }
        let mut record: TwinMessage = match serde_json::from_str(&std::fs::read_to_string(&path)?) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable twin message");
                return Ok(None);
            }
        };
        if record.status != "unread" {
            return Ok(None);
        }

        record.status = "read".into();
        store::save_json(&path, &record)?;
        self.log_sync("receive_from_twin", record.message.clone())?;
        info!(from = %record.from, "received twin message");
        Ok(Some(record))
    }

    // ── Owner ─────────────────────────────────────────────────────────────────

    pub fn notify_owner(&self, message: &str, level: NotifyLevel) -> Result<Notification> {
        let note = Notification {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            message: message.to_string(),
            source: self.my_id.clone(),
        };
        let mut notes: Vec<Notification> = store::load_json_or_default(&self.notifications_path());
        notes.push(note.clone());
        store::save_json(&self.notifications_path(), &notes)?;
        self.log_sync("notify_owner", json!({ "message": message, "level": level }))?;
        Ok(note)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        store::load_json_or_default(&self.notifications_path())
    }

    // ── Git ───────────────────────────────────────────────────────────────────

    /// `git add .`, commit, push in the workspace. An empty commit is not an error.
    pub async fn git_sync(&self) -> Result<GitSyncOutcome> {
        let outcome = self.run_git().await;
        let data = match &outcome.error {
            None => json!({ "status": "success", "committed": outcome.committed }),
            Some(e) => json!({ "status": "error", "error": e }),
        };
        self.log_sync("github_sync", data)?;
        Ok(outcome)
    }

    async fn run_git(&self) -> GitSyncOutcome {
        let cwd = Some(self.workspace.as_path());
        let git = |args: &[&str]| {
            std::iter::once("git")
                .chain(args.iter().copied())
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        let failed = |committed: bool, error: String| GitSyncOutcome {
            committed,
            pushed: false,
            error: Some(error),
        };

        match run_with_timeout(&git(&["add", "."]), cwd, GIT_TIMEOUT).await {
            Ok(out) if out.success => {}
            Ok(out) => return failed(false, format!("git add failed: {}", out.stderr.trim())),
            Err(e) => return failed(false, format!("{e:#}")),
        }

        let message = format!("Sync {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
        let committed = match run_with_timeout(&git(&["commit", "-m", &message]), cwd, GIT_TIMEOUT).await {
            Ok(out) => out.success,
            Err(e) => return failed(false, format!("{e:#}")),
        };

        match run_with_timeout(&git(&["push"]), cwd, GIT_TIMEOUT).await {
            Ok(out) if out.success => {
                info!(committed, "git sync pushed");
                GitSyncOutcome {
                    committed,
                    pushed: true,
                    error: None,
                }
            }
            Ok(out) => failed(committed, format!("git push failed: {}", out.stderr.trim())),
            Err(e) => failed(committed, format!("{e:#}")),
        }
    }

    /// Status to twin, check for a reply, push, then tell the owner.
    pub async fn daily_sync(&self, status: Value) -> Result<DailySyncReport> {
        let sent = self.send_to_twin(status)?;
        let received = self.receive_from_twin()?;
        let git = self.git_sync().await?;
        if let Some(e) = &git.error {
            warn!(error = %e, "git sync failed");
        }
        let notified = self.notify_owner("Daily sync complete", NotifyLevel::Info)?;
        Ok(DailySyncReport {
            sent,
            received,
            git,
            notified,
        })
    }
}
