//! Per-platform, per-day JSONL record of every send attempt.

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Delivery, Notice, RelayError};
use crate::store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRecord {
    pub direction: String,
    pub platform: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl SendRecord {
    pub fn from_attempt(
        platform: &str,
        notice: &Notice,
        result: &Result<Delivery, RelayError>,
    ) -> Self {
        let (success, message_id, error) = match result {
            Ok(d) => (true, d.message_id.clone(), None),
            Err(e) => (false, None, Some(e.to_string())),
        };
        Self {
            direction: "sent".into(),
            platform: platform.to_string(),
            kind: notice.kind.to_string(),
            title: notice.title.clone(),
            content: notice.body.clone(),
            success,
            message_id,
            error,
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }
}

pub struct SendLog {
    dir: PathBuf,
}

impl SendLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<platform>/<YYYYMMDD>.jsonl`
    pub fn path_for(&self, platform: &str, date: NaiveDate) -> PathBuf {
        self.dir
            .join(platform)
            .join(format!("{}.jsonl", date.format("%Y%m%d")))
    }

    pub fn append(&self, record: &SendRecord) -> Result<()> {
        let today = chrono::Local::now().date_naive();
        store::append_jsonl(&self.path_for(&record.platform, today), record)
    }

    pub fn read(&self, platform: &str, date: NaiveDate) -> Result<Vec<SendRecord>> {
        store::read_jsonl(&self.path_for(platform, date))
    }
}
