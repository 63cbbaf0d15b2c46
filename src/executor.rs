//! Keyword-driven command execution.
//!
//! A message is mapped to an intent through a fixed keyword table and handled
//! according to that intent's risk level. Every command is recorded in the
//! brain as a `decision` thought before anything runs. High-risk commands are
//! never executed, only acknowledged with a confirmation request.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::brain::Brain;
use crate::config::{expand_tilde, ExecutorConfig};
use crate::knowledge::types::extension_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Organize,
    Collect,
    Analyze,
    Execute,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    Low,
    Medium,
    High,
    Unknown,
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedCommand {
    pub intent: Intent,
    pub target: Option<&'static str>,
    pub description: &'static str,
    pub risk: Risk,
}

/// Checked in order; the first row with a matching keyword wins.
const INTENT_TABLE: &[(&[&str], ParsedCommand)] = &[
    (
        &["clean", "organize", "整理", "清理"],
        ParsedCommand { intent: Intent::Organize, target: Some("files"), description: "organize files", risk: Risk::Low },
    ),
    (
        &["fetch", "collect", "获取", "采集"],
        ParsedCommand { intent: Intent::Collect, target: Some("data"), description: "collect data", risk: Risk::Low },
    ),
    (
        &["analyze", "分析"],
        ParsedCommand { intent: Intent::Analyze, target: Some("data"), description: "analyze data", risk: Risk::Medium },
    ),
    (
        &["execute", "run", "执行", "运行"],
        ParsedCommand { intent: Intent::Execute, target: Some("command"), description: "execute command", risk: Risk::High },
    ),
];

const UNKNOWN: ParsedCommand = ParsedCommand {
    intent: Intent::Unknown,
    target: None,
    description: "unrecognized command",
    risk: Risk::Unknown,
};

pub fn parse_command(message: &str) -> ParsedCommand {
    let lower = message.to_lowercase();
    INTENT_TABLE
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, cmd)| *cmd)
        .unwrap_or(UNKNOWN)
}

/// Extension counts over the first entries of a directory.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub dir: PathBuf,
    pub scanned: usize,
    pub distribution: BTreeMap<String, usize>,
}

/// Look at the first `limit` entries (by name) and count files per extension.
pub fn scan_directory(dir: &Path, limit: usize) -> Result<ScanReport> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());
    entries.truncate(limit);

    let mut distribution = BTreeMap::new();
    for entry in &entries {
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            let ext = extension_of(&entry.path());
            let key = if ext.is_empty() { "(none)".to_string() } else { ext };
            *distribution.entry(key).or_insert(0) += 1;
        }
    }
    Ok(ScanReport {
        dir: dir.to_path_buf(),
        scanned: entries.len(),
        distribution,
    })
}

pub struct Executor<'a> {
    brain: &'a mut Brain,
    config: &'a ExecutorConfig,
}

impl<'a> Executor<'a> {
    pub fn new(brain: &'a mut Brain, config: &'a ExecutorConfig) -> Self {
        Self { brain, config }
    }

    /// Parse, record the decision, and dispatch by risk. Returns the reply text.
    pub fn execute(&mut self, message: &str) -> Result<String> {
        let cmd = parse_command(message);
        self.brain.think(
            &format!(
                "Received command: {message}. Intent: {:?}, Target: {}, Risk: {}",
                cmd.intent,
                cmd.target.unwrap_or("none"),
                cmd.risk
            ),
            "decision",
            json!({ "message": message, "intent": cmd.intent, "risk": cmd.risk }),
            0.5,
        )?;
        info!(intent = ?cmd.intent, risk = %cmd.risk, "executing command");

        match (cmd.risk, cmd.intent) {
            (Risk::Low, Intent::Organize) => self.organize_files(),
            (Risk::Low, Intent::Collect) => {
                Ok("[collecting] data collection started, results will follow".to_string())
            }
            (Risk::Low, _) | (Risk::Medium, _) => {
                Ok(format!("[executing, will report] {}...", cmd.description))
            }
            (Risk::High, _) => Ok(format!(
                "[confirmation required] high-risk operation: {}\nReply to confirm before anything runs.",
                cmd.description
            )),
            (Risk::Unknown, _) => Ok(
                "[not understood] please be more specific\nTry: organize files / collect data / analyze report".to_string(),
            ),
        }
    }

    fn organize_files(&mut self) -> Result<String> {
        let dir = expand_tilde(&self.config.scan_dir);
        let report = scan_directory(&dir, self.config.scan_limit)?;

        let mut reply = format!(
            "[organize complete]\nScanned: {}\nFile types:\n",
            dir.display()
        );
        for (ext, count) in &report.distribution {
            reply.push_str(&format!("  {ext}: {count}\n"));
        }

        self.brain.remember(
            &format!(
                "Organized files in {}. Found {} types.",
                dir.display(),
                report.distribution.len()
            ),
            "action",
            5,
            Some("executor"),
        )?;
        Ok(reply)
    }
}
