//! Knowledge-base record types.
//!
//! [`DocumentEntry`] is one learned file, keyed by its path. [`DocFlag`] marks
//! the heuristics the ingestion pipeline fired while reading it.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Heuristic flags attached by the parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocFlag {
    /// PDF with no extractable text.
    Scanned,
    /// PDF longer than the page cap.
    Truncated,
    /// Image with a flat palette.
    Chart,
    /// Image with high greyscale contrast.
    TextRegion,
}

impl DocFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanned => "scanned",
            Self::Truncated => "truncated",
            Self::Chart => "chart",
            Self::TextRegion => "text_region",
        }
    }
}

impl std::fmt::Display for DocFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One document in `index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub path: String,
    /// Lower-cased extension including the dot, e.g. `.md`.
    #[serde(rename = "type", default)]
    pub extension: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content_preview: String,
    #[serde(default)]
    pub line_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<DocFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_at: Option<String>,
    #[serde(default)]
    pub added_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl DocumentEntry {
    /// Bare entry for `path` with filename and extension derived from it.
    /// Timestamps are stamped when the entry is added to a [`KnowledgeBase`](super::KnowledgeBase).
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let p = Path::new(&path);
        let filename = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        Self {
            filename,
            extension: extension_of(p),
            path,
            size: 0,
            summary: String::new(),
            content_preview: String::new(),
            line_count: 0,
            page_count: None,
            flags: Vec::new(),
            learned_at: None,
            added_at: String::new(),
            updated_at: String::new(),
        }
    }

    pub fn has_flag(&self, flag: DocFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Lower-cased extension with the leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
