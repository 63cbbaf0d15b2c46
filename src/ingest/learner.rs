//! Learning pipeline: parse a file, condense it, and hand it to the index.
//!
//! Per-file failures never abort a batch. They come back as a
//! [`LearnOutcome`] with `error` set, and callers check it before using `entry`.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::vision::{self, ImageAnalysis};
use super::{is_image, parser_for, IngestError};
use crate::config::{expand_tilde, KnowledgeConfig};
use crate::knowledge::types::extension_of;
use crate::knowledge::{DocumentEntry, KnowledgeBase};

pub const SUMMARY_FILE: &str = "learning_summary.md";

/// Result of learning one file.
#[derive(Debug, Clone, Serialize)]
pub struct LearnOutcome {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<DocumentEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LearnOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn failed(path: &Path, error: impl std::fmt::Display) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            entry: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AutoLearnReport {
    pub learned: usize,
    pub failed: usize,
    pub skipped_paths: Vec<String>,
    pub outcomes: Vec<LearnOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_path: Option<PathBuf>,
}

/// Output of the multimodal entry point.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum Analysis {
    Image(ImageAnalysis),
    Document(DocumentEntry),
}

/// Parse `path` into an index entry without touching the knowledge base.
pub fn parse_document(path: &Path, config: &KnowledgeConfig) -> Result<DocumentEntry, IngestError> {
    let metadata = std::fs::metadata(path).map_err(|e| IngestError::read(path, e))?;
    let ext = extension_of(path);
    let parser = parser_for(&ext, config).ok_or_else(|| IngestError::Unsupported {
        ext: if ext.is_empty() { "(none)".into() } else { ext.clone() },
    })?;

    let parsed = parser.parse(path)?;
    debug!(path = %path.display(), parser = parser.name(), chars = parsed.text.len(), "parsed");

    let absolute = std::path::absolute(path).map_err(|e| IngestError::read(path, e))?;
    let mut entry = DocumentEntry::new(absolute.to_string_lossy());
    entry.size = metadata.len();
    entry.summary = summarize(&parsed.text, config.summary_chars);
    entry.content_preview = preview(&parsed.text, config.preview_chars);
    entry.line_count = parsed.text.lines().count();
    entry.page_count = parsed.page_count;
    entry.flags = parsed.flags;
    entry.learned_at = Some(chrono::Utc::now().to_rfc3339());
    Ok(entry)
}

/// Parse one file and add it to `kb`. Errors are embedded in the outcome.
pub fn learn_file(
    kb: &mut KnowledgeBase,
    path: &Path,
    config: &KnowledgeConfig,
    tags: &[String],
    category: Option<&str>,
) -> LearnOutcome {
    let entry = match parse_document(path, config) {
        Ok(entry) => entry,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "learn failed");
            return LearnOutcome::failed(path, e);
        }
    };

    match kb.add_document(entry.clone(), tags, category) {
        Ok(_) => LearnOutcome {
            path: entry.path.clone(),
            entry: Some(entry),
            error: None,
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "index write failed");
            LearnOutcome::failed(path, format!("{e:#}"))
        }
    }
}

/// Learn every supported file under `dir`, labelling each with [`auto_tags`] and [`auto_category`].
/// Explicit `tags` are added to each file's path tags; an explicit `category`
/// replaces the one derived from the extension.
pub fn learn_directory(
    kb: &mut KnowledgeBase,
    dir: &Path,
    recursive: bool,
    config: &KnowledgeConfig,
    tags: &[String],
    category: Option<&str>,
) -> Result<Vec<LearnOutcome>> {
    anyhow::ensure!(dir.is_dir(), "directory not found: {}", dir.display());

    let files = collect_supported(dir, recursive);
    info!(dir = %dir.display(), files = files.len(), "learning directory");

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} {wide_msg}")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let mut outcomes = Vec::with_capacity(files.len());
    for file in &files {
        pb.set_message(
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        let mut file_tags = auto_tags(file, &config.path_tags);
        for tag in tags {
            if !file_tags.contains(tag) {
                file_tags.push(tag.clone());
            }
        }
        let category = category.unwrap_or_else(|| auto_category(&extension_of(file)));
        outcomes.push(learn_file(kb, file, config, &file_tags, Some(category)));
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(outcomes)
}

fn collect_supported(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| super::is_supported(&extension_of(p)))
        .collect()
}

/// Learn every configured path, then write a learning summary if anything was learned.
pub fn auto_learn(kb: &mut KnowledgeBase, config: &KnowledgeConfig) -> Result<AutoLearnReport> {
    let mut report = AutoLearnReport {
        learned: 0,
        failed: 0,
        skipped_paths: Vec::new(),
        outcomes: Vec::new(),
        summary_path: None,
    };

    for raw in &config.learn_paths {
        let dir = expand_tilde(raw);
        if !dir.is_dir() {
            debug!(path = %dir.display(), "learn path missing, skipping");
            report.skipped_paths.push(raw.clone());
            continue;
        }
        report.outcomes.extend(learn_directory(kb, &dir, true, config, &[], None)?);
    }

    report.learned = report.outcomes.iter().filter(|o| o.is_ok()).count();
    report.failed = report.outcomes.len() - report.learned;

    if report.learned > 0 {
        let path = kb.dir().join(SUMMARY_FILE);
        std::fs::write(&path, learning_summary(kb))
            .with_context(|| format!("failed to write {}", path.display()))?;
        report.summary_path = Some(path);
    }

    info!(learned = report.learned, failed = report.failed, "auto-learn finished");
    Ok(report)
}

/// Markdown overview of the knowledge base and its ten most recent documents.
pub fn learning_summary(kb: &KnowledgeBase) -> String {
    let stats = kb.stats();
    let mut out = format!(
        "# Auto Learning Summary\n\nGenerated: {}\n\n## Knowledge Base Status\n- Total Documents: {}\n- Categories: {}\n- Tags: {}\n\n## Recently Learned\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        stats.total_documents,
        stats.total_categories,
        stats.total_tags,
    );
    for doc in kb.list_documents(Some(10)) {
        let short: String = doc.summary.chars().take(100).collect();
        out.push_str(&format!(
            "\n### {}\n- Type: {}\n- Size: {} bytes\n- Summary: {}...\n",
            doc.filename, doc.extension, doc.size, short
        ));
    }
    out
}

/// Image paths get image analysis, everything else supported gets document parsing.
pub fn analyze(path: &Path, config: &KnowledgeConfig) -> Result<Analysis, IngestError> {
    let ext = extension_of(path);
    if is_image(&ext) {
        vision::analyze_image(path).map(Analysis::Image)
    } else {
        parse_document(path, config).map(Analysis::Document)
    }
}

/// Cut to `max` chars, preferring a sentence or line boundary in the back half, then append `...`.
pub fn summarize(content: &str, max: usize) -> String {
    if content.chars().count() <= max {
        return content.to_string();
    }

    let cut_end = content
        .char_indices()
        .nth(max)
        .map(|(i, _)| i)
        .unwrap_or(content.len());
    let cut = &content[..cut_end];

    let boundary = cut
        .char_indices()
        .enumerate()
        .filter(|(_, (_, c))| matches!(c, '。' | '.' | '\n'))
        .last();

    match boundary {
        Some((char_pos, (byte_pos, c))) if char_pos * 2 > max => {
            format!("{}...", &cut[..byte_pos + c.len_utf8()])
        }
        _ => format!("{cut}..."),
    }
}

/// First `max` chars.
pub fn preview(content: &str, max: usize) -> String {
    content.chars().take(max).collect()
}

/// Every configured keyword that appears in the path.
pub fn auto_tags(path: &Path, keywords: &[String]) -> Vec<String> {
    let s = path.to_string_lossy();
    keywords
        .iter()
        .filter(|k| !k.is_empty() && s.contains(k.as_str()))
        .cloned()
        .collect()
}

pub fn auto_category(ext: &str) -> &'static str {
    match ext {
        ".md" => "documentation",
        ".pdf" => "document",
        e if is_image(e) => "image",
        _ => "code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_kept() {
        assert_eq!(summarize("short.", 500), "short.");
    }

    #[test]
    fn summary_cuts_at_late_boundary() {
        let content = format!("{}. {}", "a".repeat(300), "b".repeat(400));
        let s = summarize(&content, 500);
        assert_eq!(s, format!("{}....", "a".repeat(300)));
    }

    #[test]
    fn summary_ignores_early_boundary() {
        let content = format!("{}. {}", "a".repeat(100), "b".repeat(600));
        let s = summarize(&content, 500);
        assert_eq!(s.chars().count(), 503);
        assert!(s.ends_with("b..."));
    }

    #[test]
    fn summary_is_char_safe_for_cjk() {
        let content = format!("{}。{}", "中".repeat(300), "文".repeat(400));
        let s = summarize(&content, 500);
        assert_eq!(s, format!("{}。...", "中".repeat(300)));
    }

    #[test]
    fn tags_and_categories() {
        let keywords = vec!["trading".to_string(), "brain".to_string()];
        assert_eq!(
            auto_tags(Path::new("/ws/trading/tools/kb.py"), &keywords),
            vec!["trading"]
        );
        assert_eq!(auto_category(".md"), "documentation");
        assert_eq!(auto_category(".pdf"), "document");
        assert_eq!(auto_category(".png"), "image");
        assert_eq!(auto_category(".py"), "code");
    }

    #[test]
    fn learn_file_embeds_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut kb = KnowledgeBase::open(dir.path().join("kb")).unwrap();
        let config = KnowledgeConfig::default();

        let exe = dir.path().join("tool.exe");
        std::fs::write(&exe, b"MZ").unwrap();
        let outcome = learn_file(&mut kb, &exe, &config, &[], None);
        assert!(!outcome.is_ok());
        assert!(outcome.entry.is_none());
        assert!(outcome.error.unwrap().contains("unsupported"));

        let missing = learn_file(&mut kb, &dir.path().join("gone.md"), &config, &[], None);
        assert!(missing.error.unwrap().contains("not found"));
        assert!(kb.documents().is_empty());
    }

    #[test]
    fn learn_file_fills_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut kb = KnowledgeBase::open(dir.path().join("kb")).unwrap();
        let file = dir.path().join("notes.md");
        std::fs::write(&file, "line one\nline two\n").unwrap();

        let outcome = learn_file(&mut kb, &file, &KnowledgeConfig::default(), &["x".into()], None);
        let entry = outcome.entry.unwrap();
        assert_eq!(entry.extension, ".md");
        assert_eq!(entry.line_count, 2);
        assert_eq!(entry.size, 18);
        assert!(entry.learned_at.is_some());
        assert_eq!(kb.search_by_tag("x").len(), 1);
    }
}
