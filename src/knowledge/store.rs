//! Write path for the knowledge index.

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;

use super::{DocumentEntry, KnowledgeBase, Membership};

/// Result returned from [`KnowledgeBase::add_document`].
#[derive(Debug, Serialize)]
pub struct AddDocumentResult {
    pub path: String,
    /// `true` if an entry with the same path was replaced.
    pub updated: bool,
}

impl KnowledgeBase {
    /// Insert `entry`, or replace the entry with the same path, then attach tags and category.
    ///
    /// A replaced entry keeps its original `added_at`. Membership is idempotent.
    pub fn add_document(
        &mut self,
        mut entry: DocumentEntry,
        tags: &[String],
        category: Option<&str>,
    ) -> Result<AddDocumentResult> {
        if entry.path.trim().is_empty() {
            bail!("document path must not be empty");
        }

        let now = chrono::Utc::now().to_rfc3339();
        entry.updated_at = now.clone();

        let updated = match self.index.iter_mut().find(|d| d.path == entry.path) {
            Some(existing) => {
                entry.added_at = existing.added_at.clone();
                if entry.added_at.is_empty() {
                    entry.added_at = now;
                }
                *existing = entry.clone();
                true
            }
            None => {
                entry.added_at = now;
                self.index.push(entry.clone());
                false
            }
        };

        for tag in tags.iter().filter(|t| !t.trim().is_empty()) {
            add_member(&mut self.tags, tag, &entry.path);
        }
        if let Some(cat) = category.filter(|c| !c.trim().is_empty()) {
            add_member(&mut self.categories, cat, &entry.path);
        }

        self.save()?;
        debug!(path = %entry.path, updated, "document indexed");

        Ok(AddDocumentResult {
            path: entry.path,
            updated,
        })
    }
}

fn add_member(map: &mut Membership, label: &str, path: &str) {
    let paths = map.entry(label.to_string()).or_default();
    if !paths.iter().any(|p| p == path) {
        paths.push(path.to_string());
    }
}
