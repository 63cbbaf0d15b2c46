//! Tag-indexed knowledge base.
//!
//! Three JSON files live in the knowledge directory:
//!
//! | File | Shape |
//! |------|-------|
//! | `index.json` | array of [`DocumentEntry`], unique by `path` |
//! | `tags.json` | object of tag → array of paths |
//! | `categories.json` | object of category → array of paths |
//!
//! Membership lists only ever name paths present in the index. [`KnowledgeBase::open`]
//! re-sweeps on load so stores written by older tools are repaired on first open,
//! and [`KnowledgeBase::delete_document`] sweeps both maps in the same save.

pub mod forget;
pub mod search;
pub mod stats;
pub mod store;
pub mod types;

use anyhow::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use types::{DocFlag, DocumentEntry};

/// Inverted index: label → document paths.
pub type Membership = BTreeMap<String, Vec<String>>;

pub struct KnowledgeBase {
    dir: PathBuf,
    pub(crate) index: Vec<DocumentEntry>,
    pub(crate) tags: Membership,
    pub(crate) categories: Membership,
}

impl KnowledgeBase {
    /// Load the three stores from `dir`. Missing or corrupt files load empty.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut kb = Self {
            index: crate::store::load_json_or_default(&dir.join("index.json")),
            tags: crate::store::load_json_or_default(&dir.join("tags.json")),
            categories: crate::store::load_json_or_default(&dir.join("categories.json")),
            dir,
        };

        let swept = kb.sweep();
        if swept > 0 {
            info!(swept, "repaired dangling knowledge memberships");
            kb.save()?;
        }
        debug!(documents = kb.index.len(), dir = %kb.dir.display(), "knowledge base opened");
        Ok(kb)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn documents(&self) -> &[DocumentEntry] {
        &self.index
    }

    pub fn get(&self, path: &str) -> Option<&DocumentEntry> {
        self.index.iter().find(|d| d.path == path)
    }

    pub fn tags(&self) -> &Membership {
        &self.tags
    }

    pub fn categories(&self) -> &Membership {
        &self.categories
    }

    /// Write all three stores.
    pub fn save(&self) -> Result<()> {
        crate::store::save_json(&self.dir.join("index.json"), &self.index)?;
        crate::store::save_json(&self.dir.join("tags.json"), &self.tags)?;
        crate::store::save_json(&self.dir.join("categories.json"), &self.categories)?;
        Ok(())
    }

    /// Drop memberships naming unknown paths, duplicates within a list, and empty lists.
    /// Returns the number of memberships removed.
    pub(crate) fn sweep(&mut self) -> usize {
        let known: HashSet<&str> = self.index.iter().map(|d| d.path.as_str()).collect();
        sweep_membership(&mut self.tags, &known) + sweep_membership(&mut self.categories, &known)
    }
}

fn sweep_membership(map: &mut Membership, known: &HashSet<&str>) -> usize {
    let mut removed = 0;
    for paths in map.values_mut() {
        let before = paths.len();
        let mut seen = HashSet::new();
        paths.retain(|p| known.contains(p.as_str()) && seen.insert(p.clone()));
        removed += before - paths.len();
    }
    map.retain(|_, paths| !paths.is_empty());
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_sweeps_dangling_and_duplicate_memberships() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("index.json"),
            r#"[{"filename":"a.md","path":"/a.md","type":".md"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("tags.json"),
            r#"{"keep":["/a.md","/a.md"],"gone":["/missing.md"]}"#,
        )
        .unwrap();

        let kb = KnowledgeBase::open(dir.path()).unwrap();
        assert_eq!(kb.tags().get("keep").unwrap(), &vec!["/a.md".to_string()]);
        assert!(!kb.tags().contains_key("gone"));

        // the repair is persisted
        let on_disk: Membership =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("tags.json")).unwrap())
                .unwrap();
        assert!(!on_disk.contains_key("gone"));
    }

    #[test]
    fn open_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let kb = KnowledgeBase::open(dir.path().join("kb")).unwrap();
        assert!(kb.documents().is_empty());
        assert!(kb.dir().exists());
    }
}
