//! Document deletion.
//!
//! Removing a document also sweeps every tag and category list that named it,
//! in the same save.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use super::{KnowledgeBase, Membership};

/// Result returned from [`KnowledgeBase::delete_document`].
#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub path: String,
    /// `true` if the document was in the index.
    pub removed: bool,
    /// Tag and category memberships dropped along with it.
    pub memberships_swept: usize,
}

impl KnowledgeBase {
    pub fn delete_document(&mut self, path: &str) -> Result<DeleteResult> {
        let before = self.index.len();
        self.index.retain(|d| d.path != path);
        let removed = self.index.len() != before;

        let memberships_swept =
            remove_path(&mut self.tags, path) + remove_path(&mut self.categories, path);

        self.save()?;
        debug!(path, removed, memberships_swept, "document deleted");

        Ok(DeleteResult {
            path: path.to_string(),
            removed,
            memberships_swept,
        })
    }
}

fn remove_path(map: &mut Membership, path: &str) -> usize {
    let mut removed = 0;
    for paths in map.values_mut() {
        let before = paths.len();
        paths.retain(|p| p != path);
        removed += before - paths.len();
    }
    map.retain(|_, paths| !paths.is_empty());
    removed
}
