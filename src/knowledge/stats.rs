use serde::Serialize;
use std::collections::BTreeMap;

use super::KnowledgeBase;

/// Aggregate view of the knowledge base.
#[derive(Debug, Serialize)]
pub struct KnowledgeStats {
    pub total_documents: usize,
    pub total_tags: usize,
    pub total_categories: usize,
    pub total_size_bytes: u64,
    /// Document count per extension. Entries without one count as `unknown`.
    pub type_distribution: BTreeMap<String, usize>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
}

impl KnowledgeBase {
    pub fn stats(&self) -> KnowledgeStats {
        let mut type_distribution = BTreeMap::new();
        for doc in &self.index {
            let ext = if doc.extension.is_empty() {
                "unknown"
            } else {
                doc.extension.as_str()
            };
            *type_distribution.entry(ext.to_string()).or_insert(0) += 1;
        }

        KnowledgeStats {
            total_documents: self.index.len(),
            total_tags: self.tags.len(),
            total_categories: self.categories.len(),
            total_size_bytes: self.index.iter().map(|d| d.size).sum(),
            type_distribution,
            tags: self.all_tags(),
            categories: self.all_categories(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::DocumentEntry;

    #[test]
    fn stats_count_types_and_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let mut kb = KnowledgeBase::open(dir.path()).unwrap();
        for (path, size) in [("/a.md", 10), ("/b.md", 5), ("/c.pdf", 100), ("/README", 1)] {
            let mut e = DocumentEntry::new(path);
            e.size = size;
            kb.add_document(e, &["t".into()], None).unwrap();
        }

        let stats = kb.stats();
        assert_eq!(stats.total_documents, 4);
        assert_eq!(stats.total_size_bytes, 116);
        assert_eq!(stats.type_distribution[".md"], 2);
        assert_eq!(stats.type_distribution["unknown"], 1);
        assert_eq!(stats.tags, vec!["t"]);
        assert_eq!(stats.total_categories, 0);
    }
}
