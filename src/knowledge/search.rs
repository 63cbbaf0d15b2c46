use serde::Serialize;

use super::{DocumentEntry, KnowledgeBase};

// ── Scoring weights ───────────────────────────────────────────────────────────

pub const FILENAME_WEIGHT: u32 = 10;
pub const SUMMARY_WEIGHT: u32 = 5;
pub const PREVIEW_WEIGHT: u32 = 3;

// ── Public types ──────────────────────────────────────────────────────────────

/// A matched document with its keyword score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: DocumentEntry,
    pub search_score: u32,
}

// ── Queries ───────────────────────────────────────────────────────────────────

impl KnowledgeBase {
    /// Case-insensitive substring search over filename, summary and (optionally) preview.
    ///
    /// Hits are sorted by score, descending. Ties keep index order.
    pub fn search(&self, keyword: &str, search_content: bool) -> Vec<SearchHit> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .index
            .iter()
            .filter_map(|doc| {
                let score = score_document(doc, &needle, search_content);
                (score > 0).then(|| SearchHit {
                    entry: doc.clone(),
                    search_score: score,
                })
            })
            .collect();

        // sort_by is stable
        hits.sort_by(|a, b| b.search_score.cmp(&a.search_score));
        hits
    }

    pub fn search_by_tag(&self, tag: &str) -> Vec<DocumentEntry> {
        self.members_of(self.tags.get(tag))
    }

    pub fn search_by_category(&self, category: &str) -> Vec<DocumentEntry> {
        self.members_of(self.categories.get(category))
    }

    /// Most recently updated first.
    pub fn list_documents(&self, limit: Option<usize>) -> Vec<DocumentEntry> {
        let mut docs = self.index.clone();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(n) = limit {
            docs.truncate(n);
        }
        docs
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    pub fn all_categories(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    fn members_of(&self, paths: Option<&Vec<String>>) -> Vec<DocumentEntry> {
        let Some(paths) = paths else {
            return Vec::new();
        };
        self.index
            .iter()
            .filter(|d| paths.contains(&d.path))
            .cloned()
            .collect()
    }
}

fn score_document(doc: &DocumentEntry, needle: &str, search_content: bool) -> u32 {
    let mut score = 0;
    if doc.filename.to_lowercase().contains(needle) {
        score += FILENAME_WEIGHT;
    }
    if doc.summary.to_lowercase().contains(needle) {
        score += SUMMARY_WEIGHT;
    }
    if search_content && doc.content_preview.to_lowercase().contains(needle) {
        score += PREVIEW_WEIGHT;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb_with(docs: &[(&str, &str, &str)]) -> (tempfile::TempDir, KnowledgeBase) {
        let dir = tempfile::tempdir().unwrap();
        let mut kb = KnowledgeBase::open(dir.path()).unwrap();
        for (path, summary, preview) in docs {
            let mut e = DocumentEntry::new(*path);
            e.summary = summary.to_string();
            e.content_preview = preview.to_string();
            kb.add_document(e, &[], None).unwrap();
        }
        (dir, kb)
    }

    #[test]
    fn scores_add_up_across_fields() {
        let (_dir, kb) = kb_with(&[("/Stock.md", "stock notes", "STOCK data")]);
        let hits = kb.search("stock", true);
        assert_eq!(hits[0].search_score, 18);
        let hits = kb.search("stock", false);
        assert_eq!(hits[0].search_score, 15);
    }

    #[test]
    fn preview_only_match_is_dropped_when_content_search_off() {
        let (_dir, kb) = kb_with(&[("/a.md", "", "needle")]);
        assert_eq!(kb.search("needle", true).len(), 1);
        assert!(kb.search("needle", false).is_empty());
    }

    #[test]
    fn ties_keep_index_order() {
        let (_dir, kb) = kb_with(&[("/one.md", "x", ""), ("/two.md", "x", ""), ("/three.md", "x", "")]);
        let order: Vec<_> = kb.search("x", true).into_iter().map(|h| h.entry.path).collect();
        assert_eq!(order, vec!["/one.md", "/two.md", "/three.md"]);
    }

    #[test]
    fn blank_keyword_matches_nothing() {
        let (_dir, kb) = kb_with(&[("/a.md", "a", "a")]);
        assert!(kb.search("   ", true).is_empty());
    }

    #[test]
    fn list_limit() {
        let (_dir, kb) = kb_with(&[("/a.md", "", ""), ("/b.md", "", ""), ("/c.md", "", "")]);
        assert_eq!(kb.list_documents(Some(2)).len(), 2);
        assert_eq!(kb.list_documents(None).len(), 3);
    }
}
