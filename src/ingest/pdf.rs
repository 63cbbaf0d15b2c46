use std::path::Path;
use tracing::debug;

use super::{DocumentParser, IngestError, ParsedContent};
use crate::knowledge::DocFlag;

pub const SCANNED_PLACEHOLDER: &str = "[scanned or image-only PDF, no extractable text]";

/// Paginated PDF text extraction, capped at `page_limit` pages.
pub struct PdfParser {
    page_limit: usize,
}

impl PdfParser {
    pub fn new(page_limit: usize) -> Self {
        Self {
            page_limit: page_limit.max(1),
        }
    }
}

impl DocumentParser for PdfParser {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn parse(&self, path: &Path) -> Result<ParsedContent, IngestError> {
        let bytes = std::fs::read(path).map_err(|e| IngestError::read(path, e))?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
            IngestError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        debug!(path = %path.display(), pages = pages.len(), "pdf extracted");
        Ok(assemble_pages(&pages, self.page_limit))
    }
}

/// Join extracted pages with `--- page N ---` markers, applying the page cap
/// and the scanned/truncated heuristics.
pub fn assemble_pages(pages: &[String], page_limit: usize) -> ParsedContent {
    let mut text = String::new();
    for (i, page) in pages.iter().take(page_limit).enumerate() {
        if page.trim().is_empty() {
            continue;
        }
        text.push_str(&format!("\n--- page {} ---\n", i + 1));
        text.push_str(page);
        text.push('\n');
    }

    let mut flags = Vec::new();
    if text.trim().is_empty() {
        flags.push(DocFlag::Scanned);
        text = SCANNED_PLACEHOLDER.to_string();
    }
    if pages.len() > page_limit {
        flags.push(DocFlag::Truncated);
        text.push_str(&format!(
            "\n... (document has {} pages, only the first {page_limit} were read)",
            pages.len()
        ));
    }

    ParsedContent {
        text,
        page_count: Some(pages.len()),
        flags,
    }
}
