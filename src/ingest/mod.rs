//! Document and image ingestion.
//!
//! Parsers are picked by lower-cased file extension through [`parser_for`].
//! Each one turns a file into [`ParsedContent`], which [`learner`] condenses
//! into a [`DocumentEntry`](crate::knowledge::DocumentEntry) for the index.
//!
//! | Parser | Extensions |
//! |--------|------------|
//! | [`text::TextParser`] | `.txt .md .json .csv .log .toml .yaml .yml` |
//! | [`text::CodeParser`] | `.py .rs .js .ts .go .java .c .cpp .h .sh` |
//! | [`pdf::PdfParser`] | `.pdf` |
//! | [`vision::ImageParser`] | `.jpg .jpeg .png .gif .bmp .webp` |

pub mod learner;
pub mod pdf;
pub mod text;
pub mod vision;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::KnowledgeConfig;
use crate::knowledge::DocFlag;

pub const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".json", ".csv", ".log", ".toml", ".yaml", ".yml",
];
pub const CODE_EXTENSIONS: &[&str] = &[
    ".py", ".rs", ".js", ".ts", ".go", ".java", ".c", ".cpp", ".h", ".sh",
];
pub const PDF_EXTENSIONS: &[&str] = &[".pdf"];
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported file type: {ext}")]
    Unsupported { ext: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("OCR failed: {0}")]
    Ocr(String),
}

impl IngestError {
    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Text pulled out of a file plus any heuristic flags raised on the way.
#[derive(Debug, Clone, Default)]
pub struct ParsedContent {
    pub text: String,
    pub page_count: Option<usize>,
    pub flags: Vec<DocFlag>,
}

impl ParsedContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Turns one file into text. Implementations are synchronous.
pub trait DocumentParser: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn parse(&self, path: &Path) -> Result<ParsedContent, IngestError>;
}

/// Pick the parser for a lower-cased extension with its leading dot.
pub fn parser_for(ext: &str, config: &KnowledgeConfig) -> Option<Box<dyn DocumentParser>> {
    if TEXT_EXTENSIONS.contains(&ext) {
        Some(Box::new(text::TextParser))
    } else if CODE_EXTENSIONS.contains(&ext) {
        Some(Box::new(text::CodeParser))
    } else if PDF_EXTENSIONS.contains(&ext) {
        Some(Box::new(pdf::PdfParser::new(config.pdf_page_limit)))
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        Some(Box::new(vision::ImageParser))
    } else {
        None
    }
}

pub fn is_supported(ext: &str) -> bool {
    TEXT_EXTENSIONS.contains(&ext)
        || CODE_EXTENSIONS.contains(&ext)
        || PDF_EXTENSIONS.contains(&ext)
        || IMAGE_EXTENSIONS.contains(&ext)
}

pub fn is_image(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

/// Every supported extension, in table order.
pub fn supported_extensions() -> Vec<&'static str> {
    TEXT_EXTENSIONS
        .iter()
        .chain(CODE_EXTENSIONS)
        .chain(PDF_EXTENSIONS)
        .chain(IMAGE_EXTENSIONS)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_by_extension() {
        let config = KnowledgeConfig::default();
        assert_eq!(parser_for(".md", &config).unwrap().name(), "text");
        assert_eq!(parser_for(".rs", &config).unwrap().name(), "code");
        assert_eq!(parser_for(".pdf", &config).unwrap().name(), "pdf");
        assert_eq!(parser_for(".webp", &config).unwrap().name(), "image");
        assert!(parser_for(".exe", &config).is_none());
        assert!(parser_for("", &config).is_none());
    }

    #[test]
    fn supported_list_matches_dispatch() {
        let config = KnowledgeConfig::default();
        for ext in supported_extensions() {
            assert!(is_supported(ext));
            assert!(parser_for(ext, &config).is_some(), "{ext}");
        }
        assert!(is_image(".png"));
        assert!(!is_image(".pdf"));
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = IngestError::read(
            Path::new("/x"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, IngestError::NotFound(_)));
    }
}
