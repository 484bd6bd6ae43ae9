// file: src/models/document.rs
// description: admitted upload with content fingerprint and derived page estimate
// reference: internal data structures

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Sniffs the format from content; the declared filename is never trusted.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF-") {
            Self::Pdf
        } else if bytes.starts_with(b"PK\x03\x04") {
            Self::Docx
        } else {
            Self::PlainText
        }
    }
}

/// An upload that passed the ingestion gate. Immutable once built.
#[derive(Debug, Clone)]
pub struct Document {
    content: Vec<u8>,
    filename: String,
    format: DocumentFormat,
    estimated_pages: usize,
    fingerprint: String,
}

impl Document {
    pub fn new(content: Vec<u8>, filename: String, estimated_pages: usize) -> Self {
        let fingerprint = Self::compute_fingerprint(&content);
        let format = DocumentFormat::detect(&content);

        Self {
            content,
            filename,
            format,
            estimated_pages,
            fingerprint,
        }
    }

    pub fn compute_fingerprint(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("{:x}", hasher.finalize())
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn byte_len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn estimated_pages(&self) -> usize {
        self.estimated_pages
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_creation() {
        let doc = Document::new(b"INT. OFFICE - DAY".to_vec(), "draft.txt".to_string(), 1);

        assert_eq!(doc.byte_len(), 17);
        assert_eq!(doc.format(), DocumentFormat::PlainText);
        assert_eq!(doc.fingerprint().len(), 64);
        assert_eq!(doc.filename(), "draft.txt");
    }

    #[test]
    fn test_fingerprint_ignores_filename() {
        let a = Document::new(b"same bytes".to_vec(), "a.txt".to_string(), 1);
        let b = Document::new(b"same bytes".to_vec(), "b.fountain".to_string(), 1);
        let c = Document::new(b"other bytes".to_vec(), "a.txt".to_string(), 1);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_pdf_detection() {
        assert_eq!(DocumentFormat::detect(b"%PDF-1.7\n..."), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::detect(b"PDF draft"), DocumentFormat::PlainText);
        assert_eq!(DocumentFormat::detect(b"PK\x03\x04\x14\x00"), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::detect(b"PK and popcorn"), DocumentFormat::PlainText);
    }
}
