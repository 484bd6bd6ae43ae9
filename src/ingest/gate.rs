// file: src/ingest/gate.rs
// description: admission checks bounding parse cost before any parsing begins
// reference: upload validation of size, format and page limits

use crate::config::Config;
use crate::error::RejectionReason;
use crate::ingest::text::extract_docx_text;
use crate::models::{Document, DocumentFormat};
use std::path::Path;
use tracing::{debug, warn};

const FORM_FEED: u8 = 0x0C;

#[derive(Debug, Clone)]
pub struct IngestionGate {
    max_file_size_bytes: u64,
    max_pages: usize,
    lines_per_page: usize,
    allowed_extensions: Vec<String>,
}

impl IngestionGate {
    pub fn new(
        max_file_size_bytes: u64,
        max_pages: usize,
        lines_per_page: usize,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            max_file_size_bytes,
            max_pages,
            lines_per_page: lines_per_page.max(1),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_file_size_bytes(),
            config.limits.max_pages,
            config.analysis.lines_per_page,
            config.limits.allowed_extensions.clone(),
        )
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    /// Admits an upload or says why not. Checks run cheapest first so an
    /// oversized upload is never hashed or scanned.
    pub fn admit(
        &self,
        bytes: Vec<u8>,
        declared_filename: &str,
    ) -> Result<Document, RejectionReason> {
        self.check_size(bytes.len() as u64)?;
        self.check_extension(declared_filename)?;

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(RejectionReason::EmptyDocument);
        }

        let format = DocumentFormat::detect(&bytes);
        let estimated_pages = self.estimate_pages(&bytes, format)?;

        if estimated_pages > self.max_pages {
            warn!(
                "Rejecting {}: estimated {} pages exceeds limit {}",
                declared_filename, estimated_pages, self.max_pages
            );
            return Err(RejectionReason::TooManyPages {
                estimated_pages,
                limit: self.max_pages,
            });
        }

        let document = Document::new(bytes, declared_filename.to_string(), estimated_pages);
        debug!(
            "Admitted {} ({} bytes, ~{} pages, fingerprint {})",
            declared_filename,
            document.byte_len(),
            estimated_pages,
            document.fingerprint()
        );

        Ok(document)
    }

    /// Exactly the configured maximum is admitted; one byte more is not.
    pub fn check_size(&self, size_bytes: u64) -> Result<(), RejectionReason> {
        if size_bytes > self.max_file_size_bytes {
            return Err(RejectionReason::FileTooLarge {
                size_bytes,
                limit_bytes: self.max_file_size_bytes,
            });
        }
        Ok(())
    }

    /// Files without an extension are accepted; the format is sniffed from content.
    pub fn check_extension(&self, filename: &str) -> Result<(), RejectionReason> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension {
            None => Ok(()),
            Some(ext) if self.allowed_extensions.is_empty() => {
                debug!("No extension allow-list configured, accepting .{}", ext);
                Ok(())
            }
            Some(ext) if self.allowed_extensions.contains(&ext) => Ok(()),
            Some(ext) => Err(RejectionReason::UnsupportedFormat(format!(
                ".{} (supported: {})",
                ext,
                self.allowed_extensions.join(", ")
            ))),
        }
    }

    pub fn estimate_pages(
        &self,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<usize, RejectionReason> {
        match format {
            DocumentFormat::Pdf => pdf_page_count(bytes),
            DocumentFormat::Docx => {
                let text = extract_docx_text(bytes)
                    .map_err(|e| RejectionReason::Unreadable(format!("invalid DOCX: {}", e)))?;
                Ok(estimate_text_pages(text.as_bytes(), self.lines_per_page))
            }
            DocumentFormat::PlainText => Ok(estimate_text_pages(bytes, self.lines_per_page)),
        }
    }
}

/// Reads the page tree only; content streams are left for the parser.
fn pdf_page_count(bytes: &[u8]) -> Result<usize, RejectionReason> {
    let document = pdf_extract::Document::load_mem(bytes)
        .map_err(|e| RejectionReason::Unreadable(format!("invalid PDF: {}", e)))?;
    Ok(document.get_pages().len().max(1))
}

/// Embedded form feeds are treated as page breaks; otherwise pages are
/// derived from the line count.
pub fn estimate_text_pages(bytes: &[u8], lines_per_page: usize) -> usize {
    let form_feeds = bytes.iter().filter(|&&b| b == FORM_FEED).count();
    if form_feeds > 0 {
        let trailing = bytes
            .iter()
            .rev()
            .find(|b| !b.is_ascii_whitespace() || **b == FORM_FEED)
            .is_some_and(|&b| b == FORM_FEED);
        return if trailing { form_feeds } else { form_feeds + 1 };
    }

    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    let lines = if bytes.last() == Some(&b'\n') {
        newlines
    } else {
        newlines + 1
    };

    lines.div_ceil(lines_per_page.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::text::tests::docx_bytes;

    const MIB: u64 = 1024 * 1024;

    fn gate(max_mb: u64, max_pages: usize) -> IngestionGate {
        IngestionGate::new(
            max_mb * MIB,
            max_pages,
            55,
            vec![
                "txt".to_string(),
                "fountain".to_string(),
                "pdf".to_string(),
                "docx".to_string(),
            ],
        )
    }

    #[test]
    fn test_exact_size_limit_is_admitted() {
        let gate = gate(1, 120);
        let bytes = vec![b'a'; MIB as usize];

        let document = gate.admit(bytes, "limit.txt").unwrap();
        assert_eq!(document.byte_len(), MIB);
    }

    #[test]
    fn test_one_byte_over_limit_is_rejected() {
        let gate = gate(1, 120);
        let bytes = vec![b'a'; MIB as usize + 1];

        let err = gate.admit(bytes, "over.txt").unwrap_err();
        assert_eq!(
            err,
            RejectionReason::FileTooLarge {
                size_bytes: MIB + 1,
                limit_bytes: MIB,
            }
        );
    }

    #[test]
    fn test_too_many_pages_rejected_before_parsing() {
        let gate = gate(10, 2);
        let text = "line\n".repeat(55 * 3);

        let err = gate.admit(text.into_bytes(), "long.txt").unwrap_err();
        assert_eq!(
            err,
            RejectionReason::TooManyPages {
                estimated_pages: 3,
                limit: 2,
            }
        );
    }

    #[test]
    fn test_form_feeds_mark_pages() {
        assert_eq!(estimate_text_pages(b"page one\x0Cpage two\x0Cpage three", 55), 3);
        assert_eq!(estimate_text_pages(b"page one\x0Cpage two\x0C\n", 55), 2);
    }

    #[test]
    fn test_line_based_estimate() {
        assert_eq!(estimate_text_pages(b"single line", 55), 1);
        let exactly_one_page = "x\n".repeat(55);
        assert_eq!(estimate_text_pages(exactly_one_page.as_bytes(), 55), 1);
        let just_over = "x\n".repeat(56);
        assert_eq!(estimate_text_pages(just_over.as_bytes(), 55), 2);
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let gate = gate(1, 120);
        let err = gate.admit(b"INT. ROOM - DAY".to_vec(), "script.rtf").unwrap_err();
        assert!(matches!(err, RejectionReason::UnsupportedFormat(_)));

        assert!(gate.admit(b"INT. ROOM - DAY".to_vec(), "SCRIPT.TXT").is_ok());
        assert!(gate.admit(b"INT. ROOM - DAY".to_vec(), "upload").is_ok());
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let gate = gate(1, 120);
        assert_eq!(
            gate.admit(b" \n\t\n".to_vec(), "blank.txt").unwrap_err(),
            RejectionReason::EmptyDocument
        );
        assert_eq!(
            gate.admit(Vec::new(), "blank.txt").unwrap_err(),
            RejectionReason::EmptyDocument
        );
    }

    #[test]
    fn test_broken_pdf_is_unreadable() {
        let gate = gate(1, 120);
        let err = gate.admit(b"%PDF-1.4 garbage".to_vec(), "broken.pdf").unwrap_err();
        assert!(matches!(err, RejectionReason::Unreadable(_)));
    }

    #[test]
    fn test_docx_pages_estimated_from_paragraphs() {
        let gate = gate(1, 2);
        let lines = vec!["Rain."; 55 * 2];
        let document = gate.admit(docx_bytes(&lines), "draft.docx").unwrap();

        assert_eq!(document.format(), DocumentFormat::Docx);
        assert_eq!(document.estimated_pages(), 2);

        let lines = vec!["Rain."; 55 * 2 + 1];
        let err = gate.admit(docx_bytes(&lines), "long.docx").unwrap_err();
        assert_eq!(
            err,
            RejectionReason::TooManyPages {
                estimated_pages: 3,
                limit: 2,
            }
        );
    }

    #[test]
    fn test_broken_docx_is_unreadable() {
        let gate = gate(1, 120);
        let err = gate.admit(b"PK\x03\x04 not really".to_vec(), "broken.docx").unwrap_err();
        assert!(matches!(err, RejectionReason::Unreadable(_)));
    }
}
