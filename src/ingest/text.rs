// file: src/ingest/text.rs
// description: turns admitted document bytes into screenplay text
// reference: https://docs.rs/pdf-extract, https://docs.rs/encoding_rs

use crate::error::{ParseError, PipelineError, Result};
use crate::models::{Document, DocumentFormat};
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

const DOCX_BODY: &str = "word/document.xml";

pub struct TextDecoder {
    /// Tried in order when the bytes are not UTF-8. Empty means strict UTF only.
    legacy_encodings: Vec<&'static Encoding>,
}

impl TextDecoder {
    pub fn new(legacy_encodings: &[String]) -> Result<Self> {
        let legacy_encodings = legacy_encodings
            .iter()
            .map(|label| {
                Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
                    PipelineError::Config(format!("unknown text encoding: {}", label))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { legacy_encodings })
    }

    pub fn strict() -> Self {
        Self {
            legacy_encodings: Vec::new(),
        }
    }

    pub fn decode(&self, document: &Document) -> std::result::Result<String, ParseError> {
        match document.format() {
            DocumentFormat::Pdf => self.extract_pdf(document.content()),
            DocumentFormat::Docx => extract_docx_text(document.content()),
            DocumentFormat::PlainText => self.decode_plain(document.content()),
        }
    }

    fn extract_pdf(&self, bytes: &[u8]) -> std::result::Result<String, ParseError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParseError::TextExtraction(e.to_string()))?;
        debug!("Extracted {} characters of PDF text", text.len());
        Ok(text)
    }

    pub fn decode_plain(&self, bytes: &[u8]) -> std::result::Result<String, ParseError> {
        if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
            return utf8(rest);
        }

        if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
            return utf16(rest, u16::from_le_bytes);
        }

        if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
            return utf16(rest, u16::from_be_bytes);
        }

        match utf8(bytes) {
            Ok(text) => Ok(text),
            Err(err) if self.legacy_encodings.is_empty() => Err(err),
            Err(_) => self.decode_legacy(bytes),
        }
    }

    /// The detector's guess goes first when it is one of the configured
    /// encodings; otherwise the configured order decides.
    fn decode_legacy(&self, bytes: &[u8]) -> std::result::Result<String, ParseError> {
        let mut detector = EncodingDetector::new();
        detector.feed(bytes, true);
        let guess = detector.guess(None, false);

        let candidates = std::iter::once(guess)
            .filter(|guess| self.legacy_encodings.contains(guess))
            .chain(self.legacy_encodings.iter().copied());

        for encoding in candidates {
            let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
            if !had_errors {
                debug!("Decoded {} bytes as {}", bytes.len(), encoding.name());
                return Ok(text.into_owned());
            }
        }

        let tried = self
            .legacy_encodings
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ParseError::InvalidEncoding(format!(
            "not UTF-8 and not decodable as {}",
            tried
        )))
    }
}

/// Paragraph text of a word-processing document, one line per paragraph.
/// Table cells are paragraphs too and come out in reading order.
pub fn extract_docx_text(bytes: &[u8]) -> std::result::Result<String, ParseError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ParseError::TextExtraction(format!("invalid DOCX archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| ParseError::TextExtraction(format!("{}: {}", DOCX_BODY, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| ParseError::TextExtraction(format!("{}: {}", DOCX_BODY, e)))?;

    let text = paragraphs_from_xml(&xml)?;
    debug!("Extracted {} characters of DOCX text", text.len());
    Ok(text)
}

fn paragraphs_from_xml(xml: &str) -> std::result::Result<String, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::TextExtraction(format!("malformed DOCX XML: {}", e)))?;

        match event {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_run_text => {
                let run = e
                    .unescape()
                    .map_err(|e| ParseError::TextExtraction(format!("malformed DOCX XML: {}", e)))?;
                text.push_str(&run);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

fn utf8(bytes: &[u8]) -> std::result::Result<String, ParseError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        ParseError::InvalidEncoding(format!(
            "invalid UTF-8 at byte {}",
            e.utf8_error().valid_up_to()
        ))
    })
}

fn utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> std::result::Result<String, ParseError> {
    if bytes.len() % 2 != 0 {
        return Err(ParseError::InvalidEncoding(
            "odd byte count for UTF-16 text".to_string(),
        ));
    }

    let units = bytes.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));

    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| ParseError::InvalidEncoding(format!("invalid UTF-16: {}", e)))
}
