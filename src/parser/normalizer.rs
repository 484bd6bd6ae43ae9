// file: src/parser/normalizer.rs
// description: Screenplay text normalization for consistent line classification
// reference: plain-text and Fountain screenplay conventions

use crate::parser::patterns::{CONTINUED_MARKER, INLINE_NOTE, PAGE_NUMBER};

const TAB_WIDTH: usize = 4;

pub struct ScriptNormalizer;

impl ScriptNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, content: &str) -> String {
        let mut normalized = self.normalize_line_endings(content);

        normalized = self.normalize_whitespace(&normalized);
        normalized = self.remove_notes(&normalized);
        normalized = self.remove_page_artifacts(&normalized);

        normalized
    }

    fn normalize_line_endings(&self, content: &str) -> String {
        content
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .replace('\u{000C}', "\n")
    }

    fn normalize_whitespace(&self, content: &str) -> String {
        content
            .lines()
            .map(|line| {
                line.replace('\t', &" ".repeat(TAB_WIDTH))
                    .replace('\u{00A0}', " ")
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn remove_notes(&self, content: &str) -> String {
        if !content.contains("[[") {
            return content.to_string();
        }

        content
            .lines()
            .map(|line| INLINE_NOTE.replace_all(line, "").trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Page numbers and CONTINUED markers become blank lines so they never
    /// glue two paragraphs together or read as a character cue.
    fn remove_page_artifacts(&self, content: &str) -> String {
        content
            .lines()
            .map(|line| {
                if PAGE_NUMBER.is_match(line) || CONTINUED_MARKER.is_match(line) {
                    ""
                } else {
                    line
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ScriptNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
