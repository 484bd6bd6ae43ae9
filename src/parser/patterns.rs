// file: src/parser/patterns.rs
// description: compiled regex patterns for screenplay line classification
// reference: https://docs.rs/regex

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Cue extensions: (V.O.), (O.S.), (CONT'D), possibly several in a row
    pub static ref CUE_EXTENSION: Regex = Regex::new(
        r"(?:\s*\([^()]*\))+\s*$"
    ).expect("CUE_EXTENSION regex is valid");

    // "CUT TO:", "SMASH CUT TO:", "MATCH DISSOLVE TO:"
    pub static ref TRANSITION_SUFFIX: Regex = Regex::new(
        r"^[\p{Lu}][\p{Lu}\s.'’/-]*\sTO:$"
    ).expect("TRANSITION_SUFFIX regex is valid");

    // Separator between location and time of day: "OFFICE - DAY", "ОФИС — ДЕНЬ"
    pub static ref TIME_SEPARATOR: Regex = Regex::new(
        r"\s+[-–—]+\s+"
    ).expect("TIME_SEPARATOR regex is valid");

    pub static ref WHITESPACE_RUN: Regex = Regex::new(
        r"\s+"
    ).expect("WHITESPACE_RUN regex is valid");

    // Fountain notes: [[ ... ]]
    pub static ref INLINE_NOTE: Regex = Regex::new(
        r"\[\[[^\]]*\]\]"
    ).expect("INLINE_NOTE regex is valid");

    // Bare page numbers left behind by PDF extraction: "12", "12."
    pub static ref PAGE_NUMBER: Regex = Regex::new(
        r"^\s*\d{1,3}\.?\s*$"
    ).expect("PAGE_NUMBER regex is valid");

    pub static ref SENTENCE_END: Regex = Regex::new(
        r"[.!?…]+"
    ).expect("SENTENCE_END regex is valid");

    // Page-break continuation markers
    pub static ref CONTINUED_MARKER: Regex = Regex::new(
        r"^\s*(?:\(CONTINUED\)|CONTINUED:|\(ПРОДОЛЖЕНИЕ\))\s*$"
    ).expect("CONTINUED_MARKER regex is valid");
}

/// Strips cue extensions and the dual-dialogue caret, keeping the bare name.
pub fn strip_cue_decorations(cue: &str) -> String {
    let without_caret = cue.trim().trim_end_matches('^').trim_end();
    CUE_EXTENSION
        .replace(without_caret, "")
        .trim()
        .trim_end_matches('^')
        .trim()
        .to_string()
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_extension_stripping() {
        assert_eq!(strip_cue_decorations("JOHN (V.O.)"), "JOHN");
        assert_eq!(strip_cue_decorations("JOHN (O.S.) (CONT'D)"), "JOHN");
        assert_eq!(strip_cue_decorations("MARY ^"), "MARY");
        assert_eq!(strip_cue_decorations("  DR. SMITH  "), "DR. SMITH");
    }

    #[test]
    fn test_transition_suffix() {
        assert!(TRANSITION_SUFFIX.is_match("CUT TO:"));
        assert!(TRANSITION_SUFFIX.is_match("SMASH CUT TO:"));
        assert!(!TRANSITION_SUFFIX.is_match("He walks to:"));
        assert!(!TRANSITION_SUFFIX.is_match("TO:"));
    }

    #[test]
    fn test_time_separator() {
        assert!(TIME_SEPARATOR.is_match("OFFICE - DAY"));
        assert!(TIME_SEPARATOR.is_match("ОФИС — ДЕНЬ"));
        assert!(!TIME_SEPARATOR.is_match("SEMI-DETACHED HOUSE"));
    }

    #[test]
    fn test_page_number_and_continued() {
        assert!(PAGE_NUMBER.is_match("  12."));
        assert!(!PAGE_NUMBER.is_match("12 ANGRY MEN"));
        assert!(CONTINUED_MARKER.is_match("(CONTINUED)"));
        assert!(CONTINUED_MARKER.is_match("CONTINUED:"));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  BIG   OLD\tHOUSE "), "BIG OLD HOUSE");
    }
}
