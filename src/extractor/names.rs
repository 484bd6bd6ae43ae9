// file: src/extractor/names.rs
// description: identity normalization for characters, locations and times of day
// reference: screenplay cue and heading conventions

use crate::parser::patterns::{collapse_whitespace, strip_cue_decorations};

/// "  john  (V.O.)" and "JOHN (CONT'D)" both become "JOHN".
pub fn normalize_character_name(raw: &str) -> Option<String> {
    let name = collapse_whitespace(&strip_cue_decorations(raw)).to_uppercase();
    (!name.is_empty()).then_some(name)
}

pub fn normalize_location(raw: &str) -> String {
    collapse_whitespace(raw).to_uppercase()
}

pub fn normalize_time_of_day(raw: &str) -> Option<String> {
    let time = collapse_whitespace(raw)
        .trim_end_matches('.')
        .trim_end()
        .to_uppercase();
    (!time.is_empty()).then_some(time)
}
