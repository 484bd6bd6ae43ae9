// file: src/parser/classifier.rs
// description: line predicates for scene headings, transitions, cues and dialogue
// reference: industry screenplay formatting conventions

use crate::config::ParserConfig;
use crate::error::{PipelineError, Result};
use crate::models::{SceneHeading, Setting};
use crate::parser::patterns::{collapse_whitespace, strip_cue_decorations, TIME_SEPARATOR, TRANSITION_SUFFIX};
use regex::Regex;
use std::collections::HashSet;

const DIALOGUE_OPENERS: [char; 6] = ['"', '“', '«', '„', '\'', '('];
const CUE_TERMINATORS: [char; 7] = ['.', '!', '?', ':', ';', ',', '…'];

/// Decides what a single trimmed line looks like. Holds no parse state;
/// the parser's state machine combines these answers with context.
pub struct LineClassifier {
    heading: Regex,
    numbered: Option<Regex>,
    headings_must_be_uppercase: bool,
    transition_keywords: HashSet<String>,
    cue_stop_words: HashSet<String>,
    dialogue_indent: usize,
    max_cue_words: usize,
    max_cue_length: usize,
    allow_flush_dialogue: bool,
}

impl LineClassifier {
    pub fn new(config: &ParserConfig) -> Result<Self> {
        // The separator after a prefix is matched separately, so "INT." and
        // "INT" collapse into one alternative that also accepts "INT.OFFICE".
        let prefixes = alternatives(&config.scene_heading_prefixes, |p| p.trim_end_matches('.'));
        if prefixes.is_empty() {
            return Err(PipelineError::Config(
                "no scene heading prefixes configured".to_string(),
            ));
        }

        let pattern = format!(
            r"(?i)^(?:(?P<number>\d+[A-Z]?)(?:[.)]\s*|\s+))?(?P<prefix>{})(?:[.:]\s*|\s+)(?P<rest>\S.*?)(?:\s+#[^#]+#)?$",
            prefixes
        );
        let heading = Regex::new(&pattern)
            .map_err(|e| PipelineError::Config(format!("invalid scene heading prefixes: {}", e)))?;

        let markers = alternatives(&config.scene_number_markers, |m| m);
        let numbered = if markers.is_empty() {
            None
        } else {
            let pattern = format!(
                r"(?i)^(?:{})\s*(?P<number>\d+[A-ZА-ЯЁ]?)(?:\s*[.:)\-–—]\s*|\s+|$)(?P<rest>.*?)(?:\s+#[^#]+#)?$",
                markers
            );
            Some(Regex::new(&pattern).map_err(|e| {
                PipelineError::Config(format!("invalid scene number markers: {}", e))
            })?)
        };

        Ok(Self {
            heading,
            numbered,
            headings_must_be_uppercase: config.headings_must_be_uppercase,
            transition_keywords: upper_set(&config.transition_keywords),
            cue_stop_words: upper_set(&config.cue_stop_words),
            dialogue_indent: config.dialogue_indent,
            max_cue_words: config.max_cue_words,
            max_cue_length: config.max_cue_length,
            allow_flush_dialogue: config.allow_flush_dialogue,
        })
    }

    pub fn parse_scene_heading(&self, line: &str) -> Option<SceneHeading> {
        let trimmed = line.trim();
        self.parse_prefixed_heading(trimmed)
            .or_else(|| self.parse_numbered_header(trimmed))
    }

    fn parse_prefixed_heading(&self, trimmed: &str) -> Option<SceneHeading> {
        if self.headings_must_be_uppercase && !is_uppercase_text(trimmed) {
            return None;
        }

        let caps = self.heading.captures(trimmed)?;
        let prefix = caps.name("prefix")?.as_str();
        let rest = caps.name("rest")?.as_str();
        if rest.starts_with(['-', '–', '—']) {
            return None;
        }

        let (location, time_of_day) = split_location(rest)?;

        Some(SceneHeading {
            raw: trimmed.to_string(),
            number: caps.name("number").map(|m| m.as_str().to_string()),
            setting: Setting::from_prefix(prefix),
            location,
            time_of_day,
        })
    }

    /// `СЦЕНА 12`, `Сц. 3` or `№ 7`, alone or followed by a regular heading
    /// or a bare location. The marker may be in any case; the remainder
    /// follows the usual upper-case rule.
    fn parse_numbered_header(&self, trimmed: &str) -> Option<SceneHeading> {
        let caps = self.numbered.as_ref()?.captures(trimmed)?;
        let number = caps.name("number")?.as_str().to_uppercase();
        let rest = caps.name("rest").map_or("", |m| m.as_str().trim());

        if rest.is_empty() {
            return Some(SceneHeading {
                raw: trimmed.to_string(),
                number: Some(number),
                setting: Setting::Unspecified,
                location: String::new(),
                time_of_day: None,
            });
        }

        if let Some(mut heading) = self.parse_prefixed_heading(rest) {
            heading.raw = trimmed.to_string();
            heading.number = Some(number);
            return Some(heading);
        }

        if self.headings_must_be_uppercase && !is_uppercase_text(rest) {
            return None;
        }

        let (location, time_of_day) = split_location(rest)?;
        Some(SceneHeading {
            raw: trimmed.to_string(),
            number: Some(number),
            setting: Setting::Unspecified,
            location,
            time_of_day,
        })
    }

    /// Returns the transition text when the line is one: a configured
    /// keyword, an upper-case "... TO:" line, or a forced `>` line.
    pub fn transition_text(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();

        if let Some(forced) = trimmed.strip_prefix('>') {
            // ">THE END<" is centered text, not a transition
            if trimmed.ends_with('<') {
                return None;
            }
            let forced = forced.trim();
            return (!forced.is_empty()).then(|| forced.to_string());
        }

        if !is_uppercase_text(trimmed) {
            return None;
        }

        if self.transition_keywords.contains(trimmed) || TRANSITION_SUFFIX.is_match(trimmed) {
            return Some(trimmed.to_string());
        }

        None
    }

    pub fn is_transition(&self, line: &str) -> bool {
        self.transition_text(line).is_some()
    }

    /// Shape check only: short, upper-case, not sentence punctuated and not
    /// a stop word. Whether it really opens dialogue depends on the next line.
    pub fn is_cue_candidate(&self, line: &str) -> bool {
        let base = strip_cue_decorations(line);

        if base.is_empty() || base.chars().count() > self.max_cue_length {
            return false;
        }

        if base.split_whitespace().count() > self.max_cue_words {
            return false;
        }

        if !is_uppercase_text(&base) {
            return false;
        }

        if base.ends_with(CUE_TERMINATORS) {
            return false;
        }

        !self.cue_stop_words.contains(&collapse_whitespace(&base))
    }

    /// `indent` is measured relative to the document's leftmost text column.
    /// `adjacent` is true when the line directly follows the cue with no blank
    /// line in between.
    pub fn opens_dialogue(&self, indent: usize, line: &str, adjacent: bool) -> bool {
        let trimmed = line.trim_start();

        if trimmed.is_empty() {
            return false;
        }

        indent >= self.dialogue_indent
            || trimmed.starts_with(DIALOGUE_OPENERS)
            || (self.allow_flush_dialogue && adjacent)
    }

    pub fn is_parenthetical(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.len() >= 2 && trimmed.starts_with('(') && trimmed.ends_with(')')
    }
}

/// Splits "HOUSE - KITCHEN - NIGHT" at the last separator. None when no
/// location text is left.
fn split_location(rest: &str) -> Option<(String, Option<String>)> {
    let (location, time_of_day) = match TIME_SEPARATOR.find_iter(rest).last() {
        Some(sep) => (&rest[..sep.start()], Some(&rest[sep.end()..])),
        None => (rest, None),
    };

    let location = collapse_whitespace(location.trim_end_matches(['.', ',', ' ']));
    if !location.chars().any(char::is_alphanumeric) {
        return None;
    }

    let time_of_day = time_of_day
        .map(|t| collapse_whitespace(t.trim_end_matches('.')))
        .filter(|t| !t.is_empty());

    Some((location, time_of_day))
}

/// Escaped regex alternation, longest first so "INT./EXT" wins over "INT".
fn alternatives<'a>(values: &'a [String], shape: impl Fn(&'a str) -> &'a str) -> String {
    let mut values: Vec<&str> = values
        .iter()
        .map(|v| shape(v.trim()))
        .filter(|v| !v.is_empty())
        .collect();

    values.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
    values.dedup();

    values
        .iter()
        .map(|v| regex::escape(v))
        .collect::<Vec<_>>()
        .join("|")
}

fn upper_set(values: &[String]) -> HashSet<String> {
    values
        .iter()
        .map(|v| collapse_whitespace(&v.to_uppercase()))
        .filter(|v| !v.is_empty())
        .collect()
}

/// At least one letter and no lower-case letters.
pub fn is_uppercase_text(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}

/// Leading columns of a raw line, counting a tab as four columns.
pub fn leading_columns(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn classifier() -> LineClassifier {
        LineClassifier::new(&Config::default_config().parser).unwrap()
    }

    #[test]
    fn test_standard_heading() {
        let heading = classifier().parse_scene_heading("INT. KITCHEN - DAY").unwrap();

        assert_eq!(heading.setting, Setting::Interior);
        assert_eq!(heading.location, "KITCHEN");
        assert_eq!(heading.time_of_day.as_deref(), Some("DAY"));
        assert_eq!(heading.number, None);
    }

    #[test]
    fn test_numbered_heading_with_compound_location() {
        let heading = classifier()
            .parse_scene_heading("12A. EXT./INT. HOUSE - KITCHEN - NIGHT")
            .unwrap();

        assert_eq!(heading.number.as_deref(), Some("12A"));
        assert_eq!(heading.setting, Setting::InteriorExterior);
        assert_eq!(heading.location, "HOUSE - KITCHEN");
        assert_eq!(heading.time_of_day.as_deref(), Some("NIGHT"));
    }

    #[test]
    fn test_heading_without_time_of_day() {
        let heading = classifier().parse_scene_heading("EXT. DESERT").unwrap();

        assert_eq!(heading.setting, Setting::Exterior);
        assert_eq!(heading.location, "DESERT");
        assert_eq!(heading.time_of_day, None);
    }

    #[test]
    fn test_russian_heading() {
        let heading = classifier().parse_scene_heading("ИНТ. КУХНЯ — ВЕЧЕР").unwrap();

        assert_eq!(heading.setting, Setting::Interior);
        assert_eq!(heading.location, "КУХНЯ");
        assert_eq!(heading.time_of_day.as_deref(), Some("ВЕЧЕР"));
    }

    #[test]
    fn test_compact_headings_without_space_after_prefix() {
        let c = classifier();

        let heading = c.parse_scene_heading("INT.OFFICE - DAY").unwrap();
        assert_eq!(heading.setting, Setting::Interior);
        assert_eq!(heading.location, "OFFICE");
        assert_eq!(heading.time_of_day.as_deref(), Some("DAY"));

        let heading = c.parse_scene_heading("ИНТ.КУХНЯ - ДЕНЬ").unwrap();
        assert_eq!(heading.setting, Setting::Interior);
        assert_eq!(heading.location, "КУХНЯ");
        assert_eq!(heading.time_of_day.as_deref(), Some("ДЕНЬ"));

        let heading = c.parse_scene_heading("1.ИНТЕРЬЕР. КУХНЯ - ДЕНЬ").unwrap();
        assert_eq!(heading.number.as_deref(), Some("1"));
        assert_eq!(heading.setting, Setting::Interior);
        assert_eq!(heading.location, "КУХНЯ");

        let heading = c.parse_scene_heading("EXT.PARK").unwrap();
        assert_eq!(heading.setting, Setting::Exterior);
        assert_eq!(heading.location, "PARK");
        assert_eq!(heading.time_of_day, None);
    }

    #[test]
    fn test_numbered_scene_headers() {
        let c = classifier();

        let heading = c.parse_scene_heading("СЦЕНА 1").unwrap();
        assert_eq!(heading.number.as_deref(), Some("1"));
        assert_eq!(heading.setting, Setting::Unspecified);
        assert_eq!(heading.location, "");
        assert_eq!(heading.time_of_day, None);

        assert_eq!(c.parse_scene_heading("Сц. 12").unwrap().number.as_deref(), Some("12"));
        assert_eq!(c.parse_scene_heading("№7").unwrap().number.as_deref(), Some("7"));
        assert_eq!(c.parse_scene_heading("# 3").unwrap().number.as_deref(), Some("3"));
        assert_eq!(c.parse_scene_heading("сцена 4а").unwrap().number.as_deref(), Some("4А"));
    }

    #[test]
    fn test_numbered_header_followed_by_heading_or_location() {
        let c = classifier();

        let heading = c.parse_scene_heading("СЦЕНА 5. ИНТ. КУХНЯ - ДЕНЬ").unwrap();
        assert_eq!(heading.number.as_deref(), Some("5"));
        assert_eq!(heading.setting, Setting::Interior);
        assert_eq!(heading.location, "КУХНЯ");
        assert_eq!(heading.raw, "СЦЕНА 5. ИНТ. КУХНЯ - ДЕНЬ");

        let heading = c.parse_scene_heading("СЦЕНА 6: КВАРТИРА АННЫ - НОЧЬ").unwrap();
        assert_eq!(heading.setting, Setting::Unspecified);
        assert_eq!(heading.location, "КВАРТИРА АННЫ");
        assert_eq!(heading.time_of_day.as_deref(), Some("НОЧЬ"));
    }

    #[test]
    fn test_numbered_header_lookalikes() {
        let c = classifier();

        assert!(c.parse_scene_heading("СЦЕНА").is_none());
        assert!(c.parse_scene_heading("СЦЕНАРИЙ 2").is_none());
        assert!(c.parse_scene_heading("Сцена 2 начинается ночью").is_none());
        assert!(c.parse_scene_heading("№ дома неизвестен").is_none());
    }

    #[test]
    fn test_numbered_headers_can_be_disabled() {
        let mut config = Config::default_config().parser;
        config.scene_number_markers.clear();
        let c = LineClassifier::new(&config).unwrap();

        assert!(c.parse_scene_heading("СЦЕНА 1").is_none());
        assert!(c.parse_scene_heading("ИНТ. КУХНЯ - ДЕНЬ").is_some());
    }

    #[test]
    fn test_non_headings() {
        let c = classifier();

        assert!(c.parse_scene_heading("Int. kitchen - day").is_none());
        assert!(c.parse_scene_heading("INTERCUT WITH PHONE").is_none());
        assert!(c.parse_scene_heading("EXTRA LARGE COFFEE").is_none());
        assert!(c.parse_scene_heading("INT. - DAY").is_none());
        assert!(c.parse_scene_heading("He walks into the kitchen.").is_none());
    }

    #[test]
    fn test_lowercase_headings_when_allowed() {
        let mut config = Config::default_config().parser;
        config.headings_must_be_uppercase = false;
        let c = LineClassifier::new(&config).unwrap();

        let heading = c.parse_scene_heading("int. kitchen - day").unwrap();
        assert_eq!(heading.location, "kitchen");
    }

    #[test]
    fn test_transitions() {
        let c = classifier();

        assert_eq!(c.transition_text("CUT TO:").as_deref(), Some("CUT TO:"));
        assert_eq!(c.transition_text("FADE IN:").as_deref(), Some("FADE IN:"));
        assert_eq!(c.transition_text("> BURN TO WHITE.").as_deref(), Some("BURN TO WHITE."));
        assert!(!c.is_transition(">THE END<"));
        assert!(!c.is_transition("He cut to the chase:"));
    }

    #[test]
    fn test_cue_candidates() {
        let c = classifier();

        assert!(c.is_cue_candidate("JOHN"));
        assert!(c.is_cue_candidate("JOHN (V.O.)"));
        assert!(c.is_cue_candidate("MRS. ROBINSON"));
        assert!(c.is_cue_candidate("АННА"));

        assert!(!c.is_cue_candidate("John"));
        assert!(!c.is_cue_candidate("BANG!"));
        assert!(!c.is_cue_candidate("THE END"));
        assert!(!c.is_cue_candidate("(beat)"));
        assert!(!c.is_cue_candidate("A VERY LONG SHOUTED LINE OF ACTION"));
        assert!(!c.is_cue_candidate("1984"));
    }

    #[test]
    fn test_opens_dialogue() {
        let c = classifier();

        assert!(c.opens_dialogue(4, "Hello.", true));
        assert!(c.opens_dialogue(0, "\"Hello.\"", true));
        assert!(c.opens_dialogue(0, "(quietly)", false));
        assert!(!c.opens_dialogue(0, "Hello.", true));
    }

    #[test]
    fn test_flush_dialogue_requires_adjacency() {
        let mut config = Config::default_config().parser;
        config.allow_flush_dialogue = true;
        let c = LineClassifier::new(&config).unwrap();

        assert!(c.opens_dialogue(0, "Hello.", true));
        assert!(!c.opens_dialogue(0, "Hello.", false));
    }

    #[test]
    fn test_leading_columns() {
        assert_eq!(leading_columns("    JOHN"), 4);
        assert_eq!(leading_columns("\tJOHN"), 4);
        assert_eq!(leading_columns("JOHN"), 0);
    }
}
