// file: src/parser/screenplay.rs
// description: line-oriented state machine turning screenplay text into elements
// reference: industry screenplay formatting conventions

use crate::config::ParserConfig;
use crate::error::{ParseError, Result};
use crate::ingest::TextDecoder;
use crate::models::{Document, ScriptElement};
use crate::parser::classifier::{leading_columns, LineClassifier};
use crate::parser::normalizer::ScriptNormalizer;
use crate::parser::patterns::strip_cue_decorations;
use std::borrow::Cow;
use tracing::{debug, warn};

pub struct ScriptParser {
    classifier: LineClassifier,
    normalizer: Option<ScriptNormalizer>,
    decoder: TextDecoder,
}

#[derive(Debug)]
enum ParseState {
    ExpectHeadingOrAction,
    InAction,
    InDialogue {
        speaker: String,
        /// Column of the first dialogue line; cues at this column are dialogue.
        indent: Option<usize>,
        spoken: bool,
    },
}

struct ScriptLine<'a> {
    indent: usize,
    text: &'a str,
}

impl ScriptLine<'_> {
    fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

impl ScriptParser {
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            classifier: LineClassifier::new(config)?,
            normalizer: config.normalize_text.then(ScriptNormalizer::new),
            decoder: TextDecoder::new(&config.legacy_encodings)?,
        })
    }

    pub fn parse(&self, document: &Document) -> std::result::Result<Vec<ScriptElement>, ParseError> {
        let text = self.decoder.decode(document)?;
        debug!(
            "Decoded {} into {} characters of text",
            document.filename(),
            text.len()
        );
        self.parse_text(&text)
    }

    pub fn parse_text(&self, text: &str) -> std::result::Result<Vec<ScriptElement>, ParseError> {
        let normalized = match &self.normalizer {
            Some(normalizer) => Cow::Owned(normalizer.normalize(text)),
            None => Cow::Borrowed(text),
        };

        let lines = split_lines(&normalized);
        let mut elements = Vec::new();
        let mut action: Vec<&str> = Vec::new();
        let mut state = ParseState::ExpectHeadingOrAction;

        for (at, line) in lines.iter().enumerate() {
            if line.is_blank() {
                // A blank between a cue and its first line does not end the block
                if let ParseState::InDialogue { spoken: false, .. } = state {
                    continue;
                }
                flush_action(&mut action, &mut elements);
                state = ParseState::ExpectHeadingOrAction;
                continue;
            }

            if let Some(heading) = self.classifier.parse_scene_heading(line.text) {
                flush_action(&mut action, &mut elements);
                elements.push(ScriptElement::SceneHeading(heading));
                state = ParseState::ExpectHeadingOrAction;
                continue;
            }

            if let Some(text) = self.classifier.transition_text(line.text) {
                flush_action(&mut action, &mut elements);
                elements.push(ScriptElement::Transition { text });
                state = ParseState::ExpectHeadingOrAction;
                continue;
            }

            let dialogue_indent = match &state {
                ParseState::InDialogue { indent, .. } => *indent,
                _ => None,
            };

            if self.is_character_cue(&lines, at, dialogue_indent) {
                flush_action(&mut action, &mut elements);
                state = ParseState::InDialogue {
                    speaker: strip_cue_decorations(line.text),
                    indent: None,
                    spoken: false,
                };
                elements.push(ScriptElement::Character {
                    name: line.text.to_string(),
                });
                continue;
            }

            if let ParseState::InDialogue {
                speaker,
                indent,
                spoken,
            } = &mut state
            {
                if self.classifier.is_parenthetical(line.text) {
                    elements.push(ScriptElement::Parenthetical {
                        speaker: speaker.clone(),
                        text: strip_parentheses(line.text),
                    });
                } else {
                    indent.get_or_insert(line.indent);
                    *spoken = true;
                    elements.push(ScriptElement::Dialogue {
                        speaker: speaker.clone(),
                        text: line.text.to_string(),
                    });
                }
                continue;
            }

            action.push(line.text);
            state = ParseState::InAction;
        }

        flush_action(&mut action, &mut elements);

        let heading_count = elements.iter().filter(|e| e.is_scene_heading()).count();
        if heading_count == 0 {
            warn!(
                "No scene headings found among {} elements",
                elements.len()
            );
            return Err(ParseError::NoStructureDetected);
        }

        debug!(
            "Parsed {} elements across {} scene headings",
            elements.len(),
            heading_count
        );

        Ok(elements)
    }

    fn is_character_cue(
        &self,
        lines: &[ScriptLine<'_>],
        at: usize,
        dialogue_indent: Option<usize>,
    ) -> bool {
        let line = &lines[at];

        if !self.classifier.is_cue_candidate(line.text) {
            return false;
        }

        if dialogue_indent == Some(line.indent) {
            return false;
        }

        let adjacent = lines.get(at + 1).is_some_and(|next| !next.is_blank());
        let Some(next) = lines[at + 1..].iter().find(|l| !l.is_blank()) else {
            return false;
        };

        if self.classifier.parse_scene_heading(next.text).is_some()
            || self.classifier.is_transition(next.text)
        {
            return false;
        }

        // An upper-case line above an indented cue is action, not a cue
        if next.indent > line.indent && self.classifier.is_cue_candidate(next.text) {
            return false;
        }

        self.classifier.opens_dialogue(next.indent, next.text, adjacent)
    }
}

/// Splits text into trimmed lines with indentation relative to the
/// leftmost non-blank line, so uniformly indented PDF text reads as flush.
fn split_lines(text: &str) -> Vec<ScriptLine<'_>> {
    let raw: Vec<(usize, &str)> = text
        .lines()
        .map(|line| (leading_columns(line), line.trim()))
        .collect();

    let baseline = raw
        .iter()
        .filter(|(_, text)| !text.is_empty())
        .map(|(indent, _)| *indent)
        .min()
        .unwrap_or(0);

    raw.into_iter()
        .map(|(indent, text)| ScriptLine {
            indent: indent.saturating_sub(baseline),
            text,
        })
        .collect()
}

fn flush_action(action: &mut Vec<&str>, elements: &mut Vec<ScriptElement>) {
    if action.is_empty() {
        return;
    }

    elements.push(ScriptElement::Action {
        text: action.join("\n"),
    });
    action.clear();
}

fn strip_parentheses(text: &str) -> String {
    text.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string()
}
