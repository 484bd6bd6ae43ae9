// file: src/pipeline/aggregator.rs
// description: folds an extracted script into a production breakdown with page and runtime estimates
// reference: stripboard eighths and page-a-minute scheduling conventions

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::extractor::ExtractedScript;
use crate::extractor::names::normalize_character_name;
use crate::models::{
    BreakdownTotals, CharacterEntry, LocationEntry, ProductionBreakdown, ProductionCue,
    ProductionElementEntry, Scene, SceneSummary, ScriptElement,
};
use crate::parser::patterns::{SENTENCE_END, collapse_whitespace};
use crate::utils::Validator;
use tracing::{debug, error};

const HEADING_LINES: usize = 2;
const CUE_LINES: usize = 2;
const PARENTHETICAL_LINES: usize = 1;
const TRANSITION_LINES: usize = 2;

const DESCRIPTION_SENTENCES: usize = 3;
const DESCRIPTION_MAX_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct BreakdownAggregator {
    lines_per_page: usize,
    seconds_per_page: u64,
    action_line_width: usize,
    dialogue_line_width: usize,
}

impl BreakdownAggregator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            lines_per_page: config.lines_per_page.max(1),
            seconds_per_page: config.seconds_per_page,
            action_line_width: config.action_line_width.max(1),
            dialogue_line_width: config.dialogue_line_width.max(1),
        }
    }

    pub fn aggregate(&self, script: &ExtractedScript) -> Result<ProductionBreakdown> {
        let scenes: Vec<SceneSummary> = script
            .scenes
            .iter()
            .map(|scene| self.summarize_scene(scene, script.production_cues_for(scene.index)))
            .collect();

        let page_eighths: u32 = scenes.iter().map(|s| s.page_eighths).sum();
        let dialogue_line_count = scenes.iter().map(|s| s.dialogue_line_count).sum();

        let totals = BreakdownTotals {
            scene_count: scenes.len(),
            character_count: script.characters.len(),
            location_count: script.locations.len(),
            dialogue_line_count,
            page_eighths,
            estimated_runtime_secs: self.runtime_secs(page_eighths),
        };

        let breakdown = ProductionBreakdown {
            totals,
            scenes,
            characters: script
                .characters
                .iter()
                .map(|c| CharacterEntry {
                    name: c.name.clone(),
                    scenes: c.scenes.clone(),
                    dialogue_line_count: c.dialogue_line_count,
                })
                .collect(),
            locations: script
                .locations
                .iter()
                .map(|l| LocationEntry {
                    name: l.name.clone(),
                    settings: l.settings.clone(),
                    times_of_day: l.times_of_day.clone(),
                    scenes: l.scenes.clone(),
                })
                .collect(),
            production_elements: script
                .production_elements
                .iter()
                .map(|p| ProductionElementEntry {
                    category: p.category.clone(),
                    name: p.name.clone(),
                    scenes: p.scenes.clone(),
                })
                .collect(),
        };

        if let Err(e) = breakdown.verify_references() {
            error!("Breakdown failed cross-reference check: {}", e);
            return Err(e);
        }

        debug!(
            "Aggregated {} scenes, {} pages, {}s runtime",
            breakdown.totals.scene_count,
            breakdown.totals.estimated_pages(),
            breakdown.totals.estimated_runtime_secs
        );

        Ok(breakdown)
    }

    pub fn summarize_scene(&self, scene: &Scene, production_elements: Vec<ProductionCue>) -> SceneSummary {
        let mut characters: Vec<String> = Vec::new();
        let mut dialogue_line_count = 0;
        let mut action_count = 0;

        for element in &scene.elements {
            let speaker = match element {
                ScriptElement::Character { name } => Some(name),
                ScriptElement::Dialogue { speaker, .. } => {
                    dialogue_line_count += 1;
                    Some(speaker)
                }
                ScriptElement::Parenthetical { speaker, .. } => Some(speaker),
                ScriptElement::Action { .. } => {
                    action_count += 1;
                    None
                }
                ScriptElement::SceneHeading(_) | ScriptElement::Transition { .. } => None,
            };

            if let Some(name) = speaker.and_then(|raw| normalize_character_name(raw))
                && !characters.contains(&name)
            {
                characters.push(name);
            }
        }

        let formatted_lines = self.formatted_lines(scene);

        SceneSummary {
            index: scene.index,
            heading: scene.heading.raw.clone(),
            setting: scene.heading.setting,
            location: scene.heading.location.clone(),
            time_of_day: scene.heading.time_of_day.clone(),
            description: describe(scene),
            character_count: characters.len(),
            characters,
            dialogue_line_count,
            action_count,
            formatted_lines,
            page_eighths: self.page_eighths(formatted_lines),
            production_elements,
        }
    }

    /// Estimated lines the scene occupies once typeset in standard format.
    pub fn formatted_lines(&self, scene: &Scene) -> usize {
        let body: usize = scene
            .elements
            .iter()
            .map(|element| match element {
                ScriptElement::SceneHeading(_) => HEADING_LINES,
                ScriptElement::Action { text } => {
                    wrapped_lines(text, self.action_line_width) + 1
                }
                ScriptElement::Character { .. } => CUE_LINES,
                ScriptElement::Dialogue { text, .. } => {
                    wrapped_lines(text, self.dialogue_line_width)
                }
                ScriptElement::Parenthetical { .. } => PARENTHETICAL_LINES,
                ScriptElement::Transition { .. } => TRANSITION_LINES,
            })
            .sum();

        HEADING_LINES + body
    }

    pub fn page_eighths(&self, formatted_lines: usize) -> u32 {
        let eighths = (formatted_lines * 8).div_ceil(self.lines_per_page);
        u32::try_from(eighths).unwrap_or(u32::MAX).max(1)
    }

    pub fn runtime_secs(&self, page_eighths: u32) -> u64 {
        u64::from(page_eighths) * self.seconds_per_page / 8
    }
}

/// First sentences of the scene's action, at most `DESCRIPTION_MAX_CHARS`
/// characters including the trailing "..." of a cut.
pub fn describe(scene: &Scene) -> String {
    let action = scene.action_texts().collect::<Vec<_>>().join(" ");

    let mut sentences = Vec::new();
    let mut length = 0;
    for sentence in SENTENCE_END
        .split(&action)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
        .take(DESCRIPTION_SENTENCES)
    {
        if length >= DESCRIPTION_MAX_CHARS {
            break;
        }
        length += sentence.chars().count();
        sentences.push(sentence);
    }

    let description = sentences.join(". ");
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        Validator::truncate_text(&description, DESCRIPTION_MAX_CHARS - 3)
    } else {
        description
    }
}

fn wrapped_lines(text: &str, width: usize) -> usize {
    text.lines()
        .map(|line| line.chars().count().div_ceil(width).max(1))
        .sum::<usize>()
        .max(1)
}
