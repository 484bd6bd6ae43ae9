// file: src/models/breakdown.rs
// description: production breakdown aggregate and its cross-reference check
// reference: preproduction breakdown sheets

use crate::error::{PipelineError, Result};
use crate::models::element::Setting;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionBreakdown {
    pub totals: BreakdownTotals,
    pub scenes: Vec<SceneSummary>,
    pub characters: Vec<CharacterEntry>,
    pub locations: Vec<LocationEntry>,
    pub production_elements: Vec<ProductionElementEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownTotals {
    pub scene_count: usize,
    pub character_count: usize,
    pub location_count: usize,
    pub dialogue_line_count: usize,
    /// Script length in eighths of a page, the unit used on stripboards.
    pub page_eighths: u32,
    pub estimated_runtime_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub index: usize,
    pub heading: String,
    pub setting: Setting,
    pub location: String,
    pub time_of_day: Option<String>,
    /// Opening sentences of the scene's action, cut to a breakdown-sheet line.
    #[serde(default)]
    pub description: String,
    pub characters: Vec<String>,
    pub character_count: usize,
    pub dialogue_line_count: usize,
    pub action_count: usize,
    pub formatted_lines: usize,
    pub page_eighths: u32,
    pub production_elements: Vec<ProductionCue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterEntry {
    pub name: String,
    pub scenes: Vec<usize>,
    pub dialogue_line_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub name: String,
    pub settings: Vec<Setting>,
    pub times_of_day: Vec<String>,
    pub scenes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCue {
    pub category: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionElementEntry {
    pub category: String,
    pub name: String,
    pub scenes: Vec<usize>,
}

impl BreakdownTotals {
    pub fn estimated_pages(&self) -> f64 {
        self.page_eighths as f64 / 8.0
    }
}

impl SceneSummary {
    /// Stripboard notation, e.g. `1 3/8` or `5/8`.
    pub fn page_length_label(&self) -> String {
        format_eighths(self.page_eighths)
    }
}

impl ProductionBreakdown {
    /// Every character, location and production element must reference at
    /// least one scene, and every reference must point at an existing scene.
    pub fn verify_references(&self) -> Result<()> {
        let scene_count = self.scenes.len();

        if self.totals.scene_count != scene_count {
            return Err(PipelineError::InvariantViolation(format!(
                "scene_count {} does not match {} scene summaries",
                self.totals.scene_count, scene_count
            )));
        }

        for (position, scene) in self.scenes.iter().enumerate() {
            if scene.index != position + 1 {
                return Err(PipelineError::InvariantViolation(format!(
                    "scene summary at position {} has index {}",
                    position + 1,
                    scene.index
                )));
            }
        }

        let references = self
            .characters
            .iter()
            .map(|c| ("character", c.name.as_str(), c.scenes.as_slice()))
            .chain(
                self.locations
                    .iter()
                    .map(|l| ("location", l.name.as_str(), l.scenes.as_slice())),
            )
            .chain(
                self.production_elements
                    .iter()
                    .map(|p| ("production element", p.name.as_str(), p.scenes.as_slice())),
            );

        for (kind, name, scenes) in references {
            if scenes.is_empty() {
                return Err(PipelineError::InvariantViolation(format!(
                    "{} '{}' has no scene references",
                    kind, name
                )));
            }

            if let Some(bad) = scenes.iter().find(|&&idx| idx == 0 || idx > scene_count) {
                return Err(PipelineError::InvariantViolation(format!(
                    "{} '{}' references scene {} but only {} scenes exist",
                    kind, name, bad, scene_count
                )));
            }
        }

        Ok(())
    }

    pub fn character(&self, name: &str) -> Option<&CharacterEntry> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn location(&self, name: &str) -> Option<&LocationEntry> {
        self.locations.iter().find(|l| l.name == name)
    }
}

pub fn format_eighths(eighths: u32) -> String {
    let whole = eighths / 8;
    let rest = eighths % 8;

    match (whole, rest) {
        (0, 0) => "0".to_string(),
        (0, r) => format!("{}/8", r),
        (w, 0) => w.to_string(),
        (w, r) => format!("{} {}/8", w, r),
    }
}
