// file: src/extractor/scenes.rs
// description: groups parsed elements into scenes and records characters, locations and production elements
// reference: preproduction breakdown sheets

use crate::config::AnalysisConfig;
use crate::error::{ParseError, Result};
use crate::extractor::names::{normalize_character_name, normalize_location, normalize_time_of_day};
use crate::extractor::production::ProductionCueExtractor;
use crate::models::{ProductionCue, Scene, ScriptElement, Setting};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRecord {
    pub name: String,
    pub scenes: Vec<usize>,
    pub dialogue_line_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRecord {
    pub name: String,
    pub settings: Vec<Setting>,
    pub times_of_day: Vec<String>,
    pub scenes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionRecord {
    pub category: String,
    pub name: String,
    pub scenes: Vec<usize>,
}

/// Scenes plus cross-scene records, every list in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedScript {
    pub scenes: Vec<Scene>,
    pub characters: Vec<CharacterRecord>,
    pub locations: Vec<LocationRecord>,
    pub production_elements: Vec<ProductionRecord>,
    /// Elements seen before the first scene heading; not part of any scene.
    pub preamble_elements: usize,
}

impl ExtractedScript {
    pub fn production_cues_for(&self, scene_index: usize) -> Vec<ProductionCue> {
        self.production_elements
            .iter()
            .filter(|record| record.scenes.contains(&scene_index))
            .map(|record| ProductionCue {
                category: record.category.clone(),
                name: record.name.clone(),
            })
            .collect()
    }
}

pub struct ElementExtractor {
    cues: ProductionCueExtractor,
}

/// Keeps records in insertion order while giving keyed lookups.
struct OrderedRecords<T> {
    index: HashMap<String, usize>,
    records: Vec<T>,
}

impl<T> OrderedRecords<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            records: Vec::new(),
        }
    }

    fn entry(&mut self, key: String, create: impl FnOnce(&str) -> T) -> &mut T {
        let position = match self.index.get(&key) {
            Some(position) => *position,
            None => {
                self.records.push(create(&key));
                let position = self.records.len() - 1;
                self.index.insert(key, position);
                position
            }
        };
        &mut self.records[position]
    }

    fn into_vec(self) -> Vec<T> {
        self.records
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

impl ElementExtractor {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let cues = ProductionCueExtractor::new(&config.production_categories)?;
        debug!("{} production categories loaded", cues.category_count());
        Ok(Self { cues })
    }

    pub fn extract(&self, elements: Vec<ScriptElement>) -> Result<ExtractedScript> {
        let mut scenes: Vec<Scene> = Vec::new();
        let mut preamble_elements = 0;

        for element in elements {
            match element {
                ScriptElement::SceneHeading(heading) => {
                    scenes.push(Scene::new(scenes.len() + 1, heading));
                }
                other => match scenes.last_mut() {
                    Some(scene) => scene.elements.push(other),
                    None => preamble_elements += 1,
                },
            }
        }

        if scenes.is_empty() {
            return Err(ParseError::NoStructureDetected.into());
        }

        if preamble_elements > 0 {
            debug!(
                "Discarded {} elements before the first scene heading",
                preamble_elements
            );
        }

        let mut characters = OrderedRecords::new();
        let mut locations = OrderedRecords::new();
        let mut production = OrderedRecords::new();

        for scene in &scenes {
            self.record_location(scene, &mut locations);
            self.record_characters(scene, &mut characters);
            self.record_production(scene, &mut production);
        }

        let extracted = ExtractedScript {
            scenes,
            characters: characters.into_vec(),
            locations: locations.into_vec(),
            production_elements: production.into_vec(),
            preamble_elements,
        };

        debug!(
            "Extracted {} scenes, {} characters, {} locations, {} production elements",
            extracted.scenes.len(),
            extracted.characters.len(),
            extracted.locations.len(),
            extracted.production_elements.len()
        );

        Ok(extracted)
    }

    /// Bare numbered headers carry no location and add no record.
    fn record_location(&self, scene: &Scene, locations: &mut OrderedRecords<LocationRecord>) {
        let name = normalize_location(&scene.heading.location);
        if name.is_empty() {
            return;
        }

        let record = locations.entry(name, |name| LocationRecord {
            name: name.to_string(),
            settings: Vec::new(),
            times_of_day: Vec::new(),
            scenes: Vec::new(),
        });

        push_unique(&mut record.settings, scene.heading.setting);
        if let Some(time) = scene
            .heading
            .time_of_day
            .as_deref()
            .and_then(normalize_time_of_day)
        {
            push_unique(&mut record.times_of_day, time);
        }
        push_unique(&mut record.scenes, scene.index);
    }

    fn record_characters(&self, scene: &Scene, characters: &mut OrderedRecords<CharacterRecord>) {
        for element in &scene.elements {
            let (raw, spoken) = match element {
                ScriptElement::Character { name } => (name, false),
                ScriptElement::Dialogue { speaker, .. } => (speaker, true),
                ScriptElement::Parenthetical { speaker, .. } => (speaker, false),
                _ => continue,
            };

            let Some(name) = normalize_character_name(raw) else {
                continue;
            };

            let record = characters.entry(name, |name| CharacterRecord {
                name: name.to_string(),
                scenes: Vec::new(),
                dialogue_line_count: 0,
            });

            push_unique(&mut record.scenes, scene.index);
            if spoken {
                record.dialogue_line_count += 1;
            }
        }
    }

    fn record_production(&self, scene: &Scene, production: &mut OrderedRecords<ProductionRecord>) {
        for text in scene.action_texts() {
            for cue in self.cues.find(text) {
                let key = format!("{}\u{0}{}", cue.category, cue.name);
                let record = production.entry(key, |_| ProductionRecord {
                    category: cue.category.clone(),
                    name: cue.name.clone(),
                    scenes: Vec::new(),
                });
                push_unique(&mut record.scenes, scene.index);
            }
        }
    }
}
