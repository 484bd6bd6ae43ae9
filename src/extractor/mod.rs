// file: src/extractor/mod.rs
// description: element extraction module exports
// reference: internal module structure

pub mod names;
pub mod production;
pub mod scenes;

pub use production::ProductionCueExtractor;
pub use scenes::{CharacterRecord, ElementExtractor, ExtractedScript, LocationRecord, ProductionRecord};
