// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod breakdown;
pub mod cache_entry;
pub mod document;
pub mod element;
pub mod scene;

pub use breakdown::{
    BreakdownTotals, CharacterEntry, LocationEntry, ProductionBreakdown, ProductionCue,
    ProductionElementEntry, SceneSummary,
};
pub use cache_entry::CacheEntry;
pub use document::{Document, DocumentFormat};
pub use element::{SceneHeading, ScriptElement, Setting};
pub use scene::Scene;
