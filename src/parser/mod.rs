// file: src/parser/mod.rs
// description: screenplay parsing module exports
// reference: internal module structure

pub mod classifier;
pub mod normalizer;
pub mod patterns;
pub mod screenplay;

pub use classifier::LineClassifier;
pub use normalizer::ScriptNormalizer;
pub use screenplay::ScriptParser;
