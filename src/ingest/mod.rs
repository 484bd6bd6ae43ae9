// file: src/ingest/mod.rs
// description: ingestion module exports
// reference: internal module structure

pub mod gate;
pub mod scanner;
pub mod text;

pub use gate::IngestionGate;
pub use scanner::{FileScanner, ScannedFile};
pub use text::TextDecoder;
