// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod cache;
pub mod config;
pub mod error;
pub mod exporter;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod utils;

pub use cache::{CacheStats, DiskStore, ResultCache, StoredEntry};
pub use config::{
    AnalysisConfig, CacheConfig, Config, LimitsConfig, ParserConfig, PipelineConfig, ServiceConfig,
};
pub use error::{ParseError, PipelineError, RejectionReason, Result};
pub use exporter::{BreakdownExporter, ExportManifest, ExportedBreakdown};
pub use extractor::{ElementExtractor, ExtractedScript};
pub use ingest::{FileScanner, IngestionGate, ScannedFile};
pub use models::{
    CharacterEntry, Document, LocationEntry, ProductionBreakdown, SceneSummary, ScriptElement,
};
pub use parser::ScriptParser;
pub use pipeline::{
    AnalysisOutcome, BatchOrchestrator, BatchReport, PipelineStats, ProgressTracker,
    ScreenplayAnalyzer, ScriptPreview,
};
pub use utils::{
    HealthCheck, HealthReport, HealthStatus, OperationTimer, PerformanceMetrics, Validator,
};
