// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

pub mod aggregator;
pub mod analyzer;
mod orchestrator;
pub mod processor;
mod progress;

pub use aggregator::BreakdownAggregator;
pub use analyzer::{AnalysisOutcome, ScreenplayAnalyzer};
pub use orchestrator::{BatchFailure, BatchOrchestrator, BatchReport};
pub use processor::{AnalysisStages, ScriptPreview};
pub use progress::{PipelineStats, ProgressTracker};
