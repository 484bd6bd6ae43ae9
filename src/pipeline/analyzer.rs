// file: src/pipeline/analyzer.rs
// description: request path from raw upload to cached production breakdown
// reference: gate, then cache lookup, then blocking analysis on a miss

use crate::cache::ResultCache;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::exporter::BreakdownExporter;
use crate::ingest::IngestionGate;
use crate::models::{Document, ProductionBreakdown};
use crate::pipeline::processor::{AnalysisStages, ScriptPreview};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub fingerprint: String,
    pub filename: String,
    pub estimated_pages: usize,
    pub breakdown: Arc<ProductionBreakdown>,
    pub output_path: Option<PathBuf>,
    pub elapsed_ms: u64,
}

pub struct ScreenplayAnalyzer {
    gate: IngestionGate,
    stages: Arc<AnalysisStages>,
    cache: ResultCache,
    exporter: Option<BreakdownExporter>,
}

impl ScreenplayAnalyzer {
    pub fn new(config: &Config, cache: ResultCache) -> Result<Self> {
        let exporter = if config.pipeline.export_results {
            Some(BreakdownExporter::new(
                config.service.output_dir.clone(),
                config.pipeline.pretty_json,
            )?)
        } else {
            None
        };

        Ok(Self {
            gate: IngestionGate::from_config(config),
            stages: Arc::new(AnalysisStages::new(config)?),
            cache,
            exporter,
        })
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn exporter(&self) -> Option<&BreakdownExporter> {
        self.exporter.as_ref()
    }

    /// Admits the bytes, then returns the cached breakdown for their
    /// fingerprint or computes it once on the blocking pool.
    pub async fn analyze_bytes(&self, bytes: Vec<u8>, filename: &str) -> Result<AnalysisOutcome> {
        let started = Instant::now();
        let document = self.gate.admit(bytes, filename)?;

        let fingerprint = document.fingerprint().to_string();
        let filename = document.filename().to_string();
        let estimated_pages = document.estimated_pages();

        let stages = Arc::clone(&self.stages);
        let breakdown = self
            .cache
            .get_or_compute(&fingerprint, move || stages.run(&document))
            .await?;

        let output_path = self.export(&fingerprint, &filename, &breakdown).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            "{} analyzed in {} ms ({} scenes)",
            filename, elapsed_ms, breakdown.totals.scene_count
        );

        Ok(AnalysisOutcome {
            fingerprint,
            filename,
            estimated_pages,
            breakdown,
            output_path,
            elapsed_ms,
        })
    }

    pub async fn analyze_file(&self, path: &Path) -> Result<AnalysisOutcome> {
        let (bytes, filename) = self.read_checked(path).await?;
        self.analyze_bytes(bytes, &filename).await
    }

    /// Summaries of the first `scene_limit` scenes. Never cached or exported.
    pub async fn preview_file(&self, path: &Path, scene_limit: usize) -> Result<ScriptPreview> {
        let (bytes, filename) = self.read_checked(path).await?;
        let document = self.gate.admit(bytes, &filename)?;
        self.preview_document(document, scene_limit).await
    }

    pub async fn preview_document(
        &self,
        document: Document,
        scene_limit: usize,
    ) -> Result<ScriptPreview> {
        let stages = Arc::clone(&self.stages);

        tokio::task::spawn_blocking(move || stages.preview(&document, scene_limit))
            .await
            .map_err(|e| PipelineError::Internal(format!("preview task failed: {}", e)))?
    }

    /// Size is checked from metadata before any byte is read.
    async fn read_checked(&self, path: &Path) -> Result<(Vec<u8>, String)> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| PipelineError::file_operation(path, e))?;
        self.gate.check_size(metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::file_operation(path, e))?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok((bytes, filename))
    }

    async fn export(
        &self,
        fingerprint: &str,
        filename: &str,
        breakdown: &ProductionBreakdown,
    ) -> Option<PathBuf> {
        let exporter = self.exporter.as_ref()?;

        match exporter.export(fingerprint, filename, breakdown).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Export failed for {}: {}", filename, e);
                None
            }
        }
    }
}
