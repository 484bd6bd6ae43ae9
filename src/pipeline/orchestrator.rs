// file: src/pipeline/orchestrator.rs
// description: coordinates directory scanning, concurrent analysis and export manifests
// reference: orchestrates asynchronous batch analysis workflow

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::exporter::ExportManifest;
use crate::ingest::{FileScanner, ScannedFile};
use crate::pipeline::analyzer::{AnalysisOutcome, ScreenplayAnalyzer};
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::utils::OperationTimer;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BatchOrchestrator {
    config: Config,
    analyzer: Arc<ScreenplayAnalyzer>,
    max_concurrent_tasks: usize,
    colored: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub file: String,
    pub error: String,
    pub user_correctable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub stats: PipelineStats,
    pub outcomes: Vec<AnalysisOutcome>,
    pub failures: Vec<BatchFailure>,
    pub manifest_path: Option<PathBuf>,
}

impl BatchOrchestrator {
    pub fn new(config: Config, analyzer: Arc<ScreenplayAnalyzer>, colored: bool) -> Self {
        let max_concurrent_tasks = config.pipeline.parallel_workers.max(1);

        Self {
            config,
            analyzer,
            max_concurrent_tasks,
            colored,
        }
    }

    pub async fn run(&self, root: &Path, limit: Option<usize>) -> Result<BatchReport> {
        info!("Starting batch analysis of {}", root.display());
        let timer = OperationTimer::new("Batch analysis");

        let mut files = self.scan_files(root).await?;
        if let Some(limit) = limit {
            files.truncate(limit);
        }

        if files.is_empty() {
            warn!("No screenplay files found to analyze");
            return Ok(BatchReport {
                stats: PipelineStats::new(),
                outcomes: Vec::new(),
                failures: Vec::new(),
                manifest_path: None,
            });
        }

        let progress = Arc::new(ProgressTracker::with_color(files.len(), self.colored));

        info!(
            "Analyzing {} files with {} concurrent tasks...",
            files.len(),
            self.max_concurrent_tasks
        );
        let results = self.process_files(files, Arc::clone(&progress)).await;

        let mut outcomes = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(failure) => failures.push(failure),
            }
        }
        outcomes.sort_by(|a, b| a.filename.cmp(&b.filename));
        failures.sort_by(|a, b| a.file.cmp(&b.file));

        let manifest_path = self.write_manifest(&outcomes, &failures).await;

        let stats = progress.get_stats();
        progress.finish();
        self.log_final_stats(&stats);
        timer.finish_with_count(stats.files_processed + stats.files_failed);

        Ok(BatchReport {
            stats,
            outcomes,
            failures,
            manifest_path,
        })
    }

    async fn scan_files(&self, root: &Path) -> Result<Vec<ScannedFile>> {
        let root = root.to_path_buf();
        let pipeline_config = self.config.pipeline.clone();
        let extensions = self.config.limits.allowed_extensions.clone();
        let timer = OperationTimer::new("Directory scan");

        let files = tokio::task::spawn_blocking(move || {
            let scanner = FileScanner::new(pipeline_config, extensions);
            scanner.scan_directory(&root)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("File scanning task failed: {}", e)))??;

        timer.finish();
        Ok(files)
    }

    async fn process_files(
        &self,
        files: Vec<ScannedFile>,
        progress: Arc<ProgressTracker>,
    ) -> Vec<std::result::Result<AnalysisOutcome, BatchFailure>> {
        let tasks = files.into_iter().map(|file| {
            let analyzer = Arc::clone(&self.analyzer);
            let progress = Arc::clone(&progress);

            async move {
                progress.set_message(format!("Analyzing {}", file.relative_path));

                match analyzer.analyze_file(&file.path).await {
                    Ok(outcome) => {
                        progress.inc_files_processed();
                        progress.add_bytes_processed(file.size);
                        progress.add_scenes(outcome.breakdown.totals.scene_count);
                        Ok(outcome)
                    }
                    Err(e) => {
                        let user_correctable = e.is_user_correctable();
                        progress.inc_files_failed(user_correctable);
                        warn!("Failed to analyze {}: {}", file.relative_path, e);
                        Err(BatchFailure {
                            file: file.relative_path,
                            error: e.to_string(),
                            user_correctable,
                        })
                    }
                }
            }
        });

        stream::iter(tasks)
            .buffer_unordered(self.max_concurrent_tasks)
            .collect()
            .await
    }

    async fn write_manifest(
        &self,
        outcomes: &[AnalysisOutcome],
        failures: &[BatchFailure],
    ) -> Option<PathBuf> {
        let exporter = self.analyzer.exporter()?;

        let mut manifest = ExportManifest::new();
        for outcome in outcomes {
            if let Some(path) = &outcome.output_path {
                manifest.record(outcome.filename.clone(), outcome.fingerprint.clone(), path);
            }
        }
        for failure in failures {
            manifest.record_failure(failure.file.clone());
        }

        match exporter.write_manifest(&manifest).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to write export manifest: {}", e);
                None
            }
        }
    }

    fn log_final_stats(&self, stats: &PipelineStats) {
        let cache = self.analyzer.cache().stats();

        info!("=== Batch Analysis Summary ===");
        info!("Duration: {} seconds", stats.duration_secs);
        info!("Files analyzed: {}", stats.files_processed);
        info!(
            "Files failed: {} ({} rejected or unparseable)",
            stats.files_failed, stats.files_rejected
        );
        info!("Success rate: {:.2}%", stats.success_rate());
        info!("Scenes extracted: {}", stats.scenes_extracted);
        info!(
            "Cache: {} computed, {} hits, {} coalesced",
            cache.computations, cache.hits, cache.coalesced
        );
        info!("Processing speed: {:.2} files/sec", stats.files_per_second());
        info!(
            "Throughput: {:.2} MB/sec",
            stats.bytes_per_second() / 1_048_576.0
        );
        info!("==============================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use std::fs;
    use tempfile::TempDir;

    const SCRIPT: &str = "INT. KITCHEN - MORNING\n\nA kettle whistles.\n\n          MAYA\n     Tea?\n";

    fn orchestrator(config: &Config) -> BatchOrchestrator {
        let analyzer =
            ScreenplayAnalyzer::new(config, ResultCache::in_memory(32, 0)).unwrap();
        BatchOrchestrator::new(config.clone(), Arc::new(analyzer), false)
    }

    fn config(output: &TempDir) -> Config {
        let mut config = Config::default_config();
        config.service.output_dir = output.path().to_path_buf();
        config.pipeline.parallel_workers = 2;
        config
    }

    #[tokio::test]
    async fn test_batch_counts_successes_and_failures() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(input.path().join("a.txt"), SCRIPT).unwrap();
        fs::write(input.path().join("b.fountain"), SCRIPT).unwrap();
        fs::write(input.path().join("c.txt"), "Just a shopping list.\nMilk.\n").unwrap();
        fs::write(input.path().join("ignored.md"), SCRIPT).unwrap();

        let report = orchestrator(&config(&output))
            .run(input.path(), None)
            .await
            .unwrap();

        assert_eq!(report.stats.files_processed, 2);
        assert_eq!(report.stats.files_failed, 1);
        assert_eq!(report.stats.files_rejected, 1);
        assert_eq!(report.stats.scenes_extracted, 2);
        assert_eq!(report.failures[0].file, "c.txt");
        assert!(report.failures[0].user_correctable);

        // identical content, one computation
        assert_eq!(report.outcomes[0].fingerprint, report.outcomes[1].fingerprint);

        let manifest: ExportManifest =
            serde_json::from_str(&fs::read_to_string(report.manifest_path.unwrap()).unwrap())
                .unwrap();
        assert_eq!(manifest.total_breakdowns, 2);
        assert_eq!(manifest.failed, vec!["c.txt"]);
    }

    #[tokio::test]
    async fn test_batch_respects_limit() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        for name in ["one.txt", "two.txt", "three.txt"] {
            fs::write(input.path().join(name), SCRIPT).unwrap();
        }

        let report = orchestrator(&config(&output))
            .run(input.path(), Some(2))
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let report = orchestrator(&config(&output))
            .run(input.path(), None)
            .await
            .unwrap();

        assert_eq!(report.stats.files_processed, 0);
        assert!(report.manifest_path.is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let output = TempDir::new().unwrap();
        let result = orchestrator(&config(&output))
            .run(Path::new("/definitely/not/here"), None)
            .await;

        assert!(matches!(result, Err(PipelineError::Validation(_))));
    }
}
