// file: src/exporter/json.rs
// description: json export of production breakdowns keyed by document fingerprint

use crate::error::{PipelineError, Result};
use crate::models::ProductionBreakdown;
use crate::utils::validation::Validator;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Keeps temp names unique when identical uploads export concurrently.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct BreakdownExporter {
    output_dir: PathBuf,
    pretty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedBreakdown {
    pub fingerprint: String,
    pub source_filename: String,
    pub exported_at: String,
    pub breakdown: ProductionBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    pub source: String,
    pub fingerprint: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub exported_at: String,
    pub total_breakdowns: usize,
    pub failed: Vec<String>,
    pub files: Vec<ManifestItem>,
}

impl ExportManifest {
    pub fn new() -> Self {
        Self {
            exported_at: Utc::now().to_rfc3339(),
            total_breakdowns: 0,
            failed: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn record(&mut self, source: String, fingerprint: String, file: &Path) {
        self.files.push(ManifestItem {
            source,
            fingerprint,
            file: file.display().to_string(),
        });
        self.total_breakdowns = self.files.len();
    }

    pub fn record_failure(&mut self, source: String) {
        self.failed.push(source);
    }
}

impl Default for ExportManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakdownExporter {
    pub fn new(output_dir: impl Into<PathBuf>, pretty: bool) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| PipelineError::file_operation(&output_dir, e))?;
        Ok(Self { output_dir, pretty })
    }

    pub fn path_for(&self, fingerprint: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", fingerprint))
    }

    pub async fn export(
        &self,
        fingerprint: &str,
        source_filename: &str,
        breakdown: &ProductionBreakdown,
    ) -> Result<PathBuf> {
        Validator::validate_fingerprint(fingerprint)?;

        let exported = ExportedBreakdown {
            fingerprint: fingerprint.to_string(),
            source_filename: source_filename.to_string(),
            exported_at: Utc::now().to_rfc3339(),
            breakdown: breakdown.clone(),
        };

        let path = self.path_for(fingerprint);
        self.write_json(&path, &exported).await?;

        debug!("Exported breakdown for {} to {}", source_filename, path.display());
        Ok(path)
    }

    pub async fn load(&self, fingerprint: &str) -> Result<ExportedBreakdown> {
        Validator::validate_fingerprint(fingerprint)?;

        let path = self.path_for(fingerprint);
        let contents = fs::read_to_string(&path)
            .await
            .map_err(|e| PipelineError::file_operation(&path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub async fn write_manifest(&self, manifest: &ExportManifest) -> Result<PathBuf> {
        let path = self.output_dir.join(MANIFEST_FILE);
        self.write_json(&path, manifest).await?;

        info!(
            "Export manifest written: {} breakdowns, {} failures",
            manifest.total_breakdowns,
            manifest.failed.len()
        );
        Ok(path)
    }

    /// Written to a temp file in the same directory, then renamed into place,
    /// so readers see either the previous file or the complete new one.
    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let contents = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };

        let temp_path = self.temp_path_for(path);
        fs::write(&temp_path, contents)
            .await
            .map_err(|e| PipelineError::file_operation(&temp_path, e))?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(PipelineError::file_operation(path, e));
        }

        Ok(())
    }

    fn temp_path_for(&self, path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let sequence = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.output_dir
            .join(format!(".{}.{}.{}.tmp", name, std::process::id(), sequence))
    }
}
