// file: src/utils/validation.rs
// description: input validation for paths, fingerprints and command arguments
// reference: input validation patterns

use crate::error::{PipelineError, Result};
use std::fs;
use std::path::Path;

const FINGERPRINT_LEN: usize = 64;

pub struct Validator;

impl Validator {
    pub fn validate_file_path(path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(|e| {
            PipelineError::Validation(format!(
                "Cannot canonicalize path {}: {}",
                path.display(),
                e
            ))
        })?;

        if !canonical.is_file() {
            return Err(PipelineError::Validation(format!(
                "Path is not a file: {}",
                canonical.display()
            )));
        }

        Ok(())
    }

    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(PipelineError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(PipelineError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// Fingerprints name files on disk, so anything other than 64 lowercase
    /// hex characters is refused.
    pub fn validate_fingerprint(fingerprint: &str) -> Result<()> {
        if fingerprint.len() != FINGERPRINT_LEN {
            return Err(PipelineError::Validation(format!(
                "Fingerprint must be {} characters, got {}",
                FINGERPRINT_LEN,
                fingerprint.len()
            )));
        }

        if !fingerprint
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(PipelineError::Validation(format!(
                "Fingerprint is not lowercase hex: {}",
                fingerprint
            )));
        }

        Ok(())
    }

    pub fn validate_scene_limit(scenes: usize) -> Result<()> {
        if scenes == 0 {
            return Err(PipelineError::Validation(
                "Scene count must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn truncate_text(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let head: String = text.chars().take(max_chars).collect();
            format!("{}...", head)
        }
    }
}
