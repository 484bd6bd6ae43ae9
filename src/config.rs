// file: src/config.rs
// description: application configuration management with toml and environment support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "SCRIPT_BREAKDOWN";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Deployment-style variables honored without the nested prefix.
const BARE_ENV_OVERRIDES: [(&str, &str); 3] = [
    ("MAX_FILE_SIZE_MB", "limits.max_file_size_mb"),
    ("MAX_PAGES", "limits.max_pages"),
    ("PORT", "service.port"),
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub limits: LimitsConfig,
    pub parser: ParserConfig,
    pub analysis: AnalysisConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
}

/// Owned by the transport layer; the core only reads the directories.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    pub max_file_size_mb: u64,
    pub max_pages: usize,
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParserConfig {
    pub normalize_text: bool,
    /// Minimum leading columns for a line to count as indented dialogue.
    pub dialogue_indent: usize,
    pub max_cue_words: usize,
    pub max_cue_length: usize,
    /// Accept Fountain-style cues whose dialogue sits flush left on the very next line.
    pub allow_flush_dialogue: bool,
    pub headings_must_be_uppercase: bool,
    pub scene_heading_prefixes: Vec<String>,
    /// Markers of bare numbered scene headers such as `СЦЕНА 12` or `№ 3`.
    pub scene_number_markers: Vec<String>,
    pub transition_keywords: Vec<String>,
    pub cue_stop_words: Vec<String>,
    /// Encodings tried for text that is not UTF-8, by `encoding_rs` label.
    /// Empty rejects anything but UTF-8 and BOM-marked UTF-16.
    pub legacy_encodings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    pub lines_per_page: usize,
    pub seconds_per_page: u64,
    pub action_line_width: usize,
    pub dialogue_line_width: usize,
    #[serde(default)]
    pub production_categories: Vec<CategoryRule>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub max_entries: usize,
    /// Zero disables age-based expiry.
    pub max_age_secs: u64,
    /// Without persistence the cache lives in memory only and is lost on restart.
    pub persist: bool,
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub parallel_workers: usize,
    pub skip_patterns: Vec<String>,
    pub export_results: bool,
    pub pretty_json: bool,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in bare_env_overrides(|name| std::env::var(name).ok()) {
            builder = builder
                .set_override(key, value)
                .map_err(|e| PipelineError::Config(e.to_string()))?;
        }

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            service: ServiceConfig {
                port: 8000,
                upload_dir: PathBuf::from("./uploads"),
                output_dir: PathBuf::from("./outputs"),
            },
            limits: LimitsConfig {
                max_file_size_mb: 50,
                max_pages: 120,
                allowed_extensions: strings(&["txt", "text", "fountain", "spmd", "pdf", "docx"]),
            },
            parser: ParserConfig {
                normalize_text: true,
                dialogue_indent: 2,
                max_cue_words: 4,
                max_cue_length: 38,
                allow_flush_dialogue: false,
                headings_must_be_uppercase: true,
                scene_heading_prefixes: strings(&[
                    "INT./EXT.",
                    "EXT./INT.",
                    "INT/EXT",
                    "I/E",
                    "INT.",
                    "EXT.",
                    "INT",
                    "EXT",
                    "EST.",
                    "INTERIOR",
                    "EXTERIOR",
                    "ИНТ./НАТ.",
                    "ИНТ.",
                    "НАТ.",
                    "ЭКС.",
                    "ИНТЕРЬЕР",
                    "ЭКСТЕРЬЕР",
                ]),
                scene_number_markers: strings(&["СЦЕНА", "СЦ.", "SCENE", "№", "#"]),
                transition_keywords: strings(&[
                    "FADE IN:",
                    "FADE IN.",
                    "FADE OUT.",
                    "FADE OUT",
                    "FADE TO BLACK.",
                    "CUT TO BLACK.",
                    "INTERCUT",
                    "ЗТМ",
                    "ЗТМ.",
                    "ИЗ ЗТМ",
                    "ИЗ ЗТМ.",
                    "СМЕНА КАДРА",
                ]),
                cue_stop_words: strings(&[
                    "THE END",
                    "END",
                    "CONTINUED",
                    "MORE",
                    "TITLE",
                    "SUPER",
                    "INSERT",
                    "MONTAGE",
                    "BACK TO SCENE",
                    "FLASHBACK",
                    "END FLASHBACK",
                    "КОНЕЦ",
                    "ТИТРЫ",
                    "КАДР",
                    "СЦЕНА",
                    "ФОН",
                ]),
                legacy_encodings: strings(&["windows-1251", "koi8-r", "windows-1252"]),
            },
            analysis: AnalysisConfig {
                lines_per_page: 55,
                seconds_per_page: 60,
                action_line_width: 60,
                dialogue_line_width: 35,
                production_categories: default_production_categories(),
            },
            cache: CacheConfig {
                max_entries: 256,
                max_age_secs: 0,
                persist: false,
                directory: PathBuf::from("./cache"),
            },
            pipeline: PipelineConfig {
                parallel_workers: 4,
                skip_patterns: strings(&[".git/*", "*.tmp", "*.json"]),
                export_results: true,
                pretty_json: true,
            },
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.limits.max_file_size_mb.saturating_mul(BYTES_PER_MB)
    }

    fn validate(&self) -> Result<()> {
        if self.limits.max_file_size_mb == 0 {
            return Err(PipelineError::Config(
                "max_file_size_mb must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_file_size_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(PipelineError::Config(format!(
                "max_file_size_mb {} is too large",
                self.limits.max_file_size_mb
            )));
        }

        if self.limits.max_pages == 0 {
            return Err(PipelineError::Config(
                "max_pages must be greater than 0".to_string(),
            ));
        }

        if self.analysis.lines_per_page == 0
            || self.analysis.action_line_width == 0
            || self.analysis.dialogue_line_width == 0
        {
            return Err(PipelineError::Config(
                "lines_per_page and line widths must be greater than 0".to_string(),
            ));
        }

        if self.parser.scene_heading_prefixes.is_empty() {
            return Err(PipelineError::Config(
                "at least one scene heading prefix is required".to_string(),
            ));
        }

        if self.pipeline.parallel_workers == 0 {
            return Err(PipelineError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.cache.max_entries == 0 {
            return Err(PipelineError::Config(
                "cache.max_entries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn bare_env_overrides<F>(lookup: F) -> Vec<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    BARE_ENV_OVERRIDES
        .iter()
        .filter_map(|(name, key)| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (*key, value))
        })
        .collect()
}

fn default_production_categories() -> Vec<CategoryRule> {
    let rule = |category: &str, keywords: &[&str]| CategoryRule {
        category: category.to_string(),
        keywords: strings(keywords),
    };

    vec![
        rule(
            "props",
            &[
                "phone", "laptop", "computer", "book", "newspaper", "letter", "briefcase",
                "suitcase", "bag", "keys", "wallet", "watch", "glasses", "photograph", "painting",
                "bottle", "cup", "plate", "flowers", "lamp", "candle", "flashlight", "телефон",
                "книга", "письмо", "сумка", "чемодан", "ключи", "фотография",
            ],
        ),
        rule(
            "vehicles",
            &[
                "car", "truck", "bus", "taxi", "motorcycle", "bicycle", "train", "plane",
                "helicopter", "boat", "ambulance", "машина", "автобус", "такси", "поезд",
            ],
        ),
        rule(
            "animals",
            &["dog", "cat", "horse", "bird", "rat", "snake", "собака", "кошка", "лошадь"],
        ),
        rule(
            "weapons",
            &[
                "gun", "pistol", "rifle", "shotgun", "revolver", "knife", "sword", "пистолет",
                "нож", "ружьё",
            ],
        ),
        rule(
            "sfx",
            &[
                "explosion", "fire", "smoke", "rain", "snow", "fog", "lightning", "blood",
                "взрыв", "огонь", "дым", "дождь",
            ],
        ),
        rule(
            "stunts",
            &["fight", "falls", "jumps", "crash", "chase", "punch", "драка", "погоня"],
        ),
        rule(
            "wardrobe_makeup",
            &[
                "uniform", "costume", "dress", "mask", "wig", "scar", "tattoo", "makeup",
                "костюм", "маска", "грим",
            ],
        ),
        rule(
            "music",
            &[
                "music", "song", "guitar", "piano", "violin", "drums", "radio", "музыка",
                "песня", "гитара",
            ],
        ),
        rule(
            "food",
            &[
                "coffee", "tea", "wine", "beer", "bread", "soup", "breakfast", "lunch", "dinner",
                "cake", "кофе", "чай", "вино",
            ],
        ),
        rule(
            "extras",
            &[
                "crowd", "passersby", "customers", "guests", "audience", "soldiers", "students",
                "толпа", "массовка", "прохожие",
            ],
        ),
    ]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_file_size_mb, 50);
        assert_eq!(config.limits.max_pages, 120);
        assert_eq!(config.max_file_size_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let mut config = Config::default_config();
        config.limits.max_pages = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.cache.max_entries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_overflowing_size_limit() {
        let mut config = Config::default_config();
        config.limits.max_file_size_mb = u64::MAX / 1024;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert_eq!(config.max_file_size_bytes(), u64::MAX);

        config.limits.max_file_size_mb = u64::MAX / (1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bare_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([("MAX_PAGES", " 200 "), ("PORT", ""), ("MAX_FILE_SIZE_MB", "5")]);

        let overrides = bare_env_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(
            overrides,
            vec![
                ("limits.max_file_size_mb", "5".to_string()),
                ("limits.max_pages", "200".to_string()),
            ]
        );
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[limits]\nmax_pages = 10\n\n[cache]\nmax_entries = 8\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.limits.max_pages, 10);
        assert_eq!(config.cache.max_entries, 8);
        assert_eq!(config.analysis.lines_per_page, 55);
    }
}
