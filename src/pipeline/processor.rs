// file: src/pipeline/processor.rs
// description: synchronous parse, extract and aggregate stages for one admitted document
// reference: runs on the blocking pool, one document per call

use crate::config::Config;
use crate::error::Result;
use crate::extractor::{ElementExtractor, ExtractedScript};
use crate::models::{Document, ProductionBreakdown, SceneSummary};
use crate::parser::ScriptParser;
use crate::pipeline::aggregator::BreakdownAggregator;
use serde::Serialize;
use tracing::{debug, info};

pub struct AnalysisStages {
    parser: ScriptParser,
    extractor: ElementExtractor,
    aggregator: BreakdownAggregator,
}

/// First scenes of a script, summarized without caching or export.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptPreview {
    pub filename: String,
    pub fingerprint: String,
    pub estimated_pages: usize,
    pub total_scenes: usize,
    pub preamble_elements: usize,
    pub scenes: Vec<SceneSummary>,
}

impl AnalysisStages {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            parser: ScriptParser::new(&config.parser)?,
            extractor: ElementExtractor::new(&config.analysis)?,
            aggregator: BreakdownAggregator::new(&config.analysis),
        })
    }

    pub fn extract(&self, document: &Document) -> Result<ExtractedScript> {
        let elements = self.parser.parse(document)?;
        debug!(
            "{}: {} elements parsed",
            document.filename(),
            elements.len()
        );
        self.extractor.extract(elements)
    }

    pub fn run(&self, document: &Document) -> Result<ProductionBreakdown> {
        info!("Analyzing {}", document.filename());

        let extracted = self.extract(document)?;
        let breakdown = self.aggregator.aggregate(&extracted)?;

        info!(
            "{}: {} scenes, {} characters, {} locations",
            document.filename(),
            breakdown.totals.scene_count,
            breakdown.totals.character_count,
            breakdown.totals.location_count
        );

        Ok(breakdown)
    }

    pub fn preview(&self, document: &Document, scene_limit: usize) -> Result<ScriptPreview> {
        let extracted = self.extract(document)?;

        let scenes = extracted
            .scenes
            .iter()
            .take(scene_limit)
            .map(|scene| {
                self.aggregator
                    .summarize_scene(scene, extracted.production_cues_for(scene.index))
            })
            .collect();

        Ok(ScriptPreview {
            filename: document.filename().to_string(),
            fingerprint: document.fingerprint().to_string(),
            estimated_pages: document.estimated_pages(),
            total_scenes: extracted.scenes.len(),
            preamble_elements: extracted.preamble_elements,
            scenes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, PipelineError};

    const SCRIPT: &str = "INT. ROOM - DAY\n\nA dog sleeps.\n\nEXT. STREET - NIGHT\n\nRain.\n\nINT. CAR - NIGHT\n\nSilence.\n";

    fn document(text: &str) -> Document {
        Document::new(text.as_bytes().to_vec(), "test.txt".to_string(), 1)
    }

    #[test]
    fn test_run_produces_breakdown() {
        let stages = AnalysisStages::new(&Config::default_config()).unwrap();
        let breakdown = stages.run(&document(SCRIPT)).unwrap();

        assert_eq!(breakdown.totals.scene_count, 3);
        assert_eq!(breakdown.totals.location_count, 3);
    }

    #[test]
    fn test_preview_limits_scenes() {
        let stages = AnalysisStages::new(&Config::default_config()).unwrap();
        let preview = stages.preview(&document(SCRIPT), 2).unwrap();

        assert_eq!(preview.total_scenes, 3);
        assert_eq!(preview.scenes.len(), 2);
        assert_eq!(preview.scenes[1].location, "STREET");
        assert_eq!(preview.scenes[0].production_elements[0].name, "dog");
    }

    #[test]
    fn test_unstructured_text_fails() {
        let stages = AnalysisStages::new(&Config::default_config()).unwrap();
        let err = stages.run(&document("Dear diary, nothing happened.")).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Parse(ParseError::NoStructureDetected)
        ));
    }

    #[test]
    fn test_repeated_runs_serialize_identically() {
        let script = concat!(
            "FADE IN:\n\n",
            "INT. KITCHEN - DAY\n\n",
            "A dog barks. Coffee boils over. Smoke fills the room.\n\n",
            "          ZED\n",
            "     (coughing)\n",
            "     Who left the gun on the table?\n\n",
            "          AMY (O.S.)\n",
            "     Not me.\n\n",
            "EXT. STREET - NIGHT\n\n",
            "A taxi passes. Rain.\n\n",
            "          MIKE\n",
            "     Get in the car.\n\n",
            "СЦЕНА 3\n\n",
            "Толпа у вокзала.\n\n",
            "          АННА\n",
            "     Где поезд?\n",
        );
        let config = Config::default_config();

        let runs: Vec<Vec<u8>> = (0..10)
            .map(|_| {
                let stages = AnalysisStages::new(&config).unwrap();
                let breakdown = stages.run(&document(script)).unwrap();
                serde_json::to_vec(&breakdown).unwrap()
            })
            .collect();

        assert!(runs.windows(2).all(|pair| pair[0] == pair[1]));

        let breakdown: ProductionBreakdown = serde_json::from_slice(&runs[0]).unwrap();
        assert_eq!(breakdown.totals.scene_count, 3);
        assert!(breakdown.production_elements.len() > 3);
    }
}
