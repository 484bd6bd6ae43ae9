// file: src/extractor/production.rs
// description: keyword-category detection of production elements in action text
// reference: preproduction breakdown sheet categories

use crate::config::CategoryRule;
use crate::error::{PipelineError, Result};
use crate::models::ProductionCue;
use regex::Regex;
use std::collections::HashSet;

struct CategoryMatcher {
    category: String,
    pattern: Regex,
}

pub struct ProductionCueExtractor {
    matchers: Vec<CategoryMatcher>,
}

impl ProductionCueExtractor {
    pub fn new(rules: &[CategoryRule]) -> Result<Self> {
        let mut matchers = Vec::with_capacity(rules.len());

        for rule in rules {
            let mut keywords: Vec<String> = rule
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();

            if keywords.is_empty() {
                continue;
            }

            // Longest first so "police car" wins over "car"
            keywords.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
            keywords.dedup();

            let alternatives = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");

            let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).map_err(|e| {
                PipelineError::Config(format!(
                    "invalid keywords for category '{}': {}",
                    rule.category, e
                ))
            })?;

            matchers.push(CategoryMatcher {
                category: rule.category.clone(),
                pattern,
            });
        }

        Ok(Self { matchers })
    }

    /// Distinct cues in order of first occurrence in the text.
    pub fn find(&self, text: &str) -> Vec<ProductionCue> {
        let mut hits: Vec<(usize, ProductionCue)> = Vec::new();

        for matcher in &self.matchers {
            for found in matcher.pattern.find_iter(text) {
                hits.push((
                    found.start(),
                    ProductionCue {
                        category: matcher.category.clone(),
                        name: found.as_str().to_lowercase(),
                    },
                ));
            }
        }

        hits.sort_by_key(|(position, _)| *position);

        let mut seen = HashSet::new();
        hits.into_iter()
            .map(|(_, cue)| cue)
            .filter(|cue| seen.insert((cue.category.clone(), cue.name.clone())))
            .collect()
    }

    pub fn category_count(&self) -> usize {
        self.matchers.len()
    }
}
