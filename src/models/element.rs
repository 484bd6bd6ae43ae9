// file: src/models/element.rs
// description: classified screenplay elements produced by the parser
// reference: industry screenplay formatting conventions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    Interior,
    Exterior,
    InteriorExterior,
    /// Bare numbered headers such as `СЦЕНА 12` name no setting.
    Unspecified,
}

impl Setting {
    /// Maps a heading prefix such as `INT.`, `I/E` or `НАТ.` to a setting.
    pub fn from_prefix(prefix: &str) -> Self {
        let upper = prefix.to_uppercase();
        let interior = upper.contains("INT") || upper.contains("ИНТ");
        let exterior = ["EXT", "EST", "ЭКС", "НАТ"]
            .iter()
            .any(|marker| upper.contains(marker));

        if upper.starts_with("I/E") || (interior && exterior) {
            Self::InteriorExterior
        } else if interior {
            Self::Interior
        } else {
            Self::Exterior
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Interior => "INT",
            Self::Exterior => "EXT",
            Self::InteriorExterior => "INT/EXT",
            Self::Unspecified => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneHeading {
    pub raw: String,
    pub number: Option<String>,
    pub setting: Setting,
    pub location: String,
    pub time_of_day: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptElement {
    SceneHeading(SceneHeading),
    Character { name: String },
    Dialogue { speaker: String, text: String },
    Parenthetical { speaker: String, text: String },
    Action { text: String },
    Transition { text: String },
}

impl ScriptElement {
    pub fn is_scene_heading(&self) -> bool {
        matches!(self, Self::SceneHeading(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SceneHeading(_) => "scene_heading",
            Self::Character { .. } => "character",
            Self::Dialogue { .. } => "dialogue",
            Self::Parenthetical { .. } => "parenthetical",
            Self::Action { .. } => "action",
            Self::Transition { .. } => "transition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_from_prefix() {
        assert_eq!(Setting::from_prefix("INT."), Setting::Interior);
        assert_eq!(Setting::from_prefix("ext."), Setting::Exterior);
        assert_eq!(Setting::from_prefix("EST."), Setting::Exterior);
        assert_eq!(Setting::from_prefix("INT./EXT."), Setting::InteriorExterior);
        assert_eq!(Setting::from_prefix("I/E"), Setting::InteriorExterior);
        assert_eq!(Setting::from_prefix("ИНТЕРЬЕР"), Setting::Interior);
        assert_eq!(Setting::from_prefix("НАТ."), Setting::Exterior);
        assert_eq!(Setting::from_prefix("ИНТ"), Setting::Interior);
        assert_eq!(Setting::Unspecified.label(), "-");
    }

    #[test]
    fn test_element_serialization_is_tagged() {
        let element = ScriptElement::Dialogue {
            speaker: "JOHN".to_string(),
            text: "Hello.".to_string(),
        };
        let json = serde_json::to_string(&element).unwrap();

        assert_eq!(json, r#"{"kind":"dialogue","speaker":"JOHN","text":"Hello."}"#);
        assert_eq!(element.kind(), "dialogue");
    }
}
