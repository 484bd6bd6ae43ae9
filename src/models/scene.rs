// file: src/models/scene.rs
// description: contiguous run of elements bounded by scene headings
// reference: internal data structures

use crate::models::element::{SceneHeading, ScriptElement};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// 1-based position in screenplay order.
    pub index: usize,
    pub heading: SceneHeading,
    pub elements: Vec<ScriptElement>,
}

impl Scene {
    pub fn new(index: usize, heading: SceneHeading) -> Self {
        Self {
            index,
            heading,
            elements: Vec::new(),
        }
    }

    pub fn action_texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|element| match element {
            ScriptElement::Action { text } => Some(text.as_str()),
            _ => None,
        })
    }
}
