use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque asset references carried by an episode document.
///
/// The engine never interprets these; it only routes the relevant slice to
/// the collaborator that loads a background or a character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    backgrounds: Map<String, Value>,
    #[serde(default)]
    characters: Map<String, Value>,
    #[serde(flatten)]
    other: Map<String, Value>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole background map, handed to background loaders as-is.
    pub fn backgrounds(&self) -> &Map<String, Value> {
        &self.backgrounds
    }

    pub fn background(&self, id: &str) -> Option<&Value> {
        self.backgrounds.get(id)
    }

    pub fn character(&self, reference: &str) -> Option<&Value> {
        self.characters.get(reference)
    }

    /// Asset groups this engine does not route (sfx banks, music, ...).
    pub fn extra(&self, group: &str) -> Option<&Value> {
        self.other.get(group)
    }

    pub fn register_background(&mut self, id: impl Into<String>, asset: Value) {
        self.backgrounds.insert(id.into(), asset);
    }

    pub fn register_character(&mut self, reference: impl Into<String>, asset: Value) {
        self.characters.insert(reference.into(), asset);
    }
}
