use futures::future::LocalBoxFuture;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{
    camera::Camera, character::CharacterRenderer, config::EngineConfig, episode::PropPlacement,
    Character, Result,
};

/// Loading side of the renderer, supplied by the embedding application.
pub trait StageBackend {
    /// Prepares the background artwork for `id`. `assets` is the episode's
    /// background asset map.
    fn load_background<'a>(
        &'a mut self,
        id: &'a str,
        assets: &'a Map<String, Value>,
    ) -> LocalBoxFuture<'a, Result<()>>;

    /// Creates the renderer for one character placement.
    fn spawn_character(&mut self, placement_id: &str) -> Box<dyn CharacterRenderer>;
}

/// Placed static props, keyed by id in placement order.
#[derive(Debug, Default)]
pub struct PropRegistry {
    props: IndexMap<String, PropPlacement>,
}

impl PropRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a prop. Re-using an id replaces the earlier placement.
    pub fn add_prop(&mut self, prop: PropPlacement) {
        tracing::debug!(prop = %prop.id, x = prop.position.x, y = prop.position.y, "prop placed");
        self.props.insert(prop.id.clone(), prop);
    }

    pub fn remove_prop(&mut self, id: &str) -> Option<PropPlacement> {
        self.props.shift_remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&PropPlacement> {
        self.props.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropPlacement> {
        self.props.values()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn clear(&mut self) {
        self.props.clear();
    }
}

/// Addressable scene state shared by the interpreter's action futures.
#[derive(Debug)]
pub struct Stage {
    camera: Camera,
    background: Option<String>,
    characters: IndexMap<String, Character>,
    props: PropRegistry,
}

impl Stage {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            camera: Camera::new(config),
            background: None,
            characters: IndexMap::new(),
            props: PropRegistry::new(),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn set_background(&mut self, id: impl Into<String>) {
        self.background = Some(id.into());
    }

    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn add_character(&mut self, character: Character) {
        if let Some(replaced) = self
            .characters
            .insert(character.id().to_string(), character)
        {
            replaced.destroy();
        }
    }

    pub fn props(&self) -> &PropRegistry {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut PropRegistry {
        &mut self.props
    }

    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.characters.is_empty() && self.props.is_empty()
    }

    /// Tears down everything scene-specific. The camera survives; the next
    /// scene sets its pose explicitly.
    pub fn clear(&mut self) {
        for (_, character) in self.characters.drain(..) {
            character.destroy();
        }
        self.props.clear();
        self.background = None;
    }
}
