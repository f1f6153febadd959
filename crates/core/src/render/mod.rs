use std::{cell::RefCell, rc::Rc};

use futures::future::{self, LocalBoxFuture};
use serde_json::{Map, Value};

use crate::{
    character::{Archetype, CharacterRenderer, Pose},
    stage::StageBackend,
    tween::Point,
    Result,
};

/// A single call observed by the headless backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    BackgroundLoaded { id: String },
    CharacterLoaded { id: String, archetype: Archetype },
    CharacterPose { id: String, pose: Pose },
    CharacterPosition { id: String, position: Point },
    CharacterFlip { id: String, flipped: bool },
    CharacterDestroyed { id: String },
}

/// Shared, append-only record of render calls.
///
/// Cloning hands out another view of the same journal, so a test can keep one
/// while the backend owns another.
#[derive(Debug, Clone, Default)]
pub struct RenderJournal {
    events: Rc<RefCell<Vec<RenderEvent>>>,
}

impl RenderJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Renderer for one character that reports into this journal.
    pub fn character_renderer(&self, id: impl Into<String>) -> HeadlessCharacter {
        HeadlessCharacter {
            id: id.into(),
            journal: self.clone(),
        }
    }

    fn push(&self, event: RenderEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Stage backend that draws nothing and journals every call. Backs the CLI
/// and the engine's own tests.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    journal: RenderJournal,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: RenderJournal) -> Self {
        Self { journal }
    }

    pub fn journal(&self) -> RenderJournal {
        self.journal.clone()
    }
}

impl StageBackend for HeadlessBackend {
    fn load_background<'a>(
        &'a mut self,
        id: &'a str,
        _assets: &'a Map<String, Value>,
    ) -> LocalBoxFuture<'a, Result<()>> {
        self.journal.push(RenderEvent::BackgroundLoaded { id: id.to_string() });
        Box::pin(future::ready(Ok(())))
    }

    fn spawn_character(&mut self, placement_id: &str) -> Box<dyn CharacterRenderer> {
        Box::new(self.journal.character_renderer(placement_id))
    }
}

#[derive(Debug)]
pub struct HeadlessCharacter {
    id: String,
    journal: RenderJournal,
}

impl CharacterRenderer for HeadlessCharacter {
    fn load(&mut self, archetype: Archetype, _asset: Option<&Value>) -> Result<()> {
        self.journal.push(RenderEvent::CharacterLoaded {
            id: self.id.clone(),
            archetype,
        });
        Ok(())
    }

    fn set_position(&mut self, position: Point) {
        self.journal.push(RenderEvent::CharacterPosition {
            id: self.id.clone(),
            position,
        });
    }

    fn set_pose(&mut self, pose: Pose) {
        self.journal.push(RenderEvent::CharacterPose {
            id: self.id.clone(),
            pose,
        });
    }

    fn set_flip(&mut self, flipped: bool) {
        self.journal.push(RenderEvent::CharacterFlip {
            id: self.id.clone(),
            flipped,
        });
    }

    fn destroy(&mut self) {
        self.journal.push(RenderEvent::CharacterDestroyed { id: self.id.clone() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn backend_and_renderers_share_one_journal() {
        let mut backend = HeadlessBackend::new();
        let journal = backend.journal();

        backend.load_background("court_hall", &Map::new()).await.unwrap();
        let mut sita = backend.spawn_character("sita");
        sita.load(Archetype::Sita, None).unwrap();
        sita.set_flip(true);
        sita.destroy();

        assert_eq!(
            journal.events(),
            [
                RenderEvent::BackgroundLoaded {
                    id: "court_hall".to_string()
                },
                RenderEvent::CharacterLoaded {
                    id: "sita".to_string(),
                    archetype: Archetype::Sita
                },
                RenderEvent::CharacterFlip {
                    id: "sita".to_string(),
                    flipped: true
                },
                RenderEvent::CharacterDestroyed {
                    id: "sita".to_string()
                },
            ]
        );

        journal.clear();
        assert!(journal.events().is_empty());
    }
}
