use std::{cell::RefCell, fmt, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    tween::{animate, Ease, Point, Tween},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Rama,
    Sita,
    Janaka,
    Vishwamitra,
    KingGeneric,
    /// Reference without a known silhouette; drawn as a placeholder.
    Unknown,
}

impl Archetype {
    pub fn from_ref(reference: &str) -> Self {
        match reference {
            "rama" => Self::Rama,
            "sita" => Self::Sita,
            "janaka" => Self::Janaka,
            "vishwamitra" => Self::Vishwamitra,
            "king_generic" => Self::KingGeneric,
            _ => Self::Unknown,
        }
    }

    /// Poses this archetype has dedicated artwork for.
    pub fn repertoire(self) -> &'static [Pose] {
        use Pose::*;
        match self {
            Self::Rama => &[Idle, Standing, Walking, Lifting, DrawingBow, Triumphant],
            Self::Sita => &[Idle, Walking, Watching, Garlanding],
            Self::Janaka => &[Idle, SittingThrone, Rejoicing],
            Self::Vishwamitra => &[Idle, Nodding],
            Self::KingGeneric => &[Idle, Walking, Straining, Retreating],
            Self::Unknown => &[Idle],
        }
    }

    pub fn fallback_pose(self) -> Pose {
        Pose::Idle
    }

    pub fn supports(self, pose: Pose) -> bool {
        self.repertoire().contains(&pose)
    }

    /// Pose the renderer should draw for `pose`.
    pub fn drawable(self, pose: Pose) -> Pose {
        if self.supports(pose) {
            pose
        } else {
            self.fallback_pose()
        }
    }

    /// Resolves a document pose name. Unrecognized names become the fallback.
    pub fn resolve(self, name: &str) -> Pose {
        Pose::from_name(name).unwrap_or_else(|| {
            tracing::warn!(archetype = ?self, pose = name, "unknown pose name, using fallback");
            self.fallback_pose()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pose {
    Idle,
    Standing,
    Walking,
    Lifting,
    DrawingBow,
    Triumphant,
    Watching,
    Garlanding,
    SittingThrone,
    Rejoicing,
    Nodding,
    Straining,
    Retreating,
}

impl Pose {
    /// The pose held for the duration of a move.
    pub const MOVEMENT: Pose = Pose::Walking;

    pub fn from_name(name: &str) -> Option<Self> {
        let pose = match name {
            "idle" => Self::Idle,
            "standing" => Self::Standing,
            "walking" => Self::Walking,
            "lifting" => Self::Lifting,
            "drawing_bow" => Self::DrawingBow,
            "triumphant" => Self::Triumphant,
            "watching" => Self::Watching,
            "garlanding" => Self::Garlanding,
            "sitting_throne" => Self::SittingThrone,
            "rejoicing" => Self::Rejoicing,
            "nodding" => Self::Nodding,
            "straining" => Self::Straining,
            "retreating" => Self::Retreating,
            _ => return None,
        };
        Some(pose)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Standing => "standing",
            Self::Walking => "walking",
            Self::Lifting => "lifting",
            Self::DrawingBow => "drawing_bow",
            Self::Triumphant => "triumphant",
            Self::Watching => "watching",
            Self::Garlanding => "garlanding",
            Self::SittingThrone => "sitting_throne",
            Self::Rejoicing => "rejoicing",
            Self::Nodding => "nodding",
            Self::Straining => "straining",
            Self::Retreating => "retreating",
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drawing side of a character, implemented outside the engine.
pub trait CharacterRenderer {
    fn load(&mut self, archetype: Archetype, asset: Option<&Value>) -> Result<()>;
    fn set_position(&mut self, position: Point);
    /// Redraw with a new pose. Receives the drawable pose, never one outside
    /// the archetype's repertoire.
    fn set_pose(&mut self, pose: Pose);
    fn set_flip(&mut self, flipped: bool);
    fn destroy(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterSnapshot {
    pub pose: Pose,
    pub position: Point,
    pub flipped: bool,
}

/// Pose machine for one on-stage character placement.
pub struct Character {
    id: String,
    archetype: Archetype,
    frame: Duration,
    state: RefCell<CharacterSnapshot>,
    renderer: RefCell<Box<dyn CharacterRenderer>>,
}

impl Character {
    pub fn new(
        id: impl Into<String>,
        archetype: Archetype,
        renderer: Box<dyn CharacterRenderer>,
        frame: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            archetype,
            frame,
            state: RefCell::new(CharacterSnapshot {
                pose: archetype.fallback_pose(),
                position: Point::default(),
                flipped: false,
            }),
            renderer: RefCell::new(renderer),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub fn snapshot(&self) -> CharacterSnapshot {
        *self.state.borrow()
    }

    pub fn pose(&self) -> Pose {
        self.state.borrow().pose
    }

    pub fn position(&self) -> Point {
        self.state.borrow().position
    }

    pub fn is_flipped(&self) -> bool {
        self.state.borrow().flipped
    }

    /// Asks the renderer to prepare artwork and draws the initial pose.
    pub fn load(&self, asset: Option<&Value>) -> Result<()> {
        let mut renderer = self.renderer.borrow_mut();
        renderer.load(self.archetype, asset)?;
        renderer.set_pose(self.archetype.drawable(self.pose()));
        Ok(())
    }

    pub fn set_position(&self, position: Point) {
        self.state.borrow_mut().position = position;
        self.renderer.borrow_mut().set_position(position);
    }

    /// Switches pose by name. Same pose is a no-op with no redraw.
    pub fn set_state(&self, name: &str) {
        self.set_pose(self.archetype.resolve(name));
    }

    pub fn set_pose(&self, pose: Pose) {
        {
            let mut state = self.state.borrow_mut();
            if state.pose == pose {
                return;
            }
            state.pose = pose;
        }
        tracing::debug!(character = %self.id, %pose, "pose change");
        self.renderer
            .borrow_mut()
            .set_pose(self.archetype.drawable(pose));
    }

    pub fn set_flip(&self, flipped: bool) {
        self.state.borrow_mut().flipped = flipped;
        self.renderer.borrow_mut().set_flip(flipped);
    }

    /// Walks to `target`, then returns to whatever pose was active when the
    /// move began.
    pub async fn move_to(&self, target: Point, duration: Duration) {
        let previous = self.pose();
        self.set_pose(Pose::MOVEMENT);

        let tween = Tween::new(self.position(), target, duration, Ease::InOutQuad);
        animate(tween, self.frame, |position| self.set_position(position)).await;

        self.set_pose(previous);
    }

    /// Releases renderer resources. Called on stage teardown.
    pub fn destroy(&self) {
        self.renderer.borrow_mut().destroy();
    }
}

impl fmt::Debug for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Character")
            .field("id", &self.id)
            .field("archetype", &self.archetype)
            .field("state", &self.state.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::render::{RenderEvent, RenderJournal};

    fn character(reference: &str, journal: &RenderJournal) -> Character {
        let archetype = Archetype::from_ref(reference);
        Character::new(
            "hero",
            archetype,
            Box::new(journal.character_renderer("hero")),
            Duration::from_millis(16),
        )
    }

    fn pose_events(journal: &RenderJournal) -> Vec<Pose> {
        journal
            .events()
            .into_iter()
            .filter_map(|event| match event {
                RenderEvent::CharacterPose { pose, .. } => Some(pose),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn resolves_names_with_fallback() {
        assert_eq!(Archetype::Rama.resolve("drawing_bow"), Pose::DrawingBow);
        assert_eq!(Archetype::Rama.resolve("moonwalk"), Pose::Idle);
        assert_eq!(Archetype::Janaka.drawable(Pose::Walking), Pose::Idle);
        assert_eq!(Archetype::Sita.drawable(Pose::Garlanding), Pose::Garlanding);
        assert_eq!(Archetype::from_ref("ravana"), Archetype::Unknown);
    }

    #[test]
    fn same_state_does_not_redraw() {
        let journal = RenderJournal::new();
        let sita = character("sita", &journal);

        sita.set_state("watching");
        sita.set_state("watching");
        sita.set_state("garlanding");

        assert_eq!(pose_events(&journal), [Pose::Watching, Pose::Garlanding]);
        assert_eq!(sita.pose(), Pose::Garlanding);
    }

    #[test]
    fn flip_is_independent_of_pose() {
        let journal = RenderJournal::new();
        let rama = character("rama", &journal);
        rama.set_state("lifting");
        rama.set_flip(true);

        assert!(rama.is_flipped());
        assert_eq!(rama.pose(), Pose::Lifting);
    }

    #[tokio::test(start_paused = true)]
    async fn move_restores_pre_move_pose() {
        for prior in ["idle", "lifting", "triumphant", "walking"] {
            let journal = RenderJournal::new();
            let rama = character("rama", &journal);
            rama.set_position(Point::new(100.0, 900.0));
            rama.set_state(prior);
            let started = Instant::now();

            let movement = rama.move_to(Point::new(700.0, 900.0), Duration::from_millis(1200));
            let probe = async {
                tokio::time::sleep(Duration::from_millis(600)).await;
                assert_eq!(rama.pose(), Pose::Walking);
                let x = rama.position().x;
                assert!(x > 100.0 && x < 700.0);
            };
            tokio::join!(movement, probe);

            assert_eq!(started.elapsed(), Duration::from_millis(1200));
            assert_eq!(rama.pose(), Pose::from_name(prior).unwrap());
            assert_eq!(rama.position(), Point::new(700.0, 900.0));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn move_forces_walking_even_without_artwork() {
        let journal = RenderJournal::new();
        let janaka = character("janaka", &journal);
        janaka.set_state("rejoicing");

        let movement = janaka.move_to(Point::new(50.0, 0.0), Duration::from_millis(100));
        let probe = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(janaka.pose(), Pose::Walking);
        };
        tokio::join!(movement, probe);

        assert_eq!(janaka.pose(), Pose::Rejoicing);
        assert_eq!(
            pose_events(&journal),
            [Pose::Rejoicing, Pose::Idle, Pose::Rejoicing]
        );
    }
}
