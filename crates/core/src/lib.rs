//! Core library for Shadowplay, a narration-driven episode player.
//!
//! An episode is a list of scenes, each a stage setup plus timed narration
//! beats. The [`Sequencer`] plays it on a single cooperative timeline: every
//! beat records a narration mark, dispatches its actions through the
//! [`ActionInterpreter`] onto the [`Camera`] and [`Character`] pose machines,
//! and advances once both the actions and the narration have finished. The
//! resulting [`AudioCue`] log tells a downstream muxer where each sound goes.
//!
//! Drawing is left to a [`StageBackend`]; [`HeadlessBackend`] records calls
//! instead of drawing.

pub mod action;
pub mod assets;
pub mod audio;
pub mod camera;
pub mod character;
pub mod config;
pub mod episode;
pub mod error;
pub mod record;
pub mod render;
pub mod stage;
pub mod timeline;
pub mod transition;
pub mod tween;

pub use action::{ActionInterpreter, Dispatch};
pub use assets::AssetManifest;
pub use audio::{AudioCue, CueKind, CueRecorder};
pub use camera::{Camera, CameraPose, ViewTransform};
pub use character::{Archetype, Character, CharacterRenderer, Pose};
pub use config::{EngineConfig, TimingConfig, Viewport};
pub use episode::{Action, Beat, Episode, Scene};
pub use error::{Result, ShadowplayError};
pub use record::{load_beat_durations, Recorder, RecordingSettings};
pub use render::{HeadlessBackend, RenderEvent, RenderJournal};
pub use stage::{PropRegistry, Stage, StageBackend};
pub use timeline::{PlaybackReport, Sequencer, SequencerState, Session};
pub use transition::{Overlay, OverlayFill, TransitionController};
pub use tween::{Ease, Point, Tween};
