use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::time::Instant;

use crate::{
    action::{ActionInterpreter, Dispatch},
    audio::CueRecorder,
    character::{Archetype, Character},
    config::EngineConfig,
    episode::{Beat, Episode},
    stage::{Stage, StageBackend},
    transition::TransitionController,
    tween::as_millis_f64,
    Result,
};

/// Longest narration excerpt written to the beat log line.
const NARRATION_PREVIEW_CHARS: usize = 50;

/// Where the sequencer is in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    #[default]
    Idle,
    Loading(usize),
    TransitionOut,
    StagingScene,
    TransitionIn,
    RunningBeats,
    Complete,
}

/// Per-playback timeline bookkeeping. A fresh session starts with every
/// [`Sequencer::play`] call.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SequencerState,
    current_scene: Option<usize>,
    beats_played: usize,
    started_at: Option<Instant>,
}

impl Session {
    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn current_scene(&self) -> Option<usize> {
        self.current_scene
    }

    /// Global index of the next beat to play.
    pub fn beats_played(&self) -> usize {
        self.beats_played
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }
}

/// Summary returned once a session has run to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub scenes: usize,
    pub beats: usize,
    pub cues: usize,
    pub elapsed: Duration,
}

/// Walks an episode scene by scene and beat by beat on one cooperative
/// timeline. A beat advances once every action it dispatched has settled and
/// its narration time has elapsed.
pub struct Sequencer {
    episode: Arc<Episode>,
    config: EngineConfig,
    backend: Box<dyn StageBackend>,
    stage: Stage,
    transitions: TransitionController,
    cues: CueRecorder,
    interpreter: ActionInterpreter,
    session: Session,
}

impl Sequencer {
    pub fn new(
        episode: Arc<Episode>,
        backend: Box<dyn StageBackend>,
        config: EngineConfig,
    ) -> Self {
        Self {
            stage: Stage::new(&config),
            transitions: TransitionController::new(config.timing.frame_interval()),
            cues: CueRecorder::new(),
            interpreter: ActionInterpreter::new(),
            session: Session::default(),
            episode,
            config,
            backend,
        }
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn transitions(&self) -> &TransitionController {
        &self.transitions
    }

    pub fn cues(&self) -> &CueRecorder {
        &self.cues
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SequencerState {
        self.session.state
    }

    /// Plays the whole episode. `beat_durations` holds one narration length
    /// in milliseconds per beat across all scenes; missing entries fall back
    /// to the configured default.
    pub async fn play(&mut self, beat_durations: &[u64]) -> Result<PlaybackReport> {
        let started = Instant::now();
        self.session = Session {
            started_at: Some(started),
            ..Session::default()
        };
        self.cues.set_origin(started);

        let episode = Arc::clone(&self.episode);
        tracing::info!(
            title = episode.title(),
            scenes = episode.scenes.len(),
            beats = episode.beat_count(),
            durations = beat_durations.len(),
            "starting playback"
        );

        for (scene_index, scene) in episode.scenes.iter().enumerate() {
            self.load_scene(scene_index).await?;
            self.set_state(SequencerState::RunningBeats);

            for beat in &scene.beats {
                let beat_index = self.session.beats_played;
                let duration = self.beat_duration(beat_durations, beat_index);
                self.run_beat(scene_index, beat_index, beat, duration).await;
                self.session.beats_played += 1;
            }
        }

        self.set_state(SequencerState::Complete);
        let report = PlaybackReport {
            scenes: episode.scenes.len(),
            beats: self.session.beats_played,
            cues: self.cues.len(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            beats = report.beats,
            cues = report.cues,
            elapsed_ms = as_millis_f64(report.elapsed),
            "episode complete"
        );
        Ok(report)
    }

    /// Transitions to scene `index`. Indices past the end are ignored without
    /// touching the overlay or the stage.
    pub async fn load_scene(&mut self, index: usize) -> Result<()> {
        let episode = Arc::clone(&self.episode);
        let Some(scene) = episode.scene(index) else {
            tracing::warn!(
                index,
                scenes = episode.scenes.len(),
                "scene index out of range"
            );
            return Ok(());
        };

        self.set_state(SequencerState::Loading(index));
        let timing = &self.config.timing;
        let is_first = self.session.current_scene.is_none();
        let fade_in = if is_first {
            timing.opening_fade_ms
        } else {
            timing.scene_fade_ms
        };
        let fade_out = timing.scene_fade_ms;
        let frame = timing.frame_interval();

        if !is_first {
            self.set_state(SequencerState::TransitionOut);
            self.transitions
                .fade_out(Duration::from_millis(fade_out))
                .await;
        }

        self.set_state(SequencerState::StagingScene);
        self.stage.clear();
        self.session.current_scene = Some(index);

        self.backend
            .load_background(&scene.background, episode.assets.backgrounds())
            .await?;
        self.stage.set_background(scene.background.as_str());

        for placement in &scene.characters_on_stage {
            let reference = placement.archetype_ref();
            let renderer = self.backend.spawn_character(&placement.id);
            let character = Character::new(
                placement.id.as_str(),
                Archetype::from_ref(reference),
                renderer,
                frame,
            );
            character.load(episode.assets.character(reference))?;
            character.set_position(placement.position);
            character.set_state(&placement.state);
            if placement.flip {
                character.set_flip(true);
            }
            self.stage.add_character(character);
        }

        for prop in &scene.props_on_stage {
            self.stage.props_mut().add_prop(prop.clone());
        }

        let camera = scene.camera;
        self.stage
            .camera()
            .set_immediate(camera.x, camera.y, camera.zoom);

        if let Some(music) = &scene.music {
            self.cues.emit_music(&music.track, music.volume, music.fade_in);
        }

        self.set_state(SequencerState::TransitionIn);
        self.transitions
            .fade_in(Duration::from_millis(fade_in))
            .await;

        tracing::info!(scene = %scene.id, index, "loaded scene");
        Ok(())
    }

    fn beat_duration(&self, beat_durations: &[u64], beat_index: usize) -> Duration {
        let ms = beat_durations
            .get(beat_index)
            .copied()
            .unwrap_or(self.config.timing.default_beat_ms);
        Duration::from_millis(ms)
    }

    async fn run_beat(&self, scene_index: usize, beat_index: usize, beat: &Beat, duration: Duration) {
        let preview: String = beat.narration.chars().take(NARRATION_PREVIEW_CHARS).collect();
        tracing::debug!(
            scene = scene_index,
            beat = beat_index,
            duration_ms = as_millis_f64(duration),
            narration = %preview,
            "beat start"
        );

        self.cues.emit_narration_mark(beat_index, self.cues.elapsed_ms());

        let actions = join_all(
            beat.actions
                .iter()
                .map(|action| self.interpreter.dispatch(action, &self.stage, &self.cues)),
        );
        let (outcomes, ()) = tokio::join!(actions, tokio::time::sleep(duration));

        let skipped = outcomes
            .iter()
            .filter(|outcome| **outcome != Dispatch::Applied)
            .count();
        if skipped > 0 {
            tracing::debug!(beat = beat_index, skipped, "beat finished with skipped actions");
        }
    }

    fn set_state(&mut self, state: SequencerState) {
        tracing::trace!(from = ?self.session.state, to = ?state, "sequencer state");
        self.session.state = state;
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("scenes", &self.episode.scenes.len())
            .field("session", &self.session)
            .field("stage", &self.stage)
            .field("cues", &self.cues.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::CueKind,
        camera::CameraPose,
        character::Pose,
        render::{HeadlessBackend, RenderEvent, RenderJournal},
        tween::Point,
    };

    fn sequencer(raw: &str) -> (Sequencer, RenderJournal) {
        let episode = Arc::new(Episode::from_json(raw).unwrap());
        let backend = HeadlessBackend::new();
        let journal = backend.journal();
        let sequencer = Sequencer::new(episode, Box::new(backend), EngineConfig::deterministic(11));
        (sequencer, journal)
    }

    const TWO_SCENES: &str = r#"{
        "scenes": [
            {
                "id": "court",
                "background": "court_hall",
                "camera": { "x": 0, "y": 0, "zoom": 1 },
                "beats": [{ "narration": "King Janaka announced the contest.", "actions": [] }]
            },
            {
                "id": "bow",
                "background": "court_hall",
                "camera": { "x": 200, "y": 100, "zoom": 1.4 },
                "beats": [{
                    "narration": "Rama drew the great bow.",
                    "actions": [{ "type": "sfx", "clip": "bow_twang", "delay": 100 }]
                }]
            }
        ]
    }"#;

    #[tokio::test(start_paused = true)]
    async fn two_scene_scenario_produces_expected_cues() {
        let (mut sequencer, _) = sequencer(TWO_SCENES);

        let report = sequencer.play(&[1500, 800]).await.unwrap();
        let log = sequencer.cues().cue_log();

        assert_eq!(log.len(), 3);
        assert_eq!(log[0].kind, CueKind::NarrationMark);
        assert_eq!(log[0].beat, 0);
        assert_eq!(log[0].wall_clock_ms, 1000.0);

        assert_eq!(log[1].kind, CueKind::NarrationMark);
        assert_eq!(log[1].beat, 1);
        assert_eq!(log[1].wall_clock_ms, 1000.0 + 1500.0 + 500.0 + 500.0);

        assert_eq!(log[2].kind, CueKind::Sfx);
        assert_eq!(log[2].clip, "bow_twang");
        assert_eq!(log[2].beat, 1);
        assert_eq!(log[2].wall_clock_ms, log[1].wall_clock_ms + 100.0);

        assert!(report.elapsed >= Duration::from_millis(500 + 500 + 1500 + 800));
        assert_eq!(report.beats, 2);
        assert_eq!(report.cues, 3);
        assert_eq!(sequencer.state(), SequencerState::Complete);
        assert_eq!(sequencer.stage().camera().pose(), CameraPose::new(200.0, 100.0, 1.4));
    }

    #[tokio::test(start_paused = true)]
    async fn beat_advances_after_slowest_of_actions_and_narration() {
        let (mut sequencer, _) = sequencer(
            r#"{ "scenes": [{
                "id": "s", "background": "b",
                "beats": [
                    { "actions": [{ "type": "camera_pan", "to": { "x": 50, "y": 0 }, "duration": 3000 }] },
                    { "actions": [{ "type": "camera_shake", "duration": 100 }] },
                    { "actions": [] }
                ]
            }] }"#,
        );

        sequencer.play(&[1000, 700]).await.unwrap();
        let marks: Vec<f64> = sequencer
            .cues()
            .cue_log()
            .iter()
            .map(|cue| cue.wall_clock_ms)
            .collect();

        // Opening fade, then max(3000 pan, 1000 narration), then max(100, 700).
        assert_eq!(marks, [1000.0, 4000.0, 4700.0]);
        assert_eq!(sequencer.session().elapsed(), Duration::from_millis(4700 + 2000));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_action_still_records_narration_mark() {
        let (mut sequencer, _) = sequencer(
            r#"{ "scenes": [{
                "id": "s", "background": "b",
                "camera": { "x": 10, "y": 20, "zoom": 1.1 },
                "characters_on_stage": [{ "id": "sita", "position": { "x": 300, "y": 800 }, "state": "watching" }],
                "props_on_stage": [{ "id": "garland", "position": { "x": 310, "y": 700 } }],
                "beats": [{ "actions": [
                    { "type": "levitate", "character": "sita" },
                    { "type": "character_state", "character": "nobody", "state": "idle" }
                ] }]
            }] }"#,
        );

        sequencer.play(&[200]).await.unwrap();

        let log = sequencer.cues().cue_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, CueKind::NarrationMark);
        assert_eq!(sequencer.stage().camera().pose(), CameraPose::new(10.0, 20.0, 1.1));
        let sita = sequencer.stage().character("sita").unwrap();
        assert_eq!(sita.pose(), Pose::Watching);
        assert_eq!(sita.position(), Point::new(300.0, 800.0));
        assert_eq!(sequencer.stage().props().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cue_count_is_beats_plus_audio_actions() {
        let (mut sequencer, _) = sequencer(
            r#"{ "scenes": [
                { "id": "a", "background": "b", "beats": [
                    { "actions": [{ "type": "sfx", "clip": "drum" }, { "type": "camera_zoom", "to": 1.2, "duration": 10 }] },
                    { "actions": [{ "type": "music_change", "track": "tension" }] }
                ] },
                { "id": "c", "background": "d", "beats": [
                    { "actions": [{ "type": "sfx", "clip": "gasp" }, { "type": "sfx", "clip": "cheer" }] }
                ] }
            ] }"#,
        );

        sequencer.play(&[]).await.unwrap();

        let log = sequencer.cues().cue_log();
        assert_eq!(log.len(), 3 + 4);
        assert_eq!(log.len(), sequencer.episode().cue_count());
        let beats: Vec<usize> = log.iter().map(|cue| cue.beat).collect();
        assert!(beats.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn zoom_survives_shake_in_the_same_beat() {
        let (mut sequencer, _) = sequencer(
            r#"{ "scenes": [{
                "id": "s", "background": "b",
                "camera": { "x": 30, "y": 40, "zoom": 1 },
                "beats": [{ "actions": [
                    { "type": "camera_zoom", "to": 1.5, "duration": 100 },
                    { "type": "camera_shake", "intensity": 5, "duration": 300 }
                ] }]
            }] }"#,
        );

        sequencer.play(&[100]).await.unwrap();

        assert_eq!(sequencer.stage().camera().pose(), CameraPose::new(30.0, 40.0, 1.5));
        assert_eq!(sequencer.session().elapsed(), Duration::from_millis(1000 + 300));
    }

    #[tokio::test(start_paused = true)]
    async fn extreme_shake_intensity_plays_through() {
        let (mut sequencer, _) = sequencer(
            r#"{ "scenes": [{ "id": "s", "background": "b", "beats": [
                { "actions": [{ "type": "camera_shake", "intensity": 1e308, "duration": 50 }] }
            ] }] }"#,
        );

        let report = sequencer.play(&[10]).await.unwrap();

        assert_eq!(report.beats, 1);
        assert_eq!(sequencer.stage().camera().pose(), CameraPose::default());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_durations_default_to_two_seconds() {
        let (mut sequencer, _) = sequencer(
            r#"{ "scenes": [{ "id": "a", "background": "b", "beats": [{}, {}] }] }"#,
        );

        sequencer.play(&[300]).await.unwrap();

        let log = sequencer.cues().cue_log();
        assert_eq!(log[1].wall_clock_ms, 1000.0 + 300.0);
        assert_eq!(sequencer.session().elapsed(), Duration::from_millis(1300 + 2000));
    }

    #[tokio::test(start_paused = true)]
    async fn scene_music_is_logged_before_first_beat() {
        let (mut sequencer, _) = sequencer(
            r#"{ "scenes": [{
                "id": "a", "background": "b",
                "music": { "track": "court_theme", "volume": 0.3, "fade_in": 2000 },
                "beats": [{}]
            }] }"#,
        );

        sequencer.play(&[100]).await.unwrap();

        let log = sequencer.cues().cue_log();
        assert_eq!(log[0].kind, CueKind::Music);
        assert_eq!(log[0].clip, "court_theme");
        assert_eq!(log[0].wall_clock_ms, 0.0);
        assert_eq!(log[0].volume, Some(0.3));
        assert_eq!(log[0].fade_in, Some(2000.0));
        assert_eq!(log[1].kind, CueKind::NarrationMark);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_scene_is_a_no_op() {
        let (mut sequencer, journal) = sequencer(TWO_SCENES);
        let started = Instant::now();

        sequencer.load_scene(2).await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(sequencer.stage().is_empty());
        assert_eq!(sequencer.session().current_scene(), None);
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert_eq!(sequencer.transitions().opacity(), 0.0);
        assert!(journal.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn scene_changes_fade_out_and_rebuild_stage() {
        let (mut sequencer, journal) = sequencer(
            r#"{ "scenes": [
                { "id": "a", "background": "forest", "characters_on_stage": [
                    { "id": "rama", "position": { "x": 1, "y": 2 }, "state": "triumphant", "flip": true }
                ] },
                { "id": "b", "background": "court_hall", "characters_on_stage": [
                    { "id": "guard", "ref": "king_generic", "position": { "x": 3, "y": 4 } }
                ] }
            ] }"#,
        );

        let started = Instant::now();
        sequencer.load_scene(0).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
        let rama = sequencer.stage().character("rama").unwrap();
        assert!(rama.is_flipped());
        assert_eq!(rama.pose(), Pose::Triumphant);

        sequencer.load_scene(1).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(2000));
        assert_eq!(sequencer.stage().background(), Some("court_hall"));
        assert!(sequencer.stage().character("rama").is_none());
        let guard = sequencer.stage().character("guard").unwrap();
        assert_eq!(guard.archetype(), Archetype::KingGeneric);
        assert_eq!(sequencer.transitions().opacity(), 0.0);

        let events = journal.events();
        let destroyed = events
            .iter()
            .position(|event| *event == RenderEvent::CharacterDestroyed { id: "rama".to_string() })
            .unwrap();
        let court = events
            .iter()
            .position(|event| *event == RenderEvent::BackgroundLoaded { id: "court_hall".to_string() })
            .unwrap();
        assert!(destroyed < court);
    }
}
