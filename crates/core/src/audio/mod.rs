use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::tween::as_millis_f64;

/// Kind of audio event recorded in the cue log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    Sfx,
    Music,
    NarrationMark,
}

/// One timestamped audio event. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCue {
    pub beat: usize,
    #[serde(rename = "type")]
    pub kind: CueKind,
    /// Clip or track id. Narration marks use `beat_<index>`.
    pub clip: String,
    pub wall_clock_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in: Option<f64>,
}

/// Append-only cue log with a per-session time origin.
///
/// Interior mutability lets every action future of a beat hold a shared
/// reference. This relies on the single-threaded cooperative runtime; no
/// borrow is ever held across an await point.
#[derive(Debug)]
pub struct CueRecorder {
    origin: Cell<Instant>,
    current_beat: Cell<usize>,
    log: RefCell<Vec<AudioCue>>,
}

impl Default for CueRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CueRecorder {
    pub fn new() -> Self {
        Self {
            origin: Cell::new(Instant::now()),
            current_beat: Cell::new(0),
            log: RefCell::new(Vec::new()),
        }
    }

    /// Sets the instant all wall-clock offsets are measured from.
    pub fn set_origin(&self, origin: Instant) {
        self.origin.set(origin);
    }

    /// Milliseconds elapsed since the session origin.
    pub fn elapsed_ms(&self) -> f64 {
        as_millis_f64(self.origin.get().elapsed())
    }

    pub fn current_beat(&self) -> usize {
        self.current_beat.get()
    }

    /// Marks the start of a narration beat; later sfx/music cues are
    /// attributed to this beat.
    pub fn emit_narration_mark(&self, beat: usize, wall_clock_ms: f64) {
        self.current_beat.set(beat);
        tracing::debug!(beat, wall_clock_ms, "narration mark");
        self.push(AudioCue {
            beat,
            kind: CueKind::NarrationMark,
            clip: format!("beat_{beat}"),
            wall_clock_ms,
            volume: None,
            fade_in: None,
        });
    }

    pub fn emit_sfx(&self, clip: &str, delay_ms: f64, volume: f64) {
        let wall_clock_ms = self.elapsed_ms() + delay_ms;
        tracing::debug!(clip, wall_clock_ms, volume, "sfx cue");
        self.push(AudioCue {
            beat: self.current_beat.get(),
            kind: CueKind::Sfx,
            clip: clip.to_string(),
            wall_clock_ms,
            volume: Some(volume),
            fade_in: None,
        });
    }

    pub fn emit_music(&self, track: &str, volume: f64, fade_in_ms: Option<f64>) {
        let wall_clock_ms = self.elapsed_ms();
        tracing::debug!(track, wall_clock_ms, volume, "music cue");
        self.push(AudioCue {
            beat: self.current_beat.get(),
            kind: CueKind::Music,
            clip: track.to_string(),
            wall_clock_ms,
            volume: Some(volume),
            fade_in: fade_in_ms,
        });
    }

    /// Snapshot of the log. Later emissions do not show up in it.
    pub fn cue_log(&self) -> Vec<AudioCue> {
        self.log.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// Clears the log and the current-beat counter. The origin is kept.
    pub fn reset(&self) {
        self.log.borrow_mut().clear();
        self.current_beat.set(0);
    }

    fn push(&self, cue: AudioCue) {
        self.log.borrow_mut().push(cue);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn offsets_are_relative_to_origin() {
        let recorder = CueRecorder::new();
        recorder.set_origin(Instant::now());
        tokio::time::sleep(Duration::from_millis(250)).await;

        recorder.emit_narration_mark(3, recorder.elapsed_ms());
        recorder.emit_sfx("bow_twang", 100.0, 0.8);
        recorder.emit_music("wedding", 0.5, Some(1000.0));

        let log = recorder.cue_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].clip, "beat_3");
        assert_eq!(log[0].wall_clock_ms, 250.0);
        assert_eq!(log[1].kind, CueKind::Sfx);
        assert_eq!(log[1].beat, 3);
        assert_eq!(log[1].wall_clock_ms, 350.0);
        assert_eq!(log[1].volume, Some(0.8));
        assert_eq!(log[2].fade_in, Some(1000.0));
        assert_eq!(log[2].wall_clock_ms, 250.0);
    }

    #[test]
    fn snapshot_is_detached_from_live_store() {
        let recorder = CueRecorder::new();
        recorder.emit_music("court_theme", 0.4, None);
        let snapshot = recorder.cue_log();

        recorder.emit_sfx("gasp", 0.0, 1.0);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn reset_clears_log_and_beat() {
        let recorder = CueRecorder::new();
        recorder.emit_narration_mark(7, 0.0);
        recorder.emit_sfx("drum", 0.0, 1.0);

        recorder.reset();

        assert!(recorder.cue_log().is_empty());
        assert_eq!(recorder.current_beat(), 0);
    }

    #[test]
    fn serializes_with_pipeline_field_names() {
        let recorder = CueRecorder::new();
        recorder.emit_narration_mark(0, 12.5);
        let json = serde_json::to_value(recorder.cue_log()).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{
                "beat": 0,
                "type": "narration_mark",
                "clip": "beat_0",
                "wall_clock_ms": 12.5
            }])
        );
    }
}
