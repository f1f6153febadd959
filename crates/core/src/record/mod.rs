use std::{path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{
    audio::AudioCue,
    config::EngineConfig,
    episode::Episode,
    stage::StageBackend,
    timeline::{PlaybackReport, Sequencer},
    Result,
};

/// Options for a recording run driven from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    /// Where the cue log is written after playback.
    pub cue_log_path: String,
    pub beat_durations: Vec<u64>,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            cue_log_path: "audio_cues.json".to_string(),
            beat_durations: Vec::new(),
        }
    }
}

/// Control surface for the external recording driver.
///
/// The driver hands over narration durations, starts playback, waits for the
/// completion flag and then collects the cue log for audio muxing.
#[derive(Debug)]
pub struct Recorder {
    sequencer: Sequencer,
    beat_durations: Vec<u64>,
    complete: watch::Sender<bool>,
}

impl Recorder {
    pub fn new(episode: Arc<Episode>, backend: Box<dyn StageBackend>, config: EngineConfig) -> Self {
        let (complete, _) = watch::channel(false);
        Self {
            sequencer: Sequencer::new(episode, backend, config),
            beat_durations: Vec::new(),
            complete,
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn set_beat_durations(&mut self, durations: Vec<u64>) {
        tracing::info!(count = durations.len(), "received beat durations");
        self.beat_durations = durations;
    }

    pub fn beat_durations(&self) -> &[u64] {
        &self.beat_durations
    }

    /// Plays the episode to the end. The completion flag drops to `false`
    /// when playback starts and rises once every beat has played.
    pub async fn start_playback(&mut self) -> Result<PlaybackReport> {
        self.complete.send_replace(false);
        tracing::info!("starting playback");
        let report = self.sequencer.play(&self.beat_durations).await?;
        self.complete.send_replace(true);
        tracing::info!("playback complete");
        Ok(report)
    }

    pub fn is_complete(&self) -> bool {
        *self.complete.borrow()
    }

    /// Receiver that observes the completion flag.
    pub fn completion(&self) -> watch::Receiver<bool> {
        self.complete.subscribe()
    }

    /// Snapshot of every cue recorded so far.
    pub fn audio_cue_log(&self) -> Vec<AudioCue> {
        self.sequencer.cues().cue_log()
    }

    /// Clears the cue log. Logs are never cleared implicitly between runs.
    pub fn reset_cues(&self) {
        self.sequencer.cues().reset();
    }

    pub fn write_cue_log(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.audio_cue_log())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Reads a JSON array of narration durations in milliseconds.
pub fn load_beat_durations(path: impl AsRef<Path>) -> Result<Vec<u64>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
