use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the playback engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub viewport: Viewport,
    pub timing: TimingConfig,
    /// Seed for the camera shake jitter. `None` draws from OS entropy.
    pub shake_seed: Option<u64>,
}

impl EngineConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Same timings as the defaults but with a fixed shake seed.
    pub fn deterministic(seed: u64) -> Self {
        Self {
            shake_seed: Some(seed),
            ..Self::default()
        }
    }
}

/// Size of the output frame in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Millisecond constants that shape the session timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Used for beats that have no entry in the supplied duration list.
    pub default_beat_ms: u64,
    /// Fade out and fade in around every scene change after the first.
    pub scene_fade_ms: u64,
    /// Fade in of the first scene of a session.
    pub opening_fade_ms: u64,
    /// Length of one jitter step of a camera shake.
    pub shake_step_ms: u64,
    /// Sampling interval of eased animations.
    pub frame_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_beat_ms: 2000,
            scene_fade_ms: 500,
            opening_fade_ms: 1000,
            shake_step_ms: 50,
            frame_ms: 16,
        }
    }
}

impl TimingConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }

    pub fn shake_step(&self) -> Duration {
        Duration::from_millis(self.shake_step_ms.max(1))
    }
}
