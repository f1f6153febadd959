use std::{collections::HashSet, path::Path};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{camera::CameraPose, tween::Point, AssetManifest, Result, ShadowplayError};

#[derive(Debug, Clone, Deserialize)]
pub struct Episode {
    #[serde(default)]
    pub episode: Option<EpisodeMeta>,
    #[serde(default)]
    pub assets: AssetManifest,
    pub scenes: Vec<Scene>,
}

impl Episode {
    /// Parses and validates a script. Syntax errors stay `Json`; a document
    /// that parses but has missing or mistyped fields is `InvalidEpisode`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let episode: Episode = serde_json::from_str(raw).map_err(|err| {
            if err.is_data() {
                ShadowplayError::invalid_episode(err.to_string())
            } else {
                ShadowplayError::from(err)
            }
        })?;
        episode.validate()?;
        Ok(episode)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            return Err(ShadowplayError::invalid_episode(format!(
                "expected a .json episode script, got `{}`",
                path.display()
            )));
        }

        let episode = Self::from_json(&std::fs::read_to_string(path)?)?;
        tracing::info!(
            title = episode.title(),
            scenes = episode.scenes.len(),
            beats = episode.beat_count(),
            narrated = episode.narration_texts().filter(|text| !text.is_empty()).count(),
            "loaded episode"
        );
        Ok(episode)
    }

    pub fn title(&self) -> &str {
        self.episode.as_ref().map(|meta| meta.title.as_str()).unwrap_or("")
    }

    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    pub fn beat_count(&self) -> usize {
        self.scenes.iter().map(|scene| scene.beats.len()).sum()
    }

    /// Cues one full playback appends: a narration mark per beat, one per
    /// audio action and one per scene music directive.
    pub fn cue_count(&self) -> usize {
        self.scenes
            .iter()
            .map(|scene| {
                let audio = scene
                    .beats
                    .iter()
                    .flat_map(|beat| &beat.actions)
                    .filter(|action| action.emits_cue())
                    .count();
                scene.beats.len() + audio + usize::from(scene.music.is_some())
            })
            .sum()
    }

    /// Every beat in play order, across scene boundaries.
    pub fn beats(&self) -> impl Iterator<Item = &Beat> {
        self.scenes.iter().flat_map(|scene| scene.beats.iter())
    }

    pub fn narration_texts(&self) -> impl Iterator<Item = &str> {
        self.beats().map(|beat| beat.narration.as_str())
    }

    fn validate(&self) -> Result<()> {
        if self.scenes.is_empty() {
            return Err(ShadowplayError::invalid_episode(
                "an episode needs at least one scene",
            ));
        }

        for scene in &self.scenes {
            if !is_valid_zoom(scene.camera.zoom) {
                return Err(ShadowplayError::invalid_episode(format!(
                    "scene `{}` has a non-positive camera zoom {}",
                    scene.id, scene.camera.zoom
                )));
            }

            let mut seen = HashSet::new();
            for placement in &scene.characters_on_stage {
                if !seen.insert(placement.id.as_str()) {
                    return Err(ShadowplayError::invalid_episode(format!(
                        "scene `{}` places character `{}` twice",
                        scene.id, placement.id
                    )));
                }
            }

            for action in scene.beats.iter().flat_map(|beat| &beat.actions) {
                if let Action::CameraZoom(zoom) = action {
                    if !is_valid_zoom(zoom.to) {
                        return Err(ShadowplayError::invalid_episode(format!(
                            "scene `{}` zooms to non-positive level {}",
                            scene.id, zoom.to
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn is_valid_zoom(zoom: f64) -> bool {
    zoom.is_finite() && zoom > 0.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeMeta {
    pub id: String,
    pub title: String,
    #[serde(default = "default_duration_target")]
    pub duration_target: String,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub narration: NarrationConfig,
}

fn default_duration_target() -> String {
    "5-7 min".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Text-to-speech settings for the external narration generator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NarrationConfig {
    pub voice: String,
    pub rate: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            voice: "en-US-GuyNeural".to_string(),
            rate: "+0%".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    pub id: String,
    pub background: String,
    #[serde(default)]
    pub music: Option<MusicDirective>,
    #[serde(default)]
    pub camera: CameraPose,
    #[serde(default)]
    pub characters_on_stage: Vec<CharacterPlacement>,
    #[serde(default)]
    pub props_on_stage: Vec<PropPlacement>,
    #[serde(default)]
    pub beats: Vec<Beat>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MusicDirective {
    pub track: String,
    #[serde(default = "default_music_volume")]
    pub volume: f64,
    #[serde(default)]
    pub fade_in: Option<f64>,
}

fn default_music_volume() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CharacterPlacement {
    pub id: String,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    pub position: Point,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default)]
    pub flip: bool,
}

impl CharacterPlacement {
    /// Archetype reference, falling back to the placement id.
    pub fn archetype_ref(&self) -> &str {
        self.reference.as_deref().unwrap_or(&self.id)
    }
}

fn default_state() -> String {
    "idle".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropPlacement {
    pub id: String,
    pub position: Point,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Beat {
    /// Narration text; opaque to the engine apart from logging.
    #[serde(default)]
    pub narration: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// One effect dispatched within a beat.
///
/// The set of tags is closed; anything else lands in [`Action::Unknown`] so
/// that documents written for newer engines still load.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CameraPan(CameraPan),
    CameraZoom(CameraZoom),
    CameraShake(CameraShake),
    CharacterState(CharacterState),
    CharacterMove(CharacterMove),
    Sfx(Sfx),
    MusicChange(MusicChange),
    Unknown { tag: String },
}

impl Action {
    pub fn tag(&self) -> &str {
        match self {
            Self::CameraPan(_) => "camera_pan",
            Self::CameraZoom(_) => "camera_zoom",
            Self::CameraShake(_) => "camera_shake",
            Self::CharacterState(_) => "character_state",
            Self::CharacterMove(_) => "character_move",
            Self::Sfx(_) => "sfx",
            Self::MusicChange(_) => "music_change",
            Self::Unknown { tag } => tag,
        }
    }

    /// Whether dispatching this action appends to the audio cue log.
    pub fn emits_cue(&self) -> bool {
        matches!(self, Self::Sfx(_) | Self::MusicChange(_))
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let tag = match fields.remove("type") {
            Some(Value::String(tag)) => tag,
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "action `type` must be a string, got {other}"
                )))
            }
            None => return Err(D::Error::missing_field("type")),
        };
        let params = Value::Object(fields);

        let parsed = match tag.as_str() {
            "camera_pan" => serde_json::from_value(params).map(Action::CameraPan),
            "camera_zoom" => serde_json::from_value(params).map(Action::CameraZoom),
            "camera_shake" => serde_json::from_value(params).map(Action::CameraShake),
            "character_state" => serde_json::from_value(params).map(Action::CharacterState),
            "character_move" => serde_json::from_value(params).map(Action::CharacterMove),
            "sfx" => serde_json::from_value(params).map(Action::Sfx),
            "music_change" => serde_json::from_value(params).map(Action::MusicChange),
            _ => return Ok(Action::Unknown { tag }),
        };

        parsed.map_err(|err| D::Error::custom(format!("invalid `{tag}` action: {err}")))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraPan {
    pub to: Point,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraZoom {
    pub to: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraShake {
    #[serde(default = "default_shake_intensity")]
    pub intensity: f64,
    #[serde(default = "default_shake_duration")]
    pub duration: f64,
}

fn default_shake_intensity() -> f64 {
    5.0
}

fn default_shake_duration() -> f64 {
    300.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CharacterState {
    pub character: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CharacterMove {
    pub character: String,
    pub to: Point,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sfx {
    pub clip: String,
    #[serde(default)]
    pub delay: f64,
    #[serde(default = "default_sfx_volume")]
    pub volume: f64,
}

fn default_sfx_volume() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MusicChange {
    pub track: String,
    #[serde(default = "default_music_volume")]
    pub volume: f64,
    #[serde(default = "default_music_fade_in")]
    pub fade_in: f64,
}

fn default_music_fade_in() -> f64 {
    1000.0
}
