use crate::{
    audio::CueRecorder,
    episode::Action,
    stage::Stage,
    tween::millis,
};

/// What happened to a dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The action ran to completion.
    Applied,
    /// The action named a character that is not on stage.
    UnknownCharacter(String),
    /// The tag is not one this engine understands.
    UnknownTag(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ActionInterpreter;

impl ActionInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// Applies one action and resolves once its effect has settled.
    ///
    /// Everything up to the first animation frame happens on the first poll,
    /// so cue offsets reflect when the action was processed, not when its
    /// beat nominally started.
    pub async fn dispatch(&self, action: &Action, stage: &Stage, cues: &CueRecorder) -> Dispatch {
        match action {
            Action::CameraPan(pan) => {
                stage.camera().pan_to(pan.to, millis(pan.duration)).await;
            }
            Action::CameraZoom(zoom) => {
                stage.camera().zoom_to(zoom.to, millis(zoom.duration)).await;
            }
            Action::CameraShake(shake) => {
                stage
                    .camera()
                    .shake(shake.intensity, millis(shake.duration))
                    .await;
            }
            Action::CharacterState(change) => {
                let Some(character) = stage.character(&change.character) else {
                    return unknown_character(&change.character);
                };
                character.set_state(&change.state);
            }
            Action::CharacterMove(movement) => {
                let Some(character) = stage.character(&movement.character) else {
                    return unknown_character(&movement.character);
                };
                character
                    .move_to(movement.to, millis(movement.duration))
                    .await;
            }
            Action::Sfx(sfx) => cues.emit_sfx(&sfx.clip, sfx.delay, sfx.volume),
            Action::MusicChange(music) => {
                cues.emit_music(&music.track, music.volume, Some(music.fade_in));
            }
            Action::Unknown { tag } => {
                tracing::warn!(tag = %tag, "skipping unknown action type");
                return Dispatch::UnknownTag(tag.clone());
            }
        }
        Dispatch::Applied
    }
}

fn unknown_character(id: &str) -> Dispatch {
    tracing::debug!(character = id, "action targets a character not on stage");
    Dispatch::UnknownCharacter(id.to_string())
}
