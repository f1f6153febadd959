use std::{cell::Cell, time::Duration};

use crate::tween::{animate, Ease, Tween};

/// Fill colour of the full-viewport overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayFill {
    Black,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub fill: OverlayFill,
    /// Coverage in `[0, 1]`; 1 hides the stage entirely.
    pub opacity: f64,
}

impl Overlay {
    /// Black fill, fully transparent.
    pub const CLEAR: Overlay = Overlay {
        fill: OverlayFill::Black,
        opacity: 0.0,
    };
}

/// Scene transitions via a single overlay drawn above the stage.
#[derive(Debug)]
pub struct TransitionController {
    overlay: Cell<Overlay>,
    frame: Duration,
}

impl TransitionController {
    pub fn new(frame: Duration) -> Self {
        Self {
            overlay: Cell::new(Overlay::CLEAR),
            frame,
        }
    }

    pub fn overlay(&self) -> Overlay {
        self.overlay.get()
    }

    pub fn opacity(&self) -> f64 {
        self.overlay.get().opacity
    }

    /// Fades to full coverage from wherever the overlay currently is.
    pub async fn fade_out(&self, duration: Duration) {
        let tween = Tween::new(self.opacity(), 1.0, duration, Ease::InQuad);
        animate(tween, self.frame, |opacity| self.set_opacity(opacity)).await;
    }

    /// Uncovers the stage. Always starts from full coverage, whatever the
    /// overlay showed before the call.
    pub async fn fade_in(&self, duration: Duration) {
        self.set_opacity(1.0);
        let tween = Tween::new(1.0, 0.0, duration, Ease::OutQuad);
        animate(tween, self.frame, |opacity| self.set_opacity(opacity)).await;
    }

    /// White flash that decays to nothing, then leaves the overlay black and
    /// transparent so later fades start from the usual baseline.
    pub async fn flash(&self, duration: Duration) {
        self.overlay.set(Overlay {
            fill: OverlayFill::White,
            opacity: 1.0,
        });
        let tween = Tween::new(1.0, 0.0, duration, Ease::OutQuad);
        animate(tween, self.frame, |opacity| self.set_opacity(opacity)).await;
        self.overlay.set(Overlay::CLEAR);
    }

    fn set_opacity(&self, opacity: f64) {
        let mut overlay = self.overlay.get();
        overlay.opacity = opacity.clamp(0.0, 1.0);
        self.overlay.set(overlay);
    }
}
