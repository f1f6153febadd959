use std::{
    cell::{Cell, RefCell},
    time::Duration,
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    config::{EngineConfig, Viewport},
    tween::{animate, Ease, Point, Tween},
};

/// Camera position in stage space plus zoom. `zoom` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPose {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl CameraPose {
    pub const fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Scale and offset a renderer applies to the stage container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset: Point,
}

/// The session's single camera.
///
/// Animations never lock the pose: every running pan, zoom or shake writes
/// its own sample each frame, so when two overlap the latest write wins.
#[derive(Debug)]
pub struct Camera {
    pose: Cell<CameraPose>,
    viewport: Viewport,
    frame: Duration,
    shake_step: Duration,
    rng: RefCell<StdRng>,
}

impl Camera {
    pub fn new(config: &EngineConfig) -> Self {
        let rng = match config.shake_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            pose: Cell::new(CameraPose::default()),
            viewport: config.viewport,
            frame: config.timing.frame_interval(),
            shake_step: config.timing.shake_step(),
            rng: RefCell::new(rng),
        }
    }

    pub fn pose(&self) -> CameraPose {
        self.pose.get()
    }

    /// Jumps to a pose without easing. Non-positive zoom is rejected and the
    /// pose is left untouched.
    pub fn set_immediate(&self, x: f64, y: f64, zoom: f64) {
        if !valid_zoom(zoom) {
            tracing::warn!(zoom, "ignoring non-positive camera zoom");
            return;
        }
        self.pose.set(CameraPose::new(x, y, zoom));
    }

    /// Eases the position to `target`; zoom is left to whoever else writes it.
    pub async fn pan_to(&self, target: Point, duration: Duration) {
        let tween = Tween::new(self.pose.get().position(), target, duration, Ease::InOutQuad);
        animate(tween, self.frame, |position| self.set_position(position.x, position.y)).await;
    }

    pub async fn zoom_to(&self, target: f64, duration: Duration) {
        if !valid_zoom(target) {
            tracing::warn!(zoom = target, "ignoring non-positive camera zoom");
            return;
        }
        let tween = Tween::new(self.pose.get().zoom, target, duration, Ease::InOutQuad);
        animate(tween, self.frame, |zoom| {
            let mut pose = self.pose.get();
            pose.zoom = zoom;
            self.pose.set(pose);
        })
        .await;
    }

    /// Jitters the position for `ceil(duration / step)` steps, then puts back
    /// the exact x and y captured when the shake began. Zoom is never
    /// touched, so a concurrent zoom keeps its result.
    pub async fn shake(&self, intensity: f64, duration: Duration) {
        let origin = self.pose.get().position();
        let intensity = intensity.abs();
        let steps = shake_steps(duration, self.shake_step);

        for _ in 0..steps {
            let (dx, dy) = {
                let mut rng = self.rng.borrow_mut();
                (jitter(&mut *rng, intensity), jitter(&mut *rng, intensity))
            };
            self.set_position(origin.x + dx, origin.y + dy);
            tokio::time::sleep(self.shake_step).await;
        }

        self.set_position(origin.x, origin.y);
    }

    fn set_position(&self, x: f64, y: f64) {
        let mut pose = self.pose.get();
        pose.x = x;
        pose.y = y;
        self.pose.set(pose);
    }

    /// Stage transform for the current pose; zoom pivots on the viewport
    /// centre.
    pub fn view_transform(&self) -> ViewTransform {
        let pose = self.pose.get();
        let half_w = f64::from(self.viewport.width) / 2.0;
        let half_h = f64::from(self.viewport.height) / 2.0;
        ViewTransform {
            scale: pose.zoom,
            offset: Point::new(
                -pose.x * pose.zoom + half_w * (1.0 - pose.zoom),
                -pose.y * pose.zoom + half_h * (1.0 - pose.zoom),
            ),
        }
    }
}

fn valid_zoom(zoom: f64) -> bool {
    zoom.is_finite() && zoom > 0.0
}

fn shake_steps(duration: Duration, step: Duration) -> u128 {
    let step = step.as_nanos().max(1);
    duration.as_nanos().div_ceil(step)
}

/// Uniform offset in `[-intensity, intensity)`. Scaling a unit sample keeps
/// huge intensities finite where a ranged sample would overflow.
fn jitter<R: Rng>(rng: &mut R, intensity: f64) -> f64 {
    (rng.random::<f64>() * 2.0 - 1.0) * intensity
}
