use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Easing curves. `InOutQuad` matches the classic "power2" family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
        }
    }
}

/// Stage-space position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Linear interpolation between two values of the same type.
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(self, to: Self, t: f64) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Point {
    fn lerp(self, to: Self, t: f64) -> Self {
        Point::new(self.x.lerp(to.x, t), self.y.lerp(to.y, t))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween<T> {
    pub from: T,
    pub to: T,
    pub duration: Duration,
    pub ease: Ease,
}

impl<T: Lerp> Tween<T> {
    pub fn new(from: T, to: T, duration: Duration, ease: Ease) -> Self {
        Self {
            from,
            to,
            duration,
            ease,
        }
    }

    /// Linear progress in `[0, 1]` after `elapsed`.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    pub fn is_settled(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    /// Eased value after `elapsed`. Once settled this is `to` exactly, never a
    /// rounded interpolation of it.
    pub fn sample(&self, elapsed: Duration) -> T {
        if self.is_settled(elapsed) {
            return self.to;
        }
        self.from.lerp(self.to, self.ease.apply(self.progress(elapsed)))
    }
}

/// Runs `tween` on the tokio clock, calling `apply` once per frame and a final
/// time with the settled value. Sleeps are capped at the remaining time so the
/// animation settles at its nominal duration.
pub async fn animate<T, F>(tween: Tween<T>, frame: Duration, mut apply: F)
where
    T: Lerp,
    F: FnMut(T),
{
    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        apply(tween.sample(elapsed));
        if tween.is_settled(elapsed) {
            return;
        }
        let remaining = tween.duration - elapsed;
        tokio::time::sleep(frame.min(remaining)).await;
    }
}

/// Converts a document millisecond value into a [`Duration`]. Negative and
/// non-finite inputs collapse to zero.
pub fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_nanos((ms * 1_000_000.0).round() as u64)
    } else {
        Duration::ZERO
    }
}

/// Elapsed time as fractional milliseconds.
pub fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
