//! Linear opacity interpolation shared by the screen manager and the screens.

use std::time::Duration;

pub const OPAQUE: f32 = 1.0;
pub const TRANSPARENT: f32 = 0.0;

/// Opacity after `elapsed` of a linear fade from `start` to `target` over `duration`.
///
/// The result is clamped to `[0, 1]` and equals `target` exactly once
/// `elapsed >= duration`. A zero duration yields `target` immediately.
pub fn fade_value(start: f32, target: f32, elapsed: Duration, duration: Duration) -> f32 {
    let start = clamp_opacity(start);
    let target = clamp_opacity(target);
    if duration.is_zero() || elapsed >= duration {
        return target;
    }
    let t = (elapsed.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0);
    clamp_opacity(start + (target - start) * t)
}

fn clamp_opacity(value: f32) -> f32 {
    if value.is_nan() {
        return TRANSPARENT;
    }
    value.clamp(TRANSPARENT, OPAQUE)
}

/// Transient state of one running fade.
///
/// Created when a fade starts and dropped once [`Fade::is_complete`] reports true.
#[derive(Debug, Clone, PartialEq)]
pub struct Fade {
    start: f32,
    target: f32,
    elapsed: Duration,
    duration: Duration,
}

impl Fade {
    pub fn new(start: f32, target: f32, duration: Duration) -> Self {
        Self {
            start: clamp_opacity(start),
            target: clamp_opacity(target),
            elapsed: Duration::ZERO,
            duration,
        }
    }

    pub fn fade_in(start: f32, duration: Duration) -> Self {
        Self::new(start, OPAQUE, duration)
    }

    pub fn fade_out(start: f32, duration: Duration) -> Self {
        Self::new(start, TRANSPARENT, duration)
    }

    /// Advances the fade by `dt` and returns the new opacity.
    pub fn step(&mut self, dt: Duration) -> f32 {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        self.opacity()
    }

    pub fn opacity(&self) -> f32 {
        if self.already_at_target() {
            return self.target;
        }
        fade_value(self.start, self.target, self.elapsed, self.duration)
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// A fade that starts at its target resolves without waiting.
    pub fn is_complete(&self) -> bool {
        self.already_at_target() || self.elapsed >= self.duration
    }

    fn already_at_target(&self) -> bool {
        (self.start - self.target).abs() <= f32::EPSILON
    }
}

/// Outcome of advancing a screen-level fade by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStatus {
    Running,
    Complete,
}
