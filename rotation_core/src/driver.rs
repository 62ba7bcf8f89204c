//! Wall-clock driving of a session

use crate::engine::Engine;
use crate::error::EngineError;
use crate::session::Session;
use crate::types::EPSILON;
use std::time::{Duration, Instant};

/// Feeds scaled real time into a session
///
/// Call [`RealTimeDriver::frame`] from whatever loop owns the clock.
#[derive(Debug, Clone)]
pub struct RealTimeDriver {
    time_scale: f64,
    /// Stop advancing as soon as any skill can be used
    pause_when_ready: bool,
    last_frame: Option<Instant>,
}

impl RealTimeDriver {
    pub fn new(time_scale: f64) -> Self {
        RealTimeDriver {
            time_scale: time_scale.max(0.0),
            pause_when_ready: false,
            last_frame: None,
        }
    }

    pub fn with_pause_when_ready(mut self, pause: bool) -> Self {
        self.pause_when_ready = pause;
        self
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.time_scale = time_scale.max(0.0);
    }

    /// Advance the session by `elapsed` real time; returns simulated seconds
    pub fn frame(&mut self, elapsed: Duration, session: &mut Session) -> Result<f64, EngineError> {
        let delta = elapsed.as_secs_f64() * self.time_scale;
        if self.pause_when_ready {
            session.tick_until(delta, &any_skill_usable)
        } else {
            session.tick(delta)
        }
    }

    /// Advance by the real time since the previous call
    pub fn frame_at(&mut self, now: Instant, session: &mut Session) -> Result<f64, EngineError> {
        let elapsed = self
            .last_frame
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_frame = Some(now);
        self.frame(elapsed, session)
    }

    /// Forget the previous frame, e.g. after the user paused the loop
    pub fn reset(&mut self) {
        self.last_frame = None;
    }
}

fn any_skill_usable(engine: &Engine) -> bool {
    engine
        .time_till_any_skill_available()
        .map(|t| t <= EPSILON)
        .unwrap_or(false)
}
