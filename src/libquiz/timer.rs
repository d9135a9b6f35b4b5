use crate::libquiz::model::DEFAULT_TIME;
use std::time::Duration;

pub const TICK: Duration = Duration::from_millis(200);
const TICKS_PER_SECOND: u32 = 5;
/// Longest countdown, one day. Larger limits are clamped to it.
pub const MAX_TIME_LIMIT: u32 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerUpdate {
    pub seconds_ceil: u32,
    pub fraction: f64,
}

#[derive(Debug, PartialEq)]
pub enum Tick {
    Idle,
    Running(TimerUpdate),
    Expired(TimerUpdate),
}

/// Fixed-step countdown. Every tick removes 0.2s regardless of how late it fires;
/// remaining time is kept as whole ticks so expiry lands on an exact tick.
#[derive(Debug, Default)]
pub struct Countdown {
    limit: u32,
    ticks_left: u32,
    running: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, limit_seconds: f64) -> TimerUpdate {
        let limit = if limit_seconds.is_finite() && limit_seconds != 0.0 {
            limit_seconds
        } else {
            DEFAULT_TIME
        };
        self.limit = limit.floor().clamp(1.0, MAX_TIME_LIMIT as f64) as u32;
        self.ticks_left = self.limit * TICKS_PER_SECOND;
        self.running = true;
        self.update()
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        self.ticks_left = self.ticks_left.saturating_sub(1);
        if self.ticks_left == 0 {
            self.running = false;
            Tick::Expired(self.update())
        } else {
            Tick::Running(self.update())
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Clamped limit in whole seconds; zero before the first start.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn time_left(&self) -> f64 {
        self.ticks_left as f64 / TICKS_PER_SECOND as f64
    }

    pub fn update(&self) -> TimerUpdate {
        let total = self.limit * TICKS_PER_SECOND;
        let fraction = if total == 0 {
            0.0
        } else {
            (self.ticks_left as f64 / total as f64).clamp(0.0, 1.0)
        };
        TimerUpdate {
            seconds_ceil: self.ticks_left.div_ceil(TICKS_PER_SECOND),
            fraction,
        }
    }
}
