// src/exam/timer.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock source for the attempt timer. Injected so the lifecycle can be
/// driven deterministically in tests; production uses `SystemClock`.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Countdown clock for one attempt.
///
/// Driven by a once-per-second tick, but the remaining time is always
/// computed from elapsed wall-clock time, never from accumulated tick
/// counts: if the process is suspended and ticks are missed, the next tick
/// catches up instead of under-counting. The `Expired` signal fires exactly
/// once.
pub struct AttemptTimer {
    clock: Arc<dyn Clock>,
    duration: Duration,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    expired_fired: bool,
}

impl AttemptTimer {
    pub fn new(duration_seconds: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            duration: Duration::from_secs(duration_seconds),
            started_at: None,
            stopped_at: None,
            expired_fired: false,
        }
    }

    /// Starts the countdown. Starting an already-running timer is a no-op.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now());
        }
    }

    /// Freezes the countdown. Stopping an already-stopped (or never-started)
    /// timer is a no-op, including after expiry has fired.
    pub fn stop(&mut self) {
        if self.started_at.is_some() && self.stopped_at.is_none() {
            self.stopped_at = Some(self.clock.now());
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    fn elapsed(&self) -> Duration {
        match self.started_at {
            None => Duration::ZERO,
            Some(started) => {
                let end = self.stopped_at.unwrap_or_else(|| self.clock.now());
                end.duration_since(started)
            }
        }
    }

    /// Seconds left on the clock. Full duration before start, frozen after
    /// stop.
    pub fn remaining(&self) -> u64 {
        self.duration.saturating_sub(self.elapsed()).as_secs()
    }

    /// Seconds actually spent, capped at the test duration.
    pub fn time_taken(&self) -> u64 {
        self.elapsed().min(self.duration).as_secs()
    }

    /// Advances the timer by one observation. Returns true exactly once,
    /// when the remaining time has reached zero.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() || self.expired_fired {
            return false;
        }
        if self.remaining() == 0 {
            self.expired_fired = true;
            self.stop();
            return true;
        }
        false
    }
}

#[cfg(test)]
pub mod testing {
    use super::Clock;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Manually advanced clock for deterministic lifecycle tests.
    pub struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        pub fn advance(&self, seconds: u64) {
            *self.offset.lock().unwrap() += Duration::from_secs(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }
}
