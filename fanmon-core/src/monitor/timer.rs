//! Monotonic one-shot timers driven by the owner's event loop
//!
//! Timers only record a deadline. The loop owning them asks for the earliest
//! deadline, waits for it, and then calls `take_expired` with the current
//! instant. Stopping is idempotent.

use std::time::{Duration, Instant};

/// What a debounce timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Mark the sensor functional
    Func,
    /// Mark the sensor nonfunctional
    Nonfunc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    /// Arm the timer to fire `delay` after `now`, replacing any pending deadline
    pub fn start(&mut self, delay: Duration, now: Instant) {
        self.deadline = Some(now + delay);
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and report `true` if the deadline has passed
    pub fn take_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Timer that runs in exactly one [`TimerMode`] at a time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceTimer {
    timer: Timer,
    mode: Option<TimerMode>,
}

impl DebounceTimer {
    /// Start in `mode`.
    ///
    /// A timer already running in `mode` keeps its deadline; one running in
    /// the other mode is replaced. Returns whether the timer was (re)armed.
    pub fn start(&mut self, mode: TimerMode, delay: Duration, now: Instant) -> bool {
        if self.mode == Some(mode) && self.timer.is_running() {
            return false;
        }
        self.timer.start(delay, now);
        self.mode = Some(mode);
        true
    }

    pub fn stop(&mut self) {
        self.timer.stop();
        self.mode = None;
    }

    /// Stop only if running in `mode`
    pub fn stop_mode(&mut self, mode: TimerMode) {
        if self.mode == Some(mode) {
            self.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Mode of the running timer
    pub fn mode(&self) -> Option<TimerMode> {
        self.mode
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Disarm and return the mode if the deadline has passed
    pub fn take_expired(&mut self, now: Instant) -> Option<TimerMode> {
        if self.timer.take_expired(now) {
            self.mode.take()
        } else {
            None
        }
    }
}
