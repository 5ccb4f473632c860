//! Tach sensor fault detection
//!
//! A [`TachSensor`] compares a rotor's measured speed with the speed
//! expected from the fan target and debounces the result into a
//! functional/nonfunctional verdict:
//!
//! - `timebased`: out of range continuously for `timeout` marks it nonfunctional
//! - `count`: `threshold` consecutive out of range readings mark it
//!   nonfunctional at once; any in-range reading resets the count
//!
//! Recovery always needs `func_delay` of continuous in-range readings.
//! Going nonfunctional arms the optional error timer; if the sensor is still
//! nonfunctional when it fires, the owner creates an error record.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::timer::{DebounceTimer, Timer, TimerMode};
use crate::config::{FaultMethod, TachSensorDefinition};
use crate::types::sensor_object_path;

/// Result of firing a sensor's timers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expiry {
    /// New functional state, if it changed
    pub changed: Option<bool>,
    /// The error delay elapsed while nonfunctional
    pub escalate: bool,
}

#[derive(Debug, Clone)]
pub struct TachSensor {
    name: String,
    path: String,
    fan: String,
    has_target: bool,
    factor: f64,
    offset: i64,
    method: FaultMethod,
    deviation: u8,
    func_delay: Duration,
    timeout: Duration,
    error_delay: Option<Duration>,

    functional: bool,
    counter: usize,
    input: Option<f64>,
    target: Option<u64>,
    timer: DebounceTimer,
    error_timer: Timer,
}

impl TachSensor {
    pub fn new(def: &TachSensorDefinition, fan: &str, functional: bool) -> Self {
        Self {
            name: def.name.clone(),
            path: sensor_object_path(&def.name),
            fan: fan.to_string(),
            has_target: def.has_target,
            factor: def.factor,
            offset: def.offset,
            method: def.method,
            deviation: def.deviation,
            func_delay: def.func_delay,
            timeout: def.timeout,
            error_delay: def.error_delay,
            functional,
            counter: 0,
            input: None,
            target: None,
            timer: DebounceTimer::default(),
            error_timer: Timer::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full object path, e.g. `/xyz/openbmc_project/sensors/fan_tach/fan0_0`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn functional(&self) -> bool {
        self.functional
    }

    pub fn has_target(&self) -> bool {
        self.has_target
    }

    pub fn method(&self) -> FaultMethod {
        self.method
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn input(&self) -> Option<f64> {
        self.input
    }

    pub fn target(&self) -> Option<u64> {
        self.target
    }

    pub fn set_input(&mut self, input: f64) {
        self.input = Some(input);
    }

    pub fn set_target(&mut self, target: u64) {
        self.target = Some(target);
    }

    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn timer_mode(&self) -> Option<TimerMode> {
        self.timer.mode()
    }

    pub fn error_timer_running(&self) -> bool {
        self.error_timer.is_running()
    }

    /// Delay for the given timer mode
    pub fn delay(&self, mode: TimerMode) -> Duration {
        match mode {
            TimerMode::Func => self.func_delay,
            TimerMode::Nonfunc => self.timeout,
        }
    }

    /// RPM expected for a target speed
    pub fn expected_speed(&self, target: u64) -> f64 {
        target as f64 * self.factor + self.offset as f64
    }

    /// Whether `input` deviates from the speed expected for `target` by
    /// more than the allowed percentage
    pub fn is_out_of_range(&self, input: f64, target: u64) -> bool {
        let expected = self.expected_speed(target);
        let deviation = f64::from(self.deviation);
        let min = expected * (100.0 - deviation) / 100.0;
        let max = expected * (100.0 + deviation) / 100.0;
        input < min || input > max
    }

    /// Earliest pending deadline of either timer
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.timer.deadline(), self.error_timer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Evaluate the latest input against `target`.
    ///
    /// Returns the new functional state if this reading changed it. Without
    /// an input or a target there is nothing to compare and nothing happens.
    pub fn process(&mut self, target: Option<u64>, now: Instant) -> Option<bool> {
        let (Some(input), Some(target)) = (self.input, target) else {
            return None;
        };

        if self.is_out_of_range(input, target) {
            debug!(
                "{}: input {} out of range (expected {} +/- {}%)",
                self.name,
                input,
                self.expected_speed(target),
                self.deviation
            );

            if !self.functional {
                // Recovery requires an uninterrupted in-range stretch
                self.timer.stop_mode(TimerMode::Func);
                return None;
            }

            match self.method {
                FaultMethod::Timebased => {
                    self.timer.start(TimerMode::Nonfunc, self.timeout, now);
                    None
                }
                FaultMethod::Count { threshold } => {
                    self.counter += 1;
                    if self.counter >= threshold {
                        self.counter = 0;
                        self.timer.stop();
                        self.set_functional(false, now);
                        Some(false)
                    } else {
                        None
                    }
                }
            }
        } else {
            self.counter = 0;
            if self.functional {
                self.timer.stop_mode(TimerMode::Nonfunc);
            } else {
                self.timer.start(TimerMode::Func, self.func_delay, now);
            }
            None
        }
    }

    /// Fire any timer whose deadline has passed
    pub fn expire(&mut self, now: Instant) -> Expiry {
        let mut expiry = Expiry::default();

        match self.timer.take_expired(now) {
            Some(TimerMode::Nonfunc) if self.functional => {
                self.set_functional(false, now);
                expiry.changed = Some(false);
            }
            Some(TimerMode::Func) if !self.functional => {
                self.set_functional(true, now);
                expiry.changed = Some(true);
            }
            _ => {}
        }

        if self.error_timer.take_expired(now) && !self.functional {
            warn!(
                "{}: nonfunctional longer than the error delay, escalating",
                self.name
            );
            expiry.escalate = true;
        }

        expiry
    }

    fn set_functional(&mut self, functional: bool, now: Instant) {
        self.functional = functional;

        if functional {
            info!("Fan {} sensor {} is functional again", self.fan, self.name);
            self.error_timer.stop();
        } else {
            warn!(
                "Fan {} sensor {} is nonfunctional (input {:?}, target {:?})",
                self.fan, self.name, self.input, self.target
            );
            if let Some(delay) = self.error_delay {
                if !self.error_timer.is_running() {
                    self.error_timer.start(delay, now);
                }
            }
        }
    }
}
