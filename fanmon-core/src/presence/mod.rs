//! Fan presence detection
//!
//! A [`PresenceSensor`] answers whether a fan is installed using one
//! configured method. A [`RedundancyPolicy`] combines the sensors of one fan
//! into a single [`Presence`] verdict.
//!
//! Sensors report read failures as errors rather than "absent" so that the
//! policy can tell an unreadable sensor from a confirmed missing fan.
//!
//! Tach presence treats a nonzero speed as present. The `all` rule needs
//! every listed rotor spinning, `any` needs one of them.

mod policy;

pub use policy::{FanPresence, Presence, RedundancyPolicy};

use tracing::debug;

use crate::cache::ObjectCache;
use crate::config::{PresenceMethod, TachRule};
use crate::error::{FanMonError, Result};
use crate::types::PropertyKey;

/// Reads the current state of a digital line
///
/// Implemented by the hardware crate; tests use in-memory readers.
pub trait LineReader {
    /// Current value of the line at `devpath`
    fn read_line(&self, devpath: &str) -> Result<u32>;
}

/// Presence by tach: the fan spins, so it must be there
#[derive(Debug, Clone, PartialEq)]
pub struct TachPresence {
    sensors: Vec<String>,
    keys: Vec<PropertyKey>,
    rule: TachRule,
}

impl TachPresence {
    pub fn new(sensors: Vec<String>, rule: TachRule) -> Self {
        let keys = sensors.iter().map(|s| PropertyKey::tach_input(s)).collect();
        Self {
            sensors,
            keys,
            rule,
        }
    }

    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    fn detect(&self, cache: &ObjectCache) -> Result<bool> {
        let readings: Vec<Option<f64>> = self
            .keys
            .iter()
            .map(|key| cache.get(key).and_then(|v| v.as_f64()))
            .collect();

        match self.rule {
            TachRule::All => {
                if let Some(pos) = readings.iter().position(Option::is_none) {
                    return Err(FanMonError::SensorUnavailable(format!(
                        "tach sensor {} has no reading",
                        self.sensors[pos]
                    )));
                }
                Ok(readings.iter().flatten().all(|rpm| *rpm > 0.0))
            }
            TachRule::Any => {
                if readings.iter().flatten().any(|rpm| *rpm > 0.0) {
                    Ok(true)
                } else if readings.iter().all(Option::is_none) {
                    Err(FanMonError::SensorUnavailable(format!(
                        "no reading from tach sensors {}",
                        self.sensors.join(", ")
                    )))
                } else {
                    Ok(false)
                }
            }
        }
    }
}

/// Presence by GPIO: a presence line reads the expected key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioPresence {
    physpath: String,
    devpath: String,
    key: u32,
}

impl GpioPresence {
    pub fn new(physpath: impl Into<String>, devpath: impl Into<String>, key: u32) -> Self {
        Self {
            physpath: physpath.into(),
            devpath: devpath.into(),
            key,
        }
    }

    pub fn devpath(&self) -> &str {
        &self.devpath
    }

    fn detect<L: LineReader + ?Sized>(&self, lines: &L) -> Result<bool> {
        let value = lines.read_line(&self.devpath).map_err(|e| {
            FanMonError::SensorUnavailable(format!(
                "gpio {} ({}): {}",
                self.devpath, self.physpath, e
            ))
        })?;
        Ok(value == self.key)
    }
}

/// One configured presence detection method
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceSensor {
    Tach(TachPresence),
    Gpio(GpioPresence),
}

impl PresenceSensor {
    pub fn from_method(method: &PresenceMethod) -> Self {
        match method {
            PresenceMethod::Tach { sensors, rule } => {
                PresenceSensor::Tach(TachPresence::new(sensors.clone(), *rule))
            }
            PresenceMethod::Gpio {
                physpath,
                devpath,
                key,
            } => PresenceSensor::Gpio(GpioPresence::new(physpath, devpath, *key)),
        }
    }

    /// Whether the fan is present according to this sensor.
    ///
    /// `Err` means the sensor could not be read, not that the fan is absent.
    pub fn detect<L: LineReader + ?Sized>(&self, cache: &ObjectCache, lines: &L) -> Result<bool> {
        let result = match self {
            PresenceSensor::Tach(tach) => tach.detect(cache),
            PresenceSensor::Gpio(gpio) => gpio.detect(lines),
        };
        if let Err(ref e) = result {
            debug!("{} unavailable: {}", self.describe(), e);
        }
        result
    }

    /// Whether this sensor can currently be read
    pub fn is_available<L: LineReader + ?Sized>(&self, cache: &ObjectCache, lines: &L) -> bool {
        self.detect(cache, lines).is_ok()
    }

    /// Whether this sensor reports the fan present; unreadable counts as not present
    pub fn is_present<L: LineReader + ?Sized>(&self, cache: &ObjectCache, lines: &L) -> bool {
        self.detect(cache, lines).unwrap_or(false)
    }

    /// Cache keys this sensor reads
    pub fn watched_keys(&self) -> &[PropertyKey] {
        match self {
            PresenceSensor::Tach(tach) => &tach.keys,
            PresenceSensor::Gpio(_) => &[],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            PresenceSensor::Tach(tach) => format!("tach presence [{}]", tach.sensors.join(", ")),
            PresenceSensor::Gpio(gpio) => format!("gpio presence {}", gpio.devpath),
        }
    }
}
