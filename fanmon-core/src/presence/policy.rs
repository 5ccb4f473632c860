//! Redundancy policies combining a fan's presence sensors

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LineReader, PresenceSensor};
use crate::cache::ObjectCache;
use crate::config::{FanDefinition, PolicyKind};

/// Aggregate presence verdict for one fan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Absent,
    /// No sensor could be read
    Indeterminate,
}

impl Presence {
    /// Inventory value for this verdict; indeterminate is not published
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Presence::Present => Some(true),
            Presence::Absent => Some(false),
            Presence::Indeterminate => None,
        }
    }
}

/// Voting rule over an ordered list of presence sensors.
///
/// Verdicts are recomputed from the sensors on every evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundancyPolicy {
    fan: String,
    kind: PolicyKind,
}

impl RedundancyPolicy {
    pub fn new(fan: impl Into<String>, kind: PolicyKind) -> Self {
        Self {
            fan: fan.into(),
            kind,
        }
    }

    pub fn fan(&self) -> &str {
        &self.fan
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn evaluate<L: LineReader + ?Sized>(
        &self,
        sensors: &[PresenceSensor],
        cache: &ObjectCache,
        lines: &L,
    ) -> Presence {
        match self.kind {
            PolicyKind::AnyOf => self.any_of(sensors, cache, lines),
            PolicyKind::Fallback => self.fallback(sensors, cache, lines),
        }
    }

    /// Present if any sensor says so
    fn any_of<L: LineReader + ?Sized>(
        &self,
        sensors: &[PresenceSensor],
        cache: &ObjectCache,
        lines: &L,
    ) -> Presence {
        let mut available = false;
        for sensor in sensors {
            match sensor.detect(cache, lines) {
                Ok(true) => return Presence::Present,
                Ok(false) => available = true,
                Err(_) => {}
            }
        }

        if available {
            Presence::Absent
        } else {
            Presence::Indeterminate
        }
    }

    /// The first readable sensor, in configured order, decides
    fn fallback<L: LineReader + ?Sized>(
        &self,
        sensors: &[PresenceSensor],
        cache: &ObjectCache,
        lines: &L,
    ) -> Presence {
        for (pos, sensor) in sensors.iter().enumerate() {
            if let Ok(present) = sensor.detect(cache, lines) {
                if pos > 0 {
                    debug!(
                        "Fan {}: falling back to {} (method {})",
                        self.fan,
                        sensor.describe(),
                        pos
                    );
                }
                return if present {
                    Presence::Present
                } else {
                    Presence::Absent
                };
            }
        }
        Presence::Indeterminate
    }
}

/// Presence sensors of one fan together with the policy that votes on them
#[derive(Debug, Clone)]
pub struct FanPresence {
    inventory: String,
    sensors: Vec<PresenceSensor>,
    policy: RedundancyPolicy,
}

impl FanPresence {
    pub fn from_definition(fan: &FanDefinition) -> Self {
        let sensors = fan
            .presence
            .methods
            .iter()
            .map(PresenceSensor::from_method)
            .collect();
        Self {
            inventory: fan.inventory.clone(),
            sensors,
            policy: RedundancyPolicy::new(&fan.name, fan.presence.policy),
        }
    }

    pub fn name(&self) -> &str {
        self.policy.fan()
    }

    pub fn inventory(&self) -> &str {
        &self.inventory
    }

    pub fn sensors(&self) -> &[PresenceSensor] {
        &self.sensors
    }

    pub fn policy(&self) -> &RedundancyPolicy {
        &self.policy
    }

    pub fn evaluate<L: LineReader + ?Sized>(&self, cache: &ObjectCache, lines: &L) -> Presence {
        self.policy.evaluate(&self.sensors, cache, lines)
    }
}
