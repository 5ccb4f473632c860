//! Monitor manager
//!
//! Owns the object cache, the watch registry and the fan/presence object
//! graph. Every bus event and timer expiry is applied here synchronously;
//! the caller runs it from a single task so nothing in here is shared.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use fanmon_core::api::{FanListResponse, FanStatus, SensorStatus};
use fanmon_core::config::{FanConfig, MonitorMode};
use fanmon_core::monitor::{Action, Fan, SensorId};
use fanmon_core::presence::{FanPresence, LineReader, Presence};
use fanmon_core::{signal, BusEvent, ObjectCache, PropertyKey};
use tracing::{debug, info, warn};

/// Who is re-evaluated when a watched property changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subscriber {
    /// A rotor's measured speed
    TachInput(SensorId),
    /// A rotor's target speed; every sensor of the fan may use it
    TachTarget(SensorId),
    /// Presence policy of the fan at this index
    Presence(usize),
}

pub(crate) struct Manager<L: LineReader> {
    mode: MonitorMode,
    cache: ObjectCache,
    /// Registered (path, interface, property) entries
    watches: Vec<PropertyKey>,
    /// Object path -> indices into `watches`
    by_path: HashMap<String, Vec<usize>>,
    /// Per watch index
    subscribers: Vec<Vec<Subscriber>>,
    fans: Vec<Fan>,
    presence: Vec<FanPresence>,
    /// Last verdict published per fan
    published: Vec<Option<Presence>>,
    lines: L,
}

impl<L: LineReader> Manager<L> {
    /// Build the object graph from validated configuration.
    ///
    /// `seed` returns the inventory's current functional flag for an
    /// inventory path; it is consulted only in `init` mode.
    pub fn new<F>(config: &FanConfig, mode: MonitorMode, lines: L, seed: F) -> Self
    where
        F: Fn(&str) -> Option<bool>,
    {
        let mut manager = Self {
            mode,
            cache: ObjectCache::new(),
            watches: Vec::new(),
            by_path: HashMap::new(),
            subscribers: Vec::new(),
            fans: Vec::with_capacity(config.fans.len()),
            presence: Vec::with_capacity(config.fans.len()),
            published: vec![None; config.fans.len()],
            lines,
        };

        for (fan_index, def) in config.fans.iter().enumerate() {
            for (sensor_index, sensor) in def.sensors.iter().enumerate() {
                let id = SensorId {
                    fan: fan_index,
                    sensor: sensor_index,
                };
                manager.watch(
                    PropertyKey::tach_input(&sensor.name),
                    Subscriber::TachInput(id),
                );
                if sensor.has_target {
                    manager.watch(
                        PropertyKey::tach_target(&sensor.name, &sensor.target_interface),
                        Subscriber::TachTarget(id),
                    );
                }
            }

            let presence = FanPresence::from_definition(def);
            for sensor in presence.sensors() {
                for key in sensor.watched_keys() {
                    manager.watch(key.clone(), Subscriber::Presence(fan_index));
                }
            }

            manager.fans.push(Fan::new(def, mode, &seed));
            manager.presence.push(presence);
        }

        info!(
            "Monitoring {} fans, {} tach sensors, {} watched properties",
            manager.fans.len(),
            manager.sensor_count(),
            manager.watches.len()
        );
        manager
    }

    fn watch(&mut self, key: PropertyKey, subscriber: Subscriber) {
        let index = match self.watches.iter().position(|k| *k == key) {
            Some(index) => index,
            None => {
                self.by_path
                    .entry(key.path.clone())
                    .or_default()
                    .push(self.watches.len());
                self.watches.push(key);
                self.subscribers.push(Vec::new());
                self.watches.len() - 1
            }
        };
        if !self.subscribers[index].contains(&subscriber) {
            self.subscribers[index].push(subscriber);
        }
    }

    pub fn mode(&self) -> MonitorMode {
        self.mode
    }

    pub fn watched_count(&self) -> usize {
        self.watches.len()
    }

    pub fn sensor_count(&self) -> usize {
        self.fans.iter().map(|f| f.sensors().len()).sum()
    }

    /// Apply one bus event.
    ///
    /// Events for objects nobody watches are ignored without logging.
    pub fn handle_event(&mut self, event: &BusEvent, now: Instant) -> Vec<Action> {
        let Some(candidates) = self.by_path.get(event.path()).cloned() else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        let mut dirty_presence = BTreeSet::new();

        for index in candidates {
            if !signal::dispatch(event, &self.watches[index], &mut self.cache) {
                continue;
            }
            debug!("Cache updated: {}", self.watches[index]);

            let value = self.cache.get(&self.watches[index]).cloned();
            for subscriber in self.subscribers[index].clone() {
                match subscriber {
                    Subscriber::TachInput(id) => {
                        let Some(input) = value.as_ref().and_then(|v| v.as_f64()) else {
                            warn!("Non-numeric tach input at {}", self.watches[index]);
                            continue;
                        };
                        let fan = &mut self.fans[id.fan];
                        if let Some(sensor) = fan.sensor_mut(id.sensor) {
                            sensor.set_input(input);
                        }
                        actions.extend(fan.process_sensor(id.sensor, now));
                    }
                    Subscriber::TachTarget(id) => {
                        let Some(target) = value.as_ref().and_then(|v| v.as_u64()) else {
                            warn!("Invalid tach target at {}", self.watches[index]);
                            continue;
                        };
                        actions.extend(self.fans[id.fan].update_target(id.sensor, target, now));
                    }
                    Subscriber::Presence(fan) => {
                        dirty_presence.insert(fan);
                    }
                }
            }
        }

        for fan in dirty_presence {
            actions.extend(self.evaluate_presence(fan));
        }
        actions
    }

    /// Re-run one fan's presence policy; returns an action when the verdict changed
    pub fn evaluate_presence(&mut self, index: usize) -> Option<Action> {
        let presence = self.presence.get(index)?;
        let verdict = presence.evaluate(&self.cache, &self.lines);
        if self.published[index] == Some(verdict) {
            return None;
        }

        match verdict {
            Presence::Present => info!("Fan {} is present", presence.name()),
            Presence::Absent => warn!("Fan {} is missing", presence.name()),
            Presence::Indeterminate => warn!(
                "Fan {} presence cannot be determined: no presence sensor is readable",
                presence.name()
            ),
        }
        self.published[index] = Some(verdict);

        verdict.as_bool().map(|present| Action::SetFanPresent {
            inventory: presence.inventory().to_string(),
            present,
        })
    }

    /// Re-run every fan's presence policy
    pub fn evaluate_all_presence(&mut self) -> Vec<Action> {
        (0..self.presence.len())
            .filter_map(|index| self.evaluate_presence(index))
            .collect()
    }

    /// Earliest pending sensor timer
    pub fn next_deadline(&self) -> Option<Instant> {
        self.fans.iter().filter_map(|f| f.next_deadline()).min()
    }

    /// Fire every timer due at `now`
    pub fn expire_timers(&mut self, now: Instant) -> Vec<Action> {
        self.fans.iter_mut().flat_map(|f| f.expire(now)).collect()
    }

    /// Current state of every fan
    pub fn status(&self) -> FanListResponse {
        let fans = self
            .fans
            .iter()
            .zip(&self.published)
            .map(|(fan, presence)| FanStatus {
                name: fan.name().to_string(),
                inventory: fan.inventory().to_string(),
                presence: presence.unwrap_or(Presence::Indeterminate),
                functional: fan.is_functional(),
                sensors: fan
                    .sensors()
                    .iter()
                    .map(|s| SensorStatus {
                        name: s.name().to_string(),
                        functional: s.functional(),
                        input: s.input(),
                        target: s.target(),
                        fault_count: s.counter(),
                    })
                    .collect(),
            })
            .collect();
        FanListResponse { fans }
    }
}
