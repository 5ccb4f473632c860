//! Fan aggregation over its tach sensors

use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::info;

use super::tach_sensor::TachSensor;
use super::Action;
use crate::config::{FanDefinition, MonitorMode};
use crate::types::FaultRecord;

/// Inventory path of a fan's rotor sensor
pub fn sensor_inventory_path(fan_inventory: &str, sensor: &str) -> String {
    format!("{}/{}", fan_inventory.trim_end_matches('/'), sensor)
}

/// One physical fan and the tach sensors that watch it.
///
/// The fan's functional state is derived from its sensors on every call;
/// it is never stored separately.
#[derive(Debug, Clone)]
pub struct Fan {
    name: String,
    inventory: String,
    num_sensor_fails_for_nonfunc: usize,
    sensors: Vec<TachSensor>,
}

impl Fan {
    /// Build the fan's sensors.
    ///
    /// In `init` mode each sensor starts from the functional state `seed`
    /// returns for its inventory path (functional when unknown); in
    /// `monitor` mode every sensor starts functional.
    pub fn new<F>(def: &FanDefinition, mode: MonitorMode, seed: F) -> Self
    where
        F: Fn(&str) -> Option<bool>,
    {
        let sensors = def
            .sensors
            .iter()
            .map(|s| {
                let functional = match mode {
                    MonitorMode::Monitor => true,
                    MonitorMode::Init => {
                        seed(&sensor_inventory_path(&def.inventory, &s.name)).unwrap_or(true)
                    }
                };
                TachSensor::new(s, &def.name, functional)
            })
            .collect();

        Self {
            name: def.name.clone(),
            inventory: def.inventory.clone(),
            num_sensor_fails_for_nonfunc: def.num_sensor_fails_for_nonfunc,
            sensors,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inventory(&self) -> &str {
        &self.inventory
    }

    pub fn sensors(&self) -> &[TachSensor] {
        &self.sensors
    }

    pub fn sensor_mut(&mut self, index: usize) -> Option<&mut TachSensor> {
        self.sensors.get_mut(index)
    }

    pub fn sensor_index(&self, name: &str) -> Option<usize> {
        self.sensors.iter().position(|s| s.name() == name)
    }

    /// Number of sensors currently nonfunctional
    pub fn nonfunctional_count(&self) -> usize {
        self.sensors.iter().filter(|s| !s.functional()).count()
    }

    /// Functional unless enough sensors have failed.
    ///
    /// With the default threshold of one, any failed rotor marks the whole
    /// fan nonfunctional.
    pub fn is_functional(&self) -> bool {
        self.nonfunctional_count() < self.num_sensor_fails_for_nonfunc
    }

    /// Target speed shared by the fan: the first known target of a sensor
    /// that has one
    pub fn target_speed(&self) -> Option<u64> {
        self.sensors
            .iter()
            .filter(|s| s.has_target())
            .find_map(|s| s.target())
    }

    /// Re-evaluate one sensor after its input or target changed
    pub fn process_sensor(&mut self, index: usize, now: Instant) -> Vec<Action> {
        let target = self.target_for(index);
        let Some(sensor) = self.sensors.get_mut(index) else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        if let Some(functional) = sensor.process(target, now) {
            self.functional_changed(index, functional, &mut actions);
        }
        actions
    }

    /// Record a new target for one sensor and re-evaluate the sensors it
    /// affects.
    ///
    /// Siblings with their own target are left alone. Sensors without a
    /// target are only re-evaluated when the shared target moved.
    pub fn update_target(&mut self, index: usize, target: u64, now: Instant) -> Vec<Action> {
        let previous = self.target_speed();
        let Some(sensor) = self.sensors.get_mut(index) else {
            return Vec::new();
        };
        sensor.set_target(target);

        let mut actions = self.process_sensor(index, now);
        if self.target_speed() != previous {
            for sibling in 0..self.sensors.len() {
                if sibling != index && !self.sensors[sibling].has_target() {
                    actions.extend(self.process_sensor(sibling, now));
                }
            }
        }
        actions
    }

    /// Fire expired sensor timers
    pub fn expire(&mut self, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();
        for index in 0..self.sensors.len() {
            let expiry = self.sensors[index].expire(now);
            if let Some(functional) = expiry.changed {
                self.functional_changed(index, functional, &mut actions);
            }
            if expiry.escalate {
                actions.push(Action::CreateError(self.fault_record(index)));
            }
        }
        actions
    }

    /// Earliest pending timer deadline across sensors
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sensors.iter().filter_map(|s| s.next_deadline()).min()
    }

    fn target_for(&self, index: usize) -> Option<u64> {
        let sensor = self.sensors.get(index)?;
        if sensor.has_target() {
            sensor.target()
        } else {
            self.target_speed()
        }
    }

    fn functional_changed(&self, index: usize, functional: bool, actions: &mut Vec<Action>) {
        let sensor = &self.sensors[index];
        actions.push(Action::SetSensorFunctional {
            inventory: sensor_inventory_path(&self.inventory, sensor.name()),
            functional,
        });

        let fan_functional = self.is_functional();
        info!(
            "Fan {}: {} of {} sensors nonfunctional, fan functional={}",
            self.name,
            self.nonfunctional_count(),
            self.sensors.len(),
            fan_functional
        );
        actions.push(Action::SetFanFunctional {
            inventory: self.inventory.clone(),
            functional: fan_functional,
        });
    }

    fn fault_record(&self, index: usize) -> FaultRecord {
        let sensor = &self.sensors[index];
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        FaultRecord {
            fan: self.name.clone(),
            sensor: sensor.name().to_string(),
            inventory: self.inventory.clone(),
            timestamp,
            message: format!(
                "Fan {} rotor {} out of range: input {:?}, target {:?}",
                self.name,
                sensor.name(),
                sensor.input(),
                self.target_for(index)
            ),
        }
    }
}
