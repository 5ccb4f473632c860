//! hwmon poller
//!
//! Stands in for the sensor daemon on the bus: reads each bound tach
//! sensor's input and target attributes and publishes the results as bus
//! events. An object is announced with `InterfacesAdded` on its first
//! successful read; afterwards only changed values are published, as
//! `PropertiesChanged`.

use fanmon_core::types::{InterfaceMap, PropertyMap, PropertyValue};
use fanmon_core::{sensor_object_path, BusEvent, FanConfig, PropertyKey};
use fanmon_hardware::TachSource;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where one tach sensor's attributes live
#[derive(Debug, Clone, PartialEq)]
struct Binding {
    object_path: String,
    input: (PathBuf, PropertyKey),
    target: Option<(PathBuf, PropertyKey)>,
}

pub(crate) struct Poller<S: TachSource> {
    source: S,
    bindings: Vec<Binding>,
    announced: HashSet<String>,
    last: HashMap<PropertyKey, PropertyValue>,
}

impl<S: TachSource> Poller<S> {
    /// Bind every sensor that names an `input` attribute
    pub fn new(source: S, config: &FanConfig) -> Self {
        let bindings: Vec<Binding> = config
            .fans
            .iter()
            .flat_map(|fan| fan.sensors.iter())
            .filter_map(|sensor| {
                let binding = sensor.binding.as_ref()?;
                let target = match (&binding.target, sensor.has_target) {
                    (Some(path), true) => Some((
                        path.clone(),
                        PropertyKey::tach_target(&sensor.name, &sensor.target_interface),
                    )),
                    (Some(_), false) => {
                        warn!(
                            "Sensor {} has a target attribute but no target, ignoring it",
                            sensor.name
                        );
                        None
                    }
                    (None, _) => None,
                };
                Some(Binding {
                    object_path: sensor_object_path(&sensor.name),
                    input: (binding.input.clone(), PropertyKey::tach_input(&sensor.name)),
                    target,
                })
            })
            .collect();

        info!("Polling {} hwmon bound tach sensors", bindings.len());
        Self {
            source,
            bindings,
            announced: HashSet::new(),
            last: HashMap::new(),
        }
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Read every binding once and return the events to publish
    pub async fn poll_once(&mut self) -> Vec<BusEvent> {
        let mut events = Vec::new();

        for binding in &self.bindings {
            let mut readings = Vec::with_capacity(2);

            let (path, key) = &binding.input;
            match self.source.read_value(path).await {
                Ok(rpm) => readings.push((key.clone(), PropertyValue::Double(rpm))),
                Err(e) => debug!("{}: {}", binding.object_path, e),
            }

            if let Some((path, key)) = &binding.target {
                match self.source.read_value(path).await {
                    Ok(target) if target >= 0.0 => {
                        readings.push((key.clone(), PropertyValue::UInt(target.round() as u64)))
                    }
                    Ok(target) => warn!("{}: negative target {}", binding.object_path, target),
                    Err(e) => debug!("{}: {}", binding.object_path, e),
                }
            }

            if readings.is_empty() {
                continue;
            }

            let first = self.announced.insert(binding.object_path.clone());
            events.extend(publish(
                &binding.object_path,
                readings,
                first,
                &mut self.last,
            ));
        }

        events
    }

    /// Poll on `interval` until the receiving side goes away
    pub async fn run(mut self, tx: mpsc::Sender<BusEvent>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for event in self.poll_once().await {
                if tx.send(event).await.is_err() {
                    debug!("Event receiver closed, poller exiting");
                    return;
                }
            }
        }
    }
}

/// Turn one object's readings into events, updating `last`
fn publish(
    object_path: &str,
    readings: Vec<(PropertyKey, PropertyValue)>,
    first: bool,
    last: &mut HashMap<PropertyKey, PropertyValue>,
) -> Vec<BusEvent> {
    let mut by_interface: BTreeMap<String, PropertyMap> = BTreeMap::new();
    for (key, value) in readings {
        if !first && last.get(&key) == Some(&value) {
            continue;
        }
        by_interface
            .entry(key.interface.clone())
            .or_default()
            .insert(key.property.clone(), value.clone());
        last.insert(key, value);
    }

    if first {
        let interfaces: InterfaceMap = by_interface.into_iter().collect();
        return vec![BusEvent::InterfacesAdded {
            path: object_path.to_string(),
            interfaces,
        }];
    }

    by_interface
        .into_iter()
        .map(|(interface, changed)| BusEvent::PropertiesChanged {
            path: object_path.to_string(),
            interface,
            changed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fanmon_core::types::{DEFAULT_TARGET_INTERFACE, SENSOR_VALUE_INTERFACE};
    use fanmon_core::{FanMonError, Result};
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct MockTach {
        values: Arc<Mutex<HashMap<PathBuf, f64>>>,
    }

    impl MockTach {
        fn set(&self, path: &str, value: f64) {
            self.values
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), value);
        }
    }

    #[async_trait]
    impl TachSource for MockTach {
        async fn read_value(&self, path: &Path) -> Result<f64> {
            self.values
                .lock()
                .unwrap()
                .get(path)
                .copied()
                .ok_or_else(|| FanMonError::Hardware(format!("no attribute {}", path.display())))
        }
    }

    const CONFIG: &str = r#"
fans:
  - name: fan0
    inventory: /system/chassis/motherboard/fan0
    sensors:
      - name: fan0_0
        has_target: true
        input: /hwmon/fan1_input
        target: /hwmon/fan1_target
      - name: fan0_1
    presence:
      methods:
        - type: tach
          sensors: [fan0_0]
      rpolicy:
        type: anyof
"#;

    fn poller(tach: &MockTach) -> Poller<MockTach> {
        Poller::new(tach.clone(), &FanConfig::from_yaml(CONFIG).unwrap())
    }

    #[tokio::test]
    async fn test_only_bound_sensors_are_polled() {
        let tach = MockTach::default();
        assert_eq!(poller(&tach).binding_count(), 1);
    }

    #[tokio::test]
    async fn test_first_read_announces_object() {
        let tach = MockTach::default();
        tach.set("/hwmon/fan1_input", 4800.0);
        tach.set("/hwmon/fan1_target", 5000.0);
        let mut poller = poller(&tach);

        let events = poller.poll_once().await;
        assert_eq!(events.len(), 1);
        let BusEvent::InterfacesAdded { path, interfaces } = &events[0] else {
            panic!("expected InterfacesAdded, got {:?}", events[0]);
        };
        assert_eq!(path, &sensor_object_path("fan0_0"));
        assert_eq!(
            interfaces[SENSOR_VALUE_INTERFACE]["Value"],
            PropertyValue::Double(4800.0)
        );
        assert_eq!(
            interfaces[DEFAULT_TARGET_INTERFACE]["Target"],
            PropertyValue::UInt(5000)
        );
    }

    #[tokio::test]
    async fn test_only_changes_are_published() {
        let tach = MockTach::default();
        tach.set("/hwmon/fan1_input", 4800.0);
        tach.set("/hwmon/fan1_target", 5000.0);
        let mut poller = poller(&tach);
        poller.poll_once().await;

        assert!(poller.poll_once().await.is_empty());

        tach.set("/hwmon/fan1_input", 2100.0);
        let events = poller.poll_once().await;
        assert_eq!(events.len(), 1);
        let BusEvent::PropertiesChanged {
            interface, changed, ..
        } = &events[0]
        else {
            panic!("expected PropertiesChanged, got {:?}", events[0]);
        };
        assert_eq!(interface, SENSOR_VALUE_INTERFACE);
        assert_eq!(changed["Value"], PropertyValue::Double(2100.0));
    }

    #[tokio::test]
    async fn test_unreadable_object_is_not_announced() {
        let tach = MockTach::default();
        let mut poller = poller(&tach);
        assert!(poller.poll_once().await.is_empty());

        tach.set("/hwmon/fan1_input", 100.0);
        let events = poller.poll_once().await;
        assert!(matches!(events.as_slice(), [BusEvent::InterfacesAdded { .. }]));
    }

    #[tokio::test]
    async fn test_run_stops_when_receiver_dropped() {
        let tach = MockTach::default();
        tach.set("/hwmon/fan1_input", 100.0);
        let poller = poller(&tach);

        let (tx, mut rx) = mpsc::channel(4);
        let handle = tokio::spawn(poller.run(tx, Duration::from_millis(5)));

        assert!(matches!(
            rx.recv().await,
            Some(BusEvent::InterfacesAdded { .. })
        ));
        drop(rx);
        tach.set("/hwmon/fan1_input", 200.0);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
