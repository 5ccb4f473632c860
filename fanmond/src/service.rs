//! Monitor service loop
//!
//! Runs the [`Manager`] on a single task: bus events, the earliest sensor
//! timer, the presence tick and shutdown are multiplexed with
//! `tokio::select!`, and the resulting actions are applied to the
//! inventory store and error log before the next event is taken.

use fanmon_core::api::FanListResponse;
use fanmon_core::config::MonitorMode;
use fanmon_core::presence::LineReader;
use fanmon_core::{Action, BusEvent, FaultRecord};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error_log::ErrorLog;
use crate::inventory::InventoryStore;
use crate::manager::Manager;
use crate::shutdown;

/// What the status API reads; refreshed after every loop iteration
#[derive(Debug, Clone, Default)]
pub(crate) struct MonitorSnapshot {
    pub mode: MonitorMode,
    pub sensor_count: usize,
    pub watched_properties: usize,
    pub fans: FanListResponse,
    pub errors: Vec<FaultRecord>,
}

pub(crate) type SharedSnapshot = Arc<RwLock<MonitorSnapshot>>;

pub(crate) struct MonitorService<L: LineReader> {
    manager: Manager<L>,
    inventory: InventoryStore,
    errors: ErrorLog,
    snapshot: SharedSnapshot,
}

impl<L: LineReader> MonitorService<L> {
    pub fn new(manager: Manager<L>, inventory: InventoryStore, errors: ErrorLog) -> Self {
        let snapshot = MonitorSnapshot {
            mode: manager.mode(),
            sensor_count: manager.sensor_count(),
            watched_properties: manager.watched_count(),
            fans: manager.status(),
            errors: errors.records().to_vec(),
        };
        Self {
            manager,
            inventory,
            errors,
            snapshot: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    /// Run until `shutdown` resolves or the event source closes, then
    /// flush the inventory.
    pub async fn run<F>(
        mut self,
        mut events: mpsc::Receiver<BusEvent>,
        presence_interval: Duration,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut presence_tick = tokio::time::interval(presence_interval);
        info!("Monitor running in {} mode", self.manager.mode());

        loop {
            let deadline = self.manager.next_deadline();
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let actions = tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Some(event) => self.manager.handle_event(&event, Instant::now()),
                    None => {
                        info!("Event source closed");
                        break;
                    }
                },
                _ = timer => self.manager.expire_timers(Instant::now()),
                _ = presence_tick.tick() => self.manager.evaluate_all_presence(),
            };

            self.apply(actions).await;
        }

        shutdown::flush_inventory(&mut self.inventory).await;
    }

    /// Apply engine actions, persist, and refresh the API snapshot
    async fn apply(&mut self, actions: Vec<Action>) {
        let escalated = actions
            .iter()
            .any(|action| matches!(action, Action::CreateError(_)));

        for action in actions {
            debug!("Applying {:?}", action);
            match action {
                Action::SetSensorFunctional {
                    inventory,
                    functional,
                }
                | Action::SetFanFunctional {
                    inventory,
                    functional,
                } => self.inventory.set_functional(&inventory, functional),
                Action::SetFanPresent { inventory, present } => {
                    self.inventory.set_present(&inventory, present)
                }
                Action::CreateError(record) => {
                    if let Err(e) = self.errors.append(record).await {
                        warn!("Failed to record fault: {}", e);
                    }
                }
            }
        }

        if self.inventory.is_dirty() {
            if let Err(e) = self.inventory.save().await {
                warn!("Failed to save inventory: {}", e);
            }
        }

        let mut snapshot = self.snapshot.write().await;
        snapshot.fans = self.manager.status();
        if escalated {
            snapshot.errors = self.errors.records().to_vec();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::INVENTORY_FILE;
    use fanmon_core::types::{PropertyMap, PropertyValue, SENSOR_VALUE_INTERFACE};
    use fanmon_core::{sensor_object_path, FanConfig, FanMonError, Presence, Result};
    use tempfile::TempDir;

    struct NoLines;

    impl LineReader for NoLines {
        fn read_line(&self, devpath: &str) -> Result<u32> {
            Err(FanMonError::Hardware(format!("no line {}", devpath)))
        }
    }

    const CONFIG: &str = r#"
fans:
  - name: fan0
    inventory: /system/chassis/motherboard/fan0
    sensors:
      - name: fan0_0
    presence:
      methods:
        - type: tach
          sensors: [fan0_0]
      rpolicy:
        type: anyof
"#;

    fn value_changed(rpm: f64) -> BusEvent {
        let mut changed = PropertyMap::new();
        changed.insert("Value".to_string(), PropertyValue::Double(rpm));
        BusEvent::PropertiesChanged {
            path: sensor_object_path("fan0_0"),
            interface: SENSOR_VALUE_INTERFACE.to_string(),
            changed,
        }
    }

    async fn service(dir: &TempDir) -> MonitorService<NoLines> {
        let config = FanConfig::from_yaml(CONFIG).unwrap();
        let manager = Manager::new(&config, MonitorMode::Monitor, NoLines, |_| None);
        let inventory = InventoryStore::load(dir.path()).await.unwrap();
        let errors = ErrorLog::load(dir.path()).await.unwrap();
        MonitorService::new(manager, inventory, errors)
    }

    #[tokio::test]
    async fn test_events_update_snapshot_and_inventory() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;
        let snapshot = service.snapshot();
        assert_eq!(snapshot.read().await.sensor_count, 1);

        let (tx, rx) = mpsc::channel(8);
        tx.send(value_changed(4200.0)).await.unwrap();
        drop(tx);

        service
            .run(rx, Duration::from_secs(3600), std::future::pending())
            .await;

        let snapshot = snapshot.read().await;
        assert_eq!(snapshot.fans.fans[0].presence, Presence::Present);
        assert_eq!(snapshot.fans.fans[0].sensors[0].input, Some(4200.0));

        let reloaded = InventoryStore::load(temp_dir.path()).await.unwrap();
        assert_eq!(
            reloaded.get("/system/chassis/motherboard/fan0").unwrap().present,
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(&temp_dir).await;
        let (_tx, rx) = mpsc::channel::<BusEvent>(1);

        tokio::time::timeout(
            Duration::from_secs(2),
            service.run(rx, Duration::from_secs(3600), async {}),
        )
        .await
        .unwrap();

        // Nothing published, nothing to flush
        assert!(!temp_dir.path().join(INVENTORY_FILE).exists());
    }
}
