//! Inventory store
//!
//! Holds the `Present` and `Functional` flags the monitor publishes for
//! each inventory object. The snapshot is persisted as JSON in the data
//! directory so that `init` mode can seed sensor state on the next start.

use fanmon_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File name of the snapshot inside the data directory
pub(crate) const INVENTORY_FILE: &str = "inventory.json";

/// Flags published for one inventory object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct InventoryItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functional: Option<bool>,
}

pub(crate) struct InventoryStore {
    path: PathBuf,
    items: BTreeMap<String, InventoryItem>,
    dirty: bool,
}

impl InventoryStore {
    /// Load the snapshot from `data_dir`, starting empty if there is none
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(INVENTORY_FILE);

        let items = if path.exists() {
            let content = fs::read_to_string(&path).await?;
            let items: BTreeMap<String, InventoryItem> = serde_json::from_str(&content)?;
            info!(
                "Loaded {} inventory objects from {}",
                items.len(),
                path.display()
            );
            items
        } else {
            debug!("No inventory snapshot at {}", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path,
            items,
            dirty: false,
        })
    }

    pub fn get(&self, inventory: &str) -> Option<InventoryItem> {
        self.items.get(inventory).copied()
    }

    /// Last published functional flag of an inventory object
    pub fn functional(&self, inventory: &str) -> Option<bool> {
        self.items.get(inventory).and_then(|item| item.functional)
    }

    pub fn set_functional(&mut self, inventory: &str, functional: bool) {
        let item = self.items.entry(inventory.to_string()).or_default();
        if item.functional != Some(functional) {
            item.functional = Some(functional);
            self.dirty = true;
        }
    }

    pub fn set_present(&mut self, inventory: &str, present: bool) {
        let item = self.items.entry(inventory.to_string()).or_default();
        if item.present != Some(present) {
            item.present = Some(present);
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the snapshot if anything changed since the last save.
    ///
    /// Written to a temp file first and renamed into place.
    pub async fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&self.items)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, &self.path).await?;

        self.dirty = false;
        debug!("Inventory saved to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanmon_core::FanMonError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = InventoryStore::load(temp_dir.path()).await.unwrap();
        assert!(store.get("/system/chassis/motherboard/fan0").is_none());
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_set_and_persist() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = InventoryStore::load(temp_dir.path()).await.unwrap();

        store.set_present("/system/chassis/motherboard/fan0", true);
        store.set_functional("/system/chassis/motherboard/fan0/fan0_0", false);
        assert!(store.is_dirty());
        store.save().await.unwrap();
        assert!(!store.is_dirty());
        assert!(temp_dir.path().join(INVENTORY_FILE).exists());

        let reloaded = InventoryStore::load(temp_dir.path()).await.unwrap();
        assert_eq!(
            reloaded.get("/system/chassis/motherboard/fan0"),
            Some(InventoryItem {
                present: Some(true),
                functional: None,
            })
        );
        assert_eq!(
            reloaded.functional("/system/chassis/motherboard/fan0/fan0_0"),
            Some(false)
        );
    }

    #[tokio::test]
    async fn test_unchanged_value_is_not_dirty() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = InventoryStore::load(temp_dir.path()).await.unwrap();
        store.set_functional("/fan0", true);
        store.save().await.unwrap();

        store.set_functional("/fan0", true);
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_save_failure_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let mut store = InventoryStore::load(&data_dir).await.unwrap();
        std::fs::remove_dir(&data_dir).unwrap();

        store.set_present("/system/chassis/motherboard/fan0", true);
        let err = store.save().await.unwrap_err();
        assert!(matches!(err, FanMonError::Io(_)));
        assert!(store.is_dirty());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(INVENTORY_FILE), "{not json").unwrap();
        assert!(InventoryStore::load(temp_dir.path()).await.is_err());
    }
}
