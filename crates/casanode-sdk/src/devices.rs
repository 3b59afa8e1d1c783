//! Registry of paired devices, persisted next to the credential store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use casanode_models::DeviceEntry;
use tracing::{debug, warn};

/// Ordered list of paired devices; the most recent pairing is last.
#[derive(Debug)]
pub struct DeviceStore {
    path: Option<PathBuf>,
    devices: RwLock<Vec<DeviceEntry>>,
}

impl DeviceStore {
    /// Load the registry from `path`, starting empty on any read error.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let devices = load_devices(&path);
        Self {
            path: Some(path),
            devices: RwLock::new(devices),
        }
    }

    /// A registry that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            devices: RwLock::new(Vec::new()),
        }
    }

    /// Add a device, moving it to the end if its uuid is already known.
    pub fn add(&self, device: DeviceEntry) {
        self.mutate(|list| {
            list.retain(|d| d.uuid != device.uuid);
            list.push(device);
        });
    }

    /// Remove a device by uuid.
    pub fn remove(&self, uuid: &str) {
        self.mutate(|list| list.retain(|d| d.uuid != uuid));
    }

    /// Most recently paired device.
    pub fn last(&self) -> Option<DeviceEntry> {
        self.list().last().cloned()
    }

    /// Number of paired devices.
    pub fn count(&self) -> usize {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// All paired devices, oldest first.
    pub fn list(&self) -> Vec<DeviceEntry> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn mutate(&self, f: impl FnOnce(&mut Vec<DeviceEntry>)) {
        let snapshot = {
            let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut devices);
            devices.clone()
        };
        let Some(path) = &self.path else {
            return;
        };
        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!(path = %dir.display(), error = %e, "failed to create data directory");
                return;
            }
        }
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => match fs::write(path, json) {
                Ok(()) => debug!(count = snapshot.len(), path = %path.display(), "devices saved"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to write devices"),
            },
            Err(e) => warn!(error = %e, "failed to serialize devices"),
        }
    }
}

fn load_devices(path: &Path) -> Vec<DeviceEntry> {
    if !path.exists() {
        return Vec::new();
    }
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "failed to parse devices");
            Vec::new()
        }),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read devices");
            Vec::new()
        }
    }
}
