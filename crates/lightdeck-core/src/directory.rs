// ── Device directory ──
//
// Owns the list of known lights and the single selected device. Every
// mutation is pushed to the host bridge so the shell mirror stays in sync.
//
// Invariants:
// - only `dev_type == "light"` entries are ever held;
// - the selection, when set, is the id of a held entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::bridge::HostBridge;
use crate::error::DirectoryError;
use crate::model::{Device, LightCommand};

pub struct DeviceDirectory {
    devices: Vec<Device>,
    current: Option<String>,
    bridge: Arc<dyn HostBridge>,
    last_sync: Option<DateTime<Utc>>,
}

/// Keep lights only, in their original order.
pub fn retain_lights(devices: impl IntoIterator<Item = Device>) -> Vec<Device> {
    devices.into_iter().filter(Device::is_light).collect()
}

impl DeviceDirectory {
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self {
            devices: Vec::new(),
            current: None,
            bridge,
            last_sync: None,
        }
    }

    /// Replace the held list. Returns `true` if this cleared the selection.
    pub fn replace(&mut self, devices: Vec<Device>) -> bool {
        self.devices = retain_lights(devices);
        self.last_sync = Some(Utc::now());
        debug!(count = self.devices.len(), "directory replaced");
        self.bridge.push_devices(&self.devices);

        let stale = self
            .current
            .as_ref()
            .is_some_and(|id| !self.devices.iter().any(|d| &d.id == id));
        if stale {
            debug!("selected device vanished, clearing selection");
            self.current = None;
            self.bridge.push_current_device(None);
        }
        stale
    }

    /// Select by id. `None` or an unknown id clears the selection.
    pub fn select(&mut self, id: Option<&str>) -> Option<&Device> {
        self.current = id
            .filter(|id| self.devices.iter().any(|d| d.id == *id))
            .map(str::to_owned);
        if id.is_some() && self.current.is_none() {
            debug!(device = ?id, "unknown device, clearing selection");
        }
        let selected = self.selected_index().map(|i| &self.devices[i]);
        self.bridge.push_current_device(selected);
        selected
    }

    /// Apply a command to the selected device without touching the network.
    pub fn apply_local_control(&mut self, command: &LightCommand) -> Result<&Device, DirectoryError> {
        let idx = self.selected_index().ok_or_else(|| DirectoryError::NotFound {
            id: self.current.clone().unwrap_or_default(),
        })?;
        self.devices[idx].apply(command);
        let device = &self.devices[idx];
        self.bridge.push_current_device(Some(device));
        if let LightCommand::Power(on) = command {
            self.bridge.push_device_state(&device.id, *on);
        }
        Ok(device)
    }

    /// Patch a device by id, selected or not. Nothing is pushed.
    pub fn apply_to(&mut self, id: &str, command: &LightCommand) -> Result<&Device, DirectoryError> {
        let device = self
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| DirectoryError::NotFound { id: id.to_owned() })?;
        device.apply(command);
        Ok(device)
    }

    pub fn current(&self) -> Option<&Device> {
        self.selected_index().map(|i| &self.devices[i])
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.current.as_deref() == Some(id)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: &str) -> Result<&Device, DirectoryError> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| DirectoryError::NotFound { id: id.to_owned() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.iter().any(|d| d.id == id)
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn bridge(&self) -> &Arc<dyn HostBridge> {
        &self.bridge
    }

    fn selected_index(&self) -> Option<usize> {
        let id = self.current.as_deref()?;
        self.devices.iter().position(|d| d.id == id)
    }
}
