// ── Host shell bridge ──
//
// The host shell keeps a second copy of the device list and selection for
// tray/shortcut control while the main view is hidden. The core is the
// source of truth and pushes every mutation out through `HostBridge`; the
// shell sends selection and power requests back as `BridgeEvent`s.

use std::sync::Arc;

use strum::{Display, EnumString};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::model::{Device, LightCommand};
use crate::store::{self, PersistentStore, keys};

/// Outbound half: the core pushes state to the shell.
///
/// Pushes are fire-and-forget. Implementations must not block and must
/// swallow (and log) their own failures.
pub trait HostBridge: Send + Sync {
    fn push_devices(&self, devices: &[Device]);

    fn push_current_device(&self, device: Option<&Device>);

    fn push_device_state(&self, device_id: &str, is_on: bool);
}

/// Power request from a tray menu or global shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum PowerAction {
    #[strum(serialize = "turnOn", serialize = "on")]
    TurnOn,
    #[strum(serialize = "turnOff", serialize = "off")]
    TurnOff,
}

impl PowerAction {
    pub fn is_on(self) -> bool {
        matches!(self, Self::TurnOn)
    }
}

/// Inbound half: events the shell sends into the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    DeviceSelected(String),
    Control(PowerAction),
}

// ── Store-backed mirror ──────────────────────────────────────────────

/// Snapshot of what the shell currently knows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorState {
    pub devices: Vec<Device>,
    pub current: Option<Device>,
}

/// Shell-side mirror that persists every push.
///
/// `devices` is rewritten on every list push and state patch;
/// `current_device` is written on selection and deleted when it clears.
pub struct StoreMirror {
    store: Arc<dyn PersistentStore>,
    state: watch::Sender<MirrorState>,
}

impl StoreMirror {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        let (state, _) = watch::channel(MirrorState::default());
        Self { store, state }
    }

    /// Seed from what a previous run left in the store, keeping only lights
    /// and a selection that is still listed.
    pub fn load(store: Arc<dyn PersistentStore>) -> Self {
        let mirror = Self::new(Arc::clone(&store));
        let mut devices = store::load_devices(store.as_ref()).unwrap_or_else(|e| {
            warn!(error = %e, "discarding unreadable mirrored device list");
            Vec::new()
        });
        devices.retain(Device::is_light);
        let current = store::load_current_device(store.as_ref())
            .ok()
            .flatten()
            .filter(|c| devices.iter().any(|d| d.id == c.id));
        mirror.state.send_replace(MirrorState { devices, current });
        mirror
    }

    pub fn subscribe(&self) -> watch::Receiver<MirrorState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> MirrorState {
        self.state.borrow().clone()
    }

    fn persist_devices(&self, devices: &[Device]) {
        if let Err(e) = store::save(self.store.as_ref(), keys::DEVICES, devices) {
            warn!(error = %e, "failed to persist mirrored devices");
        }
    }

    fn persist_current(&self, device: Option<&Device>) {
        let result = match device {
            Some(d) => store::save(self.store.as_ref(), keys::CURRENT_DEVICE, d),
            None => self.store.delete(keys::CURRENT_DEVICE),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist mirrored selection");
        }
    }
}

impl HostBridge for StoreMirror {
    fn push_devices(&self, devices: &[Device]) {
        debug!(count = devices.len(), "mirroring device list");
        self.state.send_modify(|s| s.devices = devices.to_vec());
        self.persist_devices(devices);
    }

    fn push_current_device(&self, device: Option<&Device>) {
        debug!(device = ?device.map(|d| d.id.as_str()), "mirroring selection");
        self.state.send_modify(|s| {
            if let Some(d) = device {
                if let Some(entry) = s.devices.iter_mut().find(|e| e.id == d.id) {
                    *entry = d.clone();
                }
            }
            s.current = device.cloned();
        });
        self.persist_current(device);
    }

    fn push_device_state(&self, device_id: &str, is_on: bool) {
        let command = LightCommand::Power(is_on);
        let mut patched = None;
        let mut current = None;
        self.state.send_modify(|s| {
            if let Some(entry) = s.devices.iter_mut().find(|e| e.id == device_id) {
                entry.apply(&command);
                patched = Some(s.devices.clone());
            }
            if let Some(c) = s.current.as_mut().filter(|c| c.id == device_id) {
                c.apply(&command);
                current = Some(c.clone());
            }
        });
        if let Some(devices) = patched {
            self.persist_devices(&devices);
        }
        if let Some(c) = current {
            self.persist_current(Some(&c));
        }
    }
}
