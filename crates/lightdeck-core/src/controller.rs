// ── Light controller ──
//
// Routes every user action to the cloud (session online) or to the local
// directory (offline), and reports the outcome to views as `WidgetEvent`s.
// Owns the session, the directory and the bridge listener task.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use lightdeck_api::ControlRequest;
use strum::{Display, EnumString};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{BridgeEvent, HostBridge};
use crate::color::{self, BrightnessLevel, SLIDER_MAX};
use crate::config::ControllerConfig;
use crate::directory::{DeviceDirectory, retain_lights};
use crate::error::{AuthError, ControlError, CoreError};
use crate::events::{Notice, WidgetEvent};
use crate::model::{ColorValue, Credentials, Device, LightCommand};
use crate::session::{AuthSession, SessionStatus};
use crate::store::{self, PersistentStore, keys};

const EVENT_CHANNEL_SIZE: usize = 64;

/// Slider positions used by the quick actions.
const BRIGHT_SLIDER: u8 = 90;
const DIM_SLIDER: u8 = 30;

/// One-tap actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum QuickAction {
    On,
    Off,
    Bright,
    Dim,
}

/// What `restore` found in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Saved credentials were loaded.
    Restored { devices: usize, online: bool },
    /// No credentials saved. Saved devices, if any, are still loaded for
    /// offline control.
    NothingSaved { devices: usize },
    /// The saved credentials were corrupt and have been deleted along with
    /// the device list.
    Discarded,
}

// ── Controller ───────────────────────────────────────────────────────

/// Entry point for views. Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct LightController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    session: AuthSession,
    directory: Mutex<DeviceDirectory>,
    store: Arc<dyn PersistentStore>,
    events: broadcast::Sender<WidgetEvent>,
    /// Last brightness slider position; colors are sent at this brightness.
    slider: AtomicU8,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl LightController {
    pub fn new(
        config: ControllerConfig,
        store: Arc<dyn PersistentStore>,
        bridge: Arc<dyn HostBridge>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(ControllerInner {
                session: AuthSession::new(config, Arc::clone(&store)),
                directory: Mutex::new(DeviceDirectory::new(bridge)),
                store,
                events,
                slider: AtomicU8::new(SLIDER_MAX),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.inner.events.subscribe()
    }

    pub async fn devices(&self) -> Vec<Device> {
        self.inner.directory.lock().await.devices().to_vec()
    }

    pub async fn current_device(&self) -> Option<Device> {
        self.inner.directory.lock().await.current().cloned()
    }

    pub async fn status(&self) -> SessionStatus {
        self.inner.session.status().await
    }

    /// Last brightness slider position.
    pub fn slider(&self) -> u8 {
        self.inner.slider.load(Ordering::Relaxed)
    }

    // ── Startup / account ────────────────────────────────────────────

    /// Load saved credentials, devices and selection.
    ///
    /// A parseable credential blob restores the session (online if it
    /// carries tokens) and starts auto-refresh. A corrupt blob, or a store
    /// that cannot be read at all, is discarded together with the device
    /// list.
    pub async fn restore(&self) -> Result<RestoreOutcome, CoreError> {
        let blob = match self.inner.store.get(keys::CREDENTIALS) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "store is unreadable, discarding saved session");
                return Ok(self.discard_saved().await);
            }
        };

        let online = match blob {
            Some(blob) => {
                if !self.inner.session.restore_from_store(&blob).await {
                    warn!("saved credentials are corrupt, discarding");
                    return Ok(self.discard_saved().await);
                }
                Some(self.inner.session.is_online())
            }
            None => None,
        };

        let devices = store::load_devices(self.inner.store.as_ref()).unwrap_or_else(|e| {
            warn!(error = %e, "saved device list is unreadable");
            Vec::new()
        });
        let saved_current = store::load_current_device(self.inner.store.as_ref())
            .ok()
            .flatten();

        let count = self.replace_devices(devices).await;
        if let Some(saved) = saved_current {
            self.select_quietly(&saved.id).await;
        }

        let Some(online) = online else {
            return Ok(RestoreOutcome::NothingSaved { devices: count });
        };

        self.emit(WidgetEvent::SessionChanged { online });
        if online && self.inner.session.config().auto_refresh {
            self.inner.session.start_auto_refresh().await;
        }
        if count > 0 {
            self.notify(Notice::success("Devices loaded"));
        }
        info!(devices = count, online, "restored saved session");
        Ok(RestoreOutcome::Restored { devices: count, online })
    }

    /// Log in, discover lights and reset the selection.
    ///
    /// When discovery fails the session stays online but the directory is
    /// left as it was. With `remember` the credential blob (including the
    /// plaintext password) is saved.
    pub async fn login(&self, creds: &Credentials, remember: bool) -> Result<usize, CoreError> {
        if let Err(e) = self.inner.session.login(creds).await {
            self.notify(Notice::error(format!("Login failed: {e}")));
            return Err(e.into());
        }
        self.emit(WidgetEvent::SessionChanged { online: true });

        let devices = match self.list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                self.notify(Notice::error(format!("Could not load devices: {e}")));
                return Err(e.into());
            }
        };

        let count = self.replace_devices(devices).await;
        self.select_device(None).await;

        if remember {
            if let Err(e) = self.inner.session.persist_credentials(creds).await {
                warn!(error = %e, "failed to save credentials");
                self.notify(Notice::error(format!("Logged in, but {e}")));
            }
        }
        if self.inner.session.config().auto_refresh {
            self.inner.session.start_auto_refresh().await;
        }

        self.notify(Notice::success("Logged in"));
        Ok(count)
    }

    /// Discover devices on the account, lights only.
    pub async fn list_devices(&self) -> Result<Vec<Device>, ControlError> {
        let (client, token) = self
            .inner
            .session
            .authorized()
            .await
            .ok_or(ControlError::NoSession)?;
        let devices = client.discover_devices(&token).await?;
        debug!(total = devices.len(), "discovered devices");
        Ok(retain_lights(devices.into_iter().map(Device::from)))
    }

    /// Re-read the saved credentials, renew the session and rediscover.
    ///
    /// A blob without a refresh token (saved by `import_credentials`) logs
    /// in with the saved username and password instead.
    pub async fn refresh_devices(&self) -> Result<usize, CoreError> {
        let result = self.refresh_devices_inner().await;
        match &result {
            Ok(_) => self.notify(Notice::success("Devices refreshed")),
            Err(e) => self.notify(Notice::error(format!("Could not refresh devices: {e}"))),
        }
        result
    }

    async fn refresh_devices_inner(&self) -> Result<usize, CoreError> {
        let session = &self.inner.session;
        let saved = session
            .saved_credentials()?
            .ok_or(AuthError::NoSavedCredentials)?;

        if !session.restore(&saved).await {
            return Err(AuthError::NoSavedCredentials.into());
        }
        if saved.refresh_token.is_empty() {
            let creds = saved.credentials();
            session.login(&creds).await?;
            session.persist_credentials(&creds).await?;
        } else {
            session.refresh_access_token().await?;
        }
        self.emit(WidgetEvent::SessionChanged {
            online: session.is_online(),
        });

        let devices = self.list_devices().await?;
        let count = self.replace_devices(devices).await;
        if session.config().auto_refresh {
            session.start_auto_refresh().await;
        }
        Ok(count)
    }

    /// Save credentials without logging in. Clears the device list.
    pub async fn import_credentials(&self, creds: &Credentials) -> Result<(), CoreError> {
        self.inner.session.save_credentials_offline(creds)?;
        self.replace_devices(Vec::new()).await;
        self.select_device(None).await;
        self.notify(Notice::success("Credentials saved"));
        Ok(())
    }

    /// End the session. Devices stay available for offline control.
    pub async fn logout(&self) {
        self.inner.session.logout().await;
        self.emit(WidgetEvent::SessionChanged { online: false });
        self.notify(Notice::success("Logged out"));
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Select a device by id; `None` or an unknown id clears the selection.
    pub async fn select_device(&self, id: Option<&str>) -> Option<Device> {
        let selected = self.inner.directory.lock().await.select(id).cloned();
        self.emit(WidgetEvent::ControlPanel {
            visible: selected.is_some(),
        });
        if let Some(device) = &selected {
            info!(device = %device.id, "device selected");
            self.seed_slider(device);
            self.emit(WidgetEvent::DeviceInfoChanged(device.clone()));
            self.notify(Notice::success(format!("Selected \"{}\"", device.display_name())));
        }
        selected
    }

    // ── Control ──────────────────────────────────────────────────────

    pub async fn set_power(&self, on: bool) -> Result<Device, CoreError> {
        let result = self.dispatch(LightCommand::Power(on)).await;
        self.report(&result, |d| {
            let verb = if on { "Turned on" } else { "Turned off" };
            format!("{verb} \"{}\"", d.display_name())
        });
        result
    }

    pub async fn turn_on(&self) -> Result<Device, CoreError> {
        self.set_power(true).await
    }

    pub async fn turn_off(&self) -> Result<Device, CoreError> {
        self.set_power(false).await
    }

    /// Apply a brightness slider position (`0..=90`).
    ///
    /// `0` sends only power-off. Anything else sends power-on and then the
    /// remapped brightness, strictly in that order; a failed power-on stops
    /// the sequence.
    pub async fn set_brightness(&self, slider: u8) -> Result<BrightnessLevel, CoreError> {
        let level = color::slider_to_device_brightness(slider);

        // Both commands go to the device selected when the action started.
        let result = async {
            let target = self.selected_target().await?;
            if level.is_off() {
                return self.dispatch_to(&target, LightCommand::Power(false)).await;
            }
            self.dispatch_to(&target, LightCommand::Power(true)).await?;
            self.dispatch_to(&target, LightCommand::Brightness(level.device))
                .await
        }
        .await;
        if result.is_ok() {
            self.inner.slider.store(level.slider, Ordering::Relaxed);
        }

        self.report(&result, |d| {
            if level.is_off() {
                format!("Turned off \"{}\"", d.display_name())
            } else {
                format!("Brightness of \"{}\" set to {level}", d.display_name())
            }
        });
        result.map(|_| level)
    }

    /// Set the color from a hue slider (full saturation, current brightness).
    /// Returns the preview color at 50% lightness.
    pub async fn set_hue(&self, hue: u16) -> Result<String, CoreError> {
        let hue = hue % 360;
        let preview = color::hsl_to_hex(f64::from(hue), 100.0, 50.0);
        self.apply_color(hue, 1.0).await?;
        Ok(preview)
    }

    /// Set the color from a hex string; brightness follows the slider.
    pub async fn set_color_hex(&self, hex: &str) -> Result<ColorValue, CoreError> {
        let hsl = match color::hex_to_hsl(hex) {
            Ok(hsl) => hsl,
            Err(e) => {
                self.notify(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };
        self.apply_color(hsl.h % 360, f64::from(hsl.s) / 100.0).await
    }

    async fn apply_color(&self, hue: u16, saturation: f64) -> Result<ColorValue, CoreError> {
        let color = ColorValue {
            hue,
            saturation,
            brightness: self.slider(),
        };
        let result = self.dispatch(LightCommand::Color(color)).await;
        self.report(&result, |d| {
            let hex = color::hsl_to_hex(
                f64::from(color.hue),
                color.saturation * 100.0,
                f64::from(color.brightness),
            );
            format!("Color of \"{}\" set to {hex}", d.display_name())
        });
        result.map(|_| color)
    }

    pub async fn quick_action(&self, action: QuickAction) -> Result<(), CoreError> {
        match action {
            QuickAction::On => self.set_power(true).await.map(drop),
            QuickAction::Off => self.set_power(false).await.map(drop),
            QuickAction::Bright => self.set_brightness(BRIGHT_SLIDER).await.map(drop),
            QuickAction::Dim => self.set_brightness(DIM_SLIDER).await.map(drop),
        }
    }

    /// Id of the selected device.
    async fn selected_target(&self) -> Result<String, ControlError> {
        self.inner
            .directory
            .lock()
            .await
            .current_id()
            .map(str::to_owned)
            .ok_or(ControlError::NoDeviceSelected)
    }

    /// Send one command to the selected device, online or offline.
    async fn dispatch(&self, command: LightCommand) -> Result<Device, CoreError> {
        let target = self.selected_target().await?;
        self.dispatch_to(&target, command).await
    }

    /// Send one command to `target_id`, online or offline.
    ///
    /// Online, local state is patched only after the cloud acknowledged the
    /// command, and the view is only told if the target is still selected.
    async fn dispatch_to(&self, target_id: &str, command: LightCommand) -> Result<Device, CoreError> {
        if !self.inner.session.is_online() {
            let mut dir = self.inner.directory.lock().await;
            let selected = dir.is_selected(target_id);
            let device = if selected {
                dir.apply_local_control(&command)?.clone()
            } else {
                let device = dir.apply_to(target_id, &command)?.clone();
                if let LightCommand::Power(on) = command {
                    dir.bridge().push_device_state(target_id, on);
                }
                device
            };
            drop(dir);
            debug!(device = %device.id, ?command, "applied offline");
            if selected {
                self.emit(WidgetEvent::DeviceInfoChanged(device.clone()));
            }
            return Ok(device);
        }

        let target = self.inner.directory.lock().await.device(target_id)?.clone();
        let (client, token) = self
            .inner
            .session
            .authorized()
            .await
            .ok_or(ControlError::NoSession)?;
        let request = ControlRequest {
            device_id: target.id.clone(),
            command: command.into(),
        };
        client
            .control(&token, &request)
            .await
            .map_err(ControlError::from)?;

        let mut dir = self.inner.directory.lock().await;
        let updated = dir.apply_to(&target.id, &command).ok().cloned();
        if let LightCommand::Power(on) = command {
            dir.bridge().push_device_state(&target.id, on);
        }
        match updated {
            Some(device) if dir.is_selected(&device.id) => {
                dir.bridge().push_current_device(Some(&device));
                drop(dir);
                self.emit(WidgetEvent::DeviceInfoChanged(device.clone()));
                Ok(device)
            }
            Some(device) => {
                debug!(device = %device.id, "selection changed while command was in flight");
                Ok(device)
            }
            None => Ok(target),
        }
    }

    // ── Host shell bridge ────────────────────────────────────────────

    /// React to a tray/shortcut event. Errors are reported as notices.
    pub async fn handle_bridge_event(&self, event: BridgeEvent) {
        debug!(?event, "bridge event");
        match event {
            BridgeEvent::DeviceSelected(id) => {
                let known = self.inner.directory.lock().await.contains(&id);
                if known {
                    self.select_device(Some(&id)).await;
                } else {
                    debug!(device = %id, "ignoring selection of unknown device");
                }
            }
            BridgeEvent::Control(action) => {
                let selected = self.inner.directory.lock().await.current().is_some();
                if !selected {
                    debug!(%action, "ignoring control with no device selected");
                    return;
                }
                if let Err(e) = self.set_power(action.is_on()).await {
                    warn!(error = %e, %action, "bridge control failed");
                }
            }
        }
    }

    /// Process bridge events in order until the channel closes or the
    /// controller shuts down.
    pub async fn spawn_bridge_listener(&self, rx: mpsc::Receiver<BridgeEvent>) {
        let handle = tokio::spawn(bridge_listener_task(
            self.clone(),
            rx,
            self.inner.cancel.child_token(),
        ));
        self.inner.task_handles.lock().await.push(handle);
    }

    /// Stop background work: auto-refresh and the bridge listener.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.session.stop_auto_refresh().await;
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("controller shut down");
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Replace the directory; retract the control panel if the selection
    /// vanished. Returns the number of lights held.
    async fn replace_devices(&self, devices: Vec<Device>) -> usize {
        let (held, cleared) = {
            let mut dir = self.inner.directory.lock().await;
            let cleared = dir.replace(devices);
            (dir.devices().to_vec(), cleared)
        };
        let count = held.len();
        self.emit(WidgetEvent::DevicesChanged(held));
        if cleared {
            self.emit(WidgetEvent::ControlPanel { visible: false });
        }
        count
    }

    /// Re-select a saved device without a notice.
    async fn select_quietly(&self, id: &str) {
        let selected = self.inner.directory.lock().await.select(Some(id)).cloned();
        self.emit(WidgetEvent::ControlPanel {
            visible: selected.is_some(),
        });
        if let Some(device) = selected {
            self.seed_slider(&device);
            self.emit(WidgetEvent::DeviceInfoChanged(device));
        }
    }

    /// Take the slider position from the device's last known brightness.
    /// Device values equal slider positions for everything but off.
    fn seed_slider(&self, device: &Device) {
        if let Some(brightness) = device.brightness().filter(|b| *b > 0) {
            self.inner
                .slider
                .store(brightness.min(SLIDER_MAX), Ordering::Relaxed);
        }
    }

    /// Drop the saved session and device list; the directory is emptied.
    async fn discard_saved(&self) -> RestoreOutcome {
        for key in [keys::CREDENTIALS, keys::DEVICES] {
            if let Err(e) = self.inner.store.delete(key) {
                warn!(error = %e, key, "failed to delete saved entry");
            }
        }
        self.replace_devices(Vec::new()).await;
        RestoreOutcome::Discarded
    }

    fn report<T>(&self, result: &Result<T, CoreError>, success: impl FnOnce(&T) -> String) {
        match result {
            Ok(value) => self.notify(Notice::success(success(value))),
            Err(CoreError::Control(ControlError::NoDeviceSelected)) => {
                self.notify(Notice::error("Select a device first"));
            }
            Err(CoreError::Control(ControlError::Network { .. })) => {
                self.notify(Notice::error("Network error"));
            }
            Err(e) => self.notify(Notice::error(format!("Command failed: {e}"))),
        }
    }

    fn notify(&self, notice: Notice) {
        self.emit(WidgetEvent::Notice(notice));
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}

async fn bridge_listener_task(
    controller: LightController,
    mut rx: mpsc::Receiver<BridgeEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                controller.handle_bridge_event(event).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bridge::StoreMirror;
    use crate::error::StoreError;
    use crate::store::MemoryStore;

    fn offline_controller() -> (LightController, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let bridge = Arc::new(StoreMirror::new(store.clone()));
        let config = ControllerConfig {
            auto_refresh: false,
            ..ControllerConfig::default()
        };
        (LightController::new(config, store.clone(), bridge), store)
    }

    async fn with_lamp(ctrl: &LightController) {
        ctrl.replace_devices(vec![
            Device::new("lamp", Some("Desk".into()), "light"),
            Device::new("plug", None, "switch"),
        ])
        .await;
        ctrl.select_device(Some("lamp")).await.unwrap();
    }

    #[test]
    fn quick_actions_parse() {
        assert_eq!("bright".parse::<QuickAction>().unwrap(), QuickAction::Bright);
        assert!("blink".parse::<QuickAction>().is_err());
    }

    #[tokio::test]
    async fn offline_zero_brightness_only_powers_off() {
        let (ctrl, _) = offline_controller();
        with_lamp(&ctrl).await;
        ctrl.set_brightness(50).await.unwrap();

        let level = ctrl.set_brightness(0).await.unwrap();

        assert!(level.is_off());
        let lamp = ctrl.current_device().await.unwrap();
        let data = lamp.data.unwrap();
        assert_eq!(data.state, Some(false));
        assert_eq!(data.brightness, Some(50));
    }

    #[tokio::test]
    async fn offline_brightness_turns_on_and_sets_value() {
        let (ctrl, store) = offline_controller();
        with_lamp(&ctrl).await;

        ctrl.set_brightness(50).await.unwrap();

        let lamp = ctrl.current_device().await.unwrap();
        assert!(lamp.is_on());
        assert_eq!(lamp.brightness(), Some(50));
        let mirrored = store::load_devices(store.as_ref()).unwrap();
        assert!(mirrored[0].is_on());
    }

    #[tokio::test]
    async fn control_without_selection_is_reported() {
        let (ctrl, _) = offline_controller();
        let mut events = ctrl.subscribe();

        let err = ctrl.turn_on().await.unwrap_err();

        assert!(matches!(err, CoreError::Control(ControlError::NoDeviceSelected)));
        let WidgetEvent::Notice(notice) = events.recv().await.unwrap() else {
            panic!("expected a notice");
        };
        assert_eq!(notice.level, crate::events::NoticeLevel::Error);
    }

    #[tokio::test]
    async fn hue_uses_last_slider_position() {
        let (ctrl, _) = offline_controller();
        with_lamp(&ctrl).await;
        ctrl.set_brightness(30).await.unwrap();

        let preview = ctrl.set_hue(120).await.unwrap();

        assert_eq!(preview, "#00ff00");
        let color = ctrl.current_device().await.unwrap().data.unwrap().color.unwrap();
        assert_eq!(color.hue, 120);
        assert!((color.saturation - 1.0).abs() < f64::EPSILON);
        assert_eq!(color.brightness, 30);
    }

    #[tokio::test]
    async fn hex_color_is_decoded() {
        let (ctrl, _) = offline_controller();
        with_lamp(&ctrl).await;

        let color = ctrl.set_color_hex("#337799").await.unwrap();

        assert_eq!(color.hue, 200);
        assert!((color.saturation - 0.5).abs() < f64::EPSILON);
        assert_eq!(color.brightness, SLIDER_MAX);
        assert!(ctrl.set_color_hex("#zzzzzz").await.is_err());
    }

    #[tokio::test]
    async fn bridge_events_respect_directory() {
        let (ctrl, _) = offline_controller();
        with_lamp(&ctrl).await;

        ctrl.handle_bridge_event(BridgeEvent::DeviceSelected("plug".into()))
            .await;
        assert_eq!(ctrl.current_device().await.unwrap().id, "lamp");

        ctrl.handle_bridge_event(BridgeEvent::Control(crate::bridge::PowerAction::TurnOn))
            .await;
        assert!(ctrl.current_device().await.unwrap().is_on());
    }

    #[tokio::test]
    async fn restore_without_credentials_keeps_offline_devices() {
        let (ctrl, store) = offline_controller();
        store::save(
            store.as_ref(),
            keys::DEVICES,
            &vec![
                Device::new("lamp", None, "light"),
                Device::new("plug", None, "switch"),
            ],
        )
        .unwrap();
        store::save(store.as_ref(), keys::CURRENT_DEVICE, &Device::new("lamp", None, "light")).unwrap();

        let outcome = ctrl.restore().await.unwrap();

        assert_eq!(outcome, RestoreOutcome::NothingSaved { devices: 1 });
        assert_eq!(ctrl.current_device().await.unwrap().id, "lamp");
        assert!(!ctrl.session().is_online());
    }

    #[tokio::test]
    async fn corrupt_credentials_are_discarded() {
        let (ctrl, store) = offline_controller();
        store.set(keys::CREDENTIALS, serde_json::json!("garbage")).unwrap();
        store::save(store.as_ref(), keys::DEVICES, &vec![Device::new("lamp", None, "light")]).unwrap();

        let outcome = ctrl.restore().await.unwrap();

        assert_eq!(outcome, RestoreOutcome::Discarded);
        assert!(store.get(keys::CREDENTIALS).unwrap().is_none());
        assert!(ctrl.devices().await.is_empty());
        // The mirror re-persisted the empty list.
        assert!(store::load_devices(store.as_ref()).unwrap().is_empty());
    }

    /// Reads fail, writes are accepted.
    struct UnreadableStore;

    impl PersistentStore for UnreadableStore {
        fn get(&self, _key: &str) -> Result<Option<serde_json::Value>, StoreError> {
            Err(StoreError::Backend {
                message: "truncated file".into(),
            })
        }

        fn set(&self, _key: &str, _value: serde_json::Value) -> Result<(), StoreError> {
            Ok(())
        }

        fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unreadable_store_is_discarded() {
        let store = Arc::new(UnreadableStore);
        let bridge = Arc::new(StoreMirror::new(store.clone()));
        let config = ControllerConfig {
            auto_refresh: false,
            ..ControllerConfig::default()
        };
        let ctrl = LightController::new(config, store, bridge);

        let outcome = ctrl.restore().await.unwrap();

        assert_eq!(outcome, RestoreOutcome::Discarded);
        assert!(ctrl.devices().await.is_empty());
        assert!(!ctrl.session().is_online());
    }

    fn lamp_at(id: &str, brightness: u8) -> Device {
        let mut lamp = Device::new(id, None, "light");
        lamp.apply(&LightCommand::Brightness(brightness));
        lamp
    }

    #[tokio::test]
    async fn selecting_a_device_takes_its_brightness() {
        let (ctrl, _) = offline_controller();
        ctrl.replace_devices(vec![lamp_at("dim", 10), Device::new("fresh", None, "light")])
            .await;

        ctrl.select_device(Some("dim")).await.unwrap();
        assert_eq!(ctrl.slider(), 10);
        ctrl.set_hue(0).await.unwrap();
        let color = ctrl.current_device().await.unwrap().data.unwrap().color.unwrap();
        assert_eq!(color.brightness, 10);

        // No stored brightness keeps the previous position.
        ctrl.select_device(Some("fresh")).await.unwrap();
        assert_eq!(ctrl.slider(), 10);
    }

    #[tokio::test]
    async fn restore_takes_brightness_of_saved_selection() {
        let (ctrl, store) = offline_controller();
        let lamp = lamp_at("lamp", 35);
        store::save(store.as_ref(), keys::DEVICES, &vec![lamp.clone()]).unwrap();
        store::save(store.as_ref(), keys::CURRENT_DEVICE, &lamp).unwrap();

        ctrl.restore().await.unwrap();

        assert_eq!(ctrl.slider(), 35);
    }
}
