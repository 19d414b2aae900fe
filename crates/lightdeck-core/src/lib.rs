// lightdeck-core: session, device directory and control core between
// lightdeck-api and its views (CLI, tray shell).

pub mod bridge;
pub mod color;
pub mod config;
pub mod controller;
pub mod convert;
pub mod directory;
pub mod error;
pub mod events;
pub mod model;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::{BridgeEvent, HostBridge, MirrorState, PowerAction, StoreMirror};
pub use color::{BrightnessLevel, Hsl, hex_to_hsl, hsl_to_hex, slider_to_device_brightness};
pub use config::{ControllerConfig, RegionEndpoints};
pub use controller::{LightController, QuickAction, RestoreOutcome};
pub use directory::DeviceDirectory;
pub use error::{AuthError, ControlError, CoreError, DirectoryError, StoreError};
pub use events::{Notice, NoticeLevel, WidgetEvent};
pub use model::{ColorValue, Credentials, Device, DeviceData, LightCommand, StoredCredentials};
pub use session::{AuthSession, SessionStatus};
pub use store::{MemoryStore, PersistentStore};

pub use lightdeck_api::{Platform, Region};
