// ── Domain model ──
//
// Canonical representation of lights and account credentials. Discovery
// data from lightdeck-api is normalized into these types by `convert`.

pub mod credentials;
pub mod device;

pub use credentials::{Credentials, StoredCredentials};
pub use device::{ColorValue, Device, DeviceData, LightCommand, LIGHT_DEVICE_TYPE};
