// ── Persistent store ──
//
// Key/value persistence for the credential blob, the device list and the
// selected device. Values are JSON so any backend (file, host storage,
// memory) can hold them without knowing the schema.

mod memory;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;
use crate::model::{Device, StoredCredentials};

pub use memory::MemoryStore;

/// Well-known keys.
pub mod keys {
    pub const CREDENTIALS: &str = "credentials";
    pub const DEVICES: &str = "devices";
    pub const CURRENT_DEVICE: &str = "current_device";
}

/// Key/value storage surviving restarts.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// ── Typed helpers ────────────────────────────────────────────────────

/// Read and decode `key`. Absent keys are `Ok(None)`.
pub fn load<T: DeserializeOwned>(
    store: &dyn PersistentStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(key)?
        .map(serde_json::from_value)
        .transpose()
        .map_err(StoreError::from)
}

pub fn save<T: Serialize + ?Sized>(
    store: &dyn PersistentStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    store.set(key, serde_json::to_value(value)?)
}

pub fn load_credentials(
    store: &dyn PersistentStore,
) -> Result<Option<StoredCredentials>, StoreError> {
    load(store, keys::CREDENTIALS)
}

pub fn load_devices(store: &dyn PersistentStore) -> Result<Vec<Device>, StoreError> {
    Ok(load(store, keys::DEVICES)?.unwrap_or_default())
}

pub fn load_current_device(store: &dyn PersistentStore) -> Result<Option<Device>, StoreError> {
    load(store, keys::CURRENT_DEVICE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_key_loads_as_none() {
        let store = MemoryStore::new();
        assert!(load_credentials(&store).unwrap().is_none());
        assert!(load_devices(&store).unwrap().is_empty());
    }

    #[test]
    fn corrupt_value_is_serialization_error() {
        let store = MemoryStore::new();
        store.set(keys::DEVICES, json!("not a list")).unwrap();
        assert!(matches!(load_devices(&store), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn credentials_use_historical_keys() {
        let store = MemoryStore::new();
        let blob = StoredCredentials {
            username: "ada".into(),
            password: "pw".into(),
            region: "44".into(),
            platform: lightdeck_api::Platform::SmartLife,
            access_token: "AT".into(),
            refresh_token: "RT".into(),
            base_url: "https://px1.tuyaeu.com/homeassistant/".into(),
            proxy_url: String::new(),
        };
        save(&store, keys::CREDENTIALS, &blob).unwrap();

        let raw = store.get(keys::CREDENTIALS).unwrap().unwrap();
        assert_eq!(raw["baseUrl"], "https://px1.tuyaeu.com/homeassistant/");
        assert_eq!(raw["proxyUrl"], "");
        assert_eq!(raw["platform"], "smart_life");
        assert_eq!(load_credentials(&store).unwrap(), Some(blob));
    }
}
