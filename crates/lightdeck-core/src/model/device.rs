use serde::{Deserialize, Serialize};

/// The only device category the widget manages.
pub const LIGHT_DEVICE_TYPE: &str = "light";

/// A device known to the directory, identified by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub dev_type: String,
    /// Absent until discovery reports state or the first control action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DeviceData>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: Option<String>, dev_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name,
            dev_type: dev_type.into(),
            data: None,
        }
    }

    /// Display label, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.id)
    }

    pub fn is_light(&self) -> bool {
        self.dev_type == LIGHT_DEVICE_TYPE
    }

    pub fn is_on(&self) -> bool {
        self.data.as_ref().and_then(|d| d.state).unwrap_or(false)
    }

    pub fn brightness(&self) -> Option<u8> {
        self.data.as_ref().and_then(|d| d.brightness)
    }

    /// Apply a command to the state bag, creating it if absent.
    pub fn apply(&mut self, command: &LightCommand) {
        self.data.get_or_insert_with(DeviceData::default).apply(command);
    }
}

/// Mutable state bag of a light.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<bool>,
    /// Device-native brightness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// Last applied color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorValue>,
    /// Cloud reachability as reported by discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
}

impl DeviceData {
    pub fn apply(&mut self, command: &LightCommand) {
        match command {
            LightCommand::Power(on) => self.state = Some(*on),
            LightCommand::Brightness(value) => self.brightness = Some(*value),
            LightCommand::Color(color) => self.color = Some(*color),
        }
    }
}

/// Hue in degrees, saturation as a `0..=1` fraction, brightness as sent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorValue {
    pub hue: u16,
    pub saturation: f64,
    pub brightness: u8,
}

/// A single control action, independent of where it is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightCommand {
    Power(bool),
    /// Device-native brightness (post-remap).
    Brightness(u8),
    Color(ColorValue),
}
