// Cloud API wire models
//
// Login/refresh answer with flat token objects; everything else goes through
// the `skill` endpoint wrapped in a `{ header, payload }` envelope. Fields use
// `#[serde(default)]` liberally because the cloud omits what it doesn't know.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Tokens ───────────────────────────────────────────────────────────

/// Raw answer of `auth.do` and `access.do`.
///
/// A failed login still answers HTTP 200, only without `access_token`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<SecretString>,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default, rename = "errorMsg")]
    pub error_msg: Option<String>,
}

/// A successfully issued token pair.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: SecretString,
    /// Some refresh answers omit a new refresh token; callers keep the old one.
    pub refresh_token: Option<SecretString>,
    pub expires_in: Option<u64>,
}

// ── Skill envelope ───────────────────────────────────────────────────

/// Header of a skill response. `code == "SUCCESS"` means the command landed.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SkillHeader {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SkillResponse<P> {
    #[serde(default)]
    pub header: Option<SkillHeader>,
    pub payload: Option<P>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DiscoveryPayload {
    #[serde(default)]
    pub devices: Option<Vec<ApiDevice>>,
}

// ── Device ───────────────────────────────────────────────────────────

/// A device as reported by discovery.
///
/// `data` is left untyped: the cloud mixes strings and numbers for the same
/// keys depending on device firmware. `lightdeck-core` normalizes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDevice {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dev_type: String,
    #[serde(default)]
    pub ha_type: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

// ── Control ──────────────────────────────────────────────────────────

/// Color value carried by `colorSet`. Saturation is a 0..=1 fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPayload {
    pub hue: u16,
    pub saturation: f64,
    pub brightness: u8,
}

/// The three control verbs the widget issues.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    /// `0` = off, `1` = on.
    TurnOnOff(u8),
    /// Device-native brightness, already remapped from the slider.
    BrightnessSet(u8),
    ColorSet(ColorPayload),
}

impl ControlCommand {
    /// Envelope `header.name`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnOnOff(_) => "turnOnOff",
            Self::BrightnessSet(_) => "brightnessSet",
            Self::ColorSet(_) => "colorSet",
        }
    }

    /// Payload key the value is stored under.
    pub fn value_name(&self) -> &'static str {
        match self {
            Self::TurnOnOff(_) | Self::BrightnessSet(_) => "value",
            Self::ColorSet(_) => "color",
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Self::TurnOnOff(v) | Self::BrightnessSet(v) => Value::from(*v),
            Self::ColorSet(color) => serde_json::json!({
                "hue": color.hue,
                "saturation": color.saturation,
                "brightness": color.brightness,
            }),
        }
    }
}

/// A control command addressed to one device.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRequest {
    pub device_id: String,
    pub command: ControlCommand,
}
