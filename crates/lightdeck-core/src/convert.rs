// ── API-to-domain conversions ──
//
// Discovery data comes back loosely typed: firmware reports `state` as a
// bool or as "true"/"false", and `brightness` as a number or a numeric
// string. Everything is normalized here so the rest of the crate never
// sees raw JSON.

use lightdeck_api::{ApiDevice, ColorPayload, ControlCommand};
use serde_json::{Map, Value};

use crate::model::{ColorValue, Device, DeviceData, LightCommand};

impl From<ApiDevice> for Device {
    fn from(d: ApiDevice) -> Self {
        let data = device_data(&d.data);
        Device {
            id: d.id,
            name: d.name,
            dev_type: d.dev_type,
            data,
        }
    }
}

fn device_data(raw: &Map<String, Value>) -> Option<DeviceData> {
    if raw.is_empty() {
        return None;
    }
    Some(DeviceData {
        state: raw.get("state").and_then(lenient_bool),
        brightness: raw.get("brightness").and_then(lenient_u8),
        color: None,
        online: raw.get("online").and_then(lenient_bool),
    })
}

fn lenient_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_u8(v: &Value) -> Option<u8> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(round_f64))
            .and_then(|n| u8::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u8>().ok(),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn round_f64(f: f64) -> u64 {
    f.round() as u64
}

impl From<ColorValue> for ColorPayload {
    fn from(c: ColorValue) -> Self {
        ColorPayload {
            hue: c.hue,
            saturation: c.saturation,
            brightness: c.brightness,
        }
    }
}

impl From<LightCommand> for ControlCommand {
    fn from(cmd: LightCommand) -> Self {
        match cmd {
            LightCommand::Power(on) => ControlCommand::TurnOnOff(u8::from(on)),
            LightCommand::Brightness(value) => ControlCommand::BrightnessSet(value),
            LightCommand::Color(color) => ControlCommand::ColorSet(color.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_device(data: Value) -> ApiDevice {
        serde_json::from_value(json!({
            "id": "lamp-1",
            "name": "Desk",
            "dev_type": "light",
            "data": data,
        }))
        .unwrap()
    }

    #[test]
    fn state_and_brightness_accept_strings() {
        let device = Device::from(api_device(json!({"state": "true", "brightness": "55"})));
        assert!(device.is_on());
        assert_eq!(device.brightness(), Some(55));
    }

    #[test]
    fn native_types_pass_through() {
        let device = Device::from(api_device(json!({"state": false, "brightness": 12, "online": true})));
        let data = device.data.unwrap();
        assert_eq!(data.state, Some(false));
        assert_eq!(data.brightness, Some(12));
        assert_eq!(data.online, Some(true));
    }

    #[test]
    fn empty_data_stays_absent() {
        let device = Device::from(api_device(json!({})));
        assert!(device.data.is_none());
    }

    #[test]
    fn out_of_range_brightness_is_dropped() {
        let device = Device::from(api_device(json!({"state": true, "brightness": 900})));
        assert_eq!(device.brightness(), None);
        assert!(device.is_on());
    }

    #[test]
    fn power_maps_to_numeric_value() {
        assert_eq!(ControlCommand::from(LightCommand::Power(true)), ControlCommand::TurnOnOff(1));
        assert_eq!(ControlCommand::from(LightCommand::Power(false)), ControlCommand::TurnOnOff(0));
    }
}
