// ── Color codec ──
//
// HSL <-> hex conversion and the brightness slider remap. Pure functions,
// no state. Channel math matches the widget's reference values exactly
// (`hsl_to_hex(0.0, 100.0, 50.0) == "#ff0000"`).

use std::fmt;

use thiserror::Error;

/// Highest position of the brightness slider.
pub const SLIDER_MAX: u8 = 90;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color '{0}': expected #rrggbb")]
    InvalidHex(String),
}

/// Hue in degrees, saturation and lightness in percent, each rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsl {
    pub h: u16,
    pub s: u8,
    pub l: u8,
}

/// Convert hue `[0, 360)`, saturation and lightness `[0, 100]` to `#rrggbb`.
pub fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let h = h / 360.0;
    let s = s / 100.0;
    let l = l / 100.0;

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = if (0.0..1.0 / 6.0).contains(&h) {
        (c, x, 0.0)
    } else if (1.0 / 6.0..2.0 / 6.0).contains(&h) {
        (x, c, 0.0)
    } else if (2.0 / 6.0..3.0 / 6.0).contains(&h) {
        (0.0, c, x)
    } else if (3.0 / 6.0..4.0 / 6.0).contains(&h) {
        (0.0, x, c)
    } else if (4.0 / 6.0..5.0 / 6.0).contains(&h) {
        (x, 0.0, c)
    } else if (5.0 / 6.0..=1.0).contains(&h) {
        (c, 0.0, x)
    } else {
        (0.0, 0.0, 0.0)
    };

    format!(
        "#{:02x}{:02x}{:02x}",
        to_channel(r + m),
        to_channel(g + m),
        to_channel(b + m)
    )
}

/// Inverse of [`hsl_to_hex`], each channel rounded to the nearest integer.
///
/// Accepts the string with or without the leading `#`.
pub fn hex_to_hsl(hex: &str) -> Result<Hsl, ColorError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(hex.to_owned()));
    }

    let channel = |range: std::ops::Range<usize>| -> Result<f64, ColorError> {
        digits
            .get(range)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .map(|v| f64::from(v) / 255.0)
            .ok_or_else(|| ColorError::InvalidHex(hex.to_owned()))
    };
    let r = channel(0..2)?;
    let g = channel(2..4)?;
    let b = channel(4..6)?;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    #[allow(clippy::float_cmp)]
    let (h, s) = if max == min {
        (0.0, 0.0)
    } else {
        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h / 6.0, s)
    };

    Ok(Hsl {
        h: round_to::<u16>(h * 360.0),
        s: round_to::<u8>(s * 100.0),
        l: round_to::<u8>(l * 100.0),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn to_channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn round_to<T: TryFrom<u16> + Default>(v: f64) -> T {
    T::try_from(v.round().clamp(0.0, f64::from(u16::MAX)) as u16).unwrap_or_default()
}

// ── Brightness ───────────────────────────────────────────────────────

/// One brightness slider position and the two values derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessLevel {
    /// Slider position, `0..=90`.
    pub slider: u8,
    /// Percentage shown to the user: `0` (off) or `10..=100`.
    pub display: u8,
    /// Value sent with `brightnessSet`: `0..=90`.
    pub device: u8,
}

impl BrightnessLevel {
    /// Slider at zero means the light is switched off.
    pub fn is_off(&self) -> bool {
        self.slider == 0
    }
}

impl fmt::Display for BrightnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_off() {
            write!(f, "0% (off)")
        } else {
            write!(f, "{}%", self.display)
        }
    }
}

/// Remap a slider position.
///
/// `0` is off. Otherwise the slider's `[0, 90]` is shown as `[10, 100]`
/// percent, and the shown percentage maps back onto `[0, 90]` for the device.
/// Positions above [`SLIDER_MAX`] are clamped.
pub fn slider_to_device_brightness(slider: u8) -> BrightnessLevel {
    let slider = slider.min(SLIDER_MAX);
    if slider == 0 {
        return BrightnessLevel {
            slider,
            display: 0,
            device: 0,
        };
    }

    let display = slider + 10;
    BrightnessLevel {
        slider,
        display,
        device: display - 10,
    }
}
