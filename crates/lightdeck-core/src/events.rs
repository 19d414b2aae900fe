// ── Widget events ──
//
// Everything a view needs to re-render: notices, list and selection
// changes, session status. Delivered over a broadcast channel so any number
// of views can follow one controller.

use std::time::Duration;

use strum::Display;

use crate::model::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// How long the notice stays visible.
    pub fn ttl(&self) -> Duration {
        match self.level {
            NoticeLevel::Success => Duration::from_secs(3),
            NoticeLevel::Error => Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Notice(Notice),
    /// The device list was replaced.
    DevicesChanged(Vec<Device>),
    /// The selected device's visible info changed.
    DeviceInfoChanged(Device),
    /// Control panel visibility follows selection.
    ControlPanel { visible: bool },
    SessionChanged { online: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_notices_linger_longer() {
        assert_eq!(Notice::success("ok").ttl(), Duration::from_secs(3));
        assert_eq!(Notice::error("no").ttl(), Duration::from_secs(5));
    }
}
