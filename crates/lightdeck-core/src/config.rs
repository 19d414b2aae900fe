// ── Runtime configuration ──
//
// These types describe *how* the controller talks to the cloud. They never
// touch disk: lightdeck-config (or a test) constructs a `ControllerConfig`
// and hands it in.

use std::time::Duration;

use lightdeck_api::Region;

/// Relay prefix historically required for the China region.
pub const DEFAULT_CN_RELAY: &str = "https://cors-anywhere.herokuapp.com/";

/// API root per region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEndpoints {
    pub eu: String,
    pub us: String,
    pub cn: String,
}

impl RegionEndpoints {
    /// Point every region at the same root. Used against mock servers.
    pub fn uniform(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            eu: base_url.clone(),
            us: base_url.clone(),
            cn: base_url,
        }
    }

    pub fn for_region(&self, region: Region) -> &str {
        match region {
            Region::Eu => &self.eu,
            Region::Us => &self.us,
            Region::Cn => &self.cn,
        }
    }
}

impl Default for RegionEndpoints {
    fn default() -> Self {
        Self {
            eu: Region::Eu.default_base_url().into(),
            us: Region::Us.default_base_url().into(),
            cn: Region::Cn.default_base_url().into(),
        }
    }
}

/// Configuration for one widget instance.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub endpoints: RegionEndpoints,
    /// Prefix for regions that require a relay. `None` sends those
    /// requests directly.
    pub relay_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Token refresh period while online.
    pub refresh_interval: Duration,
    /// Consecutive failed refreshes before the session goes offline.
    /// `0` never demotes.
    pub max_refresh_failures: u32,
    /// Start the refresh timer after login/restore.
    pub auto_refresh: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            endpoints: RegionEndpoints::default(),
            relay_url: Some(DEFAULT_CN_RELAY.into()),
            timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(120),
            max_refresh_failures: 3,
            auto_refresh: true,
        }
    }
}

impl ControllerConfig {
    /// The relay to use for `region`, if any.
    pub fn relay_for(&self, region: Region) -> Option<&str> {
        if region.requires_relay() {
            self.relay_url.as_deref().filter(|r| !r.is_empty())
        } else {
            None
        }
    }
}
