//! Shared configuration for the lightdeck CLI.
//!
//! TOML config (file + `LIGHTDECK_` env), credential resolution
//! (env + keyring + plaintext), translation to
//! `lightdeck_core::ControllerConfig`, and the JSON file store that backs
//! `lightdeck_core::PersistentStore` on disk.

mod store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use lightdeck_core::config::DEFAULT_CN_RELAY;
use lightdeck_core::{ControllerConfig, Credentials, Platform, RegionEndpoints};

pub use store::JsonFileStore;

/// Keyring service name; the account is the username.
pub const KEYRING_SERVICE: &str = "lightdeck";

/// Password override, checked before the keyring.
pub const PASSWORD_ENV: &str = "LIGHTDECK_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no account configured -- run `lightdeck config init` or pass --username")]
    NoAccount,

    #[error("no password found for '{username}' (tried $LIGHTDECK_PASSWORD, the keyring and the config file)")]
    NoPassword { username: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// Per-region API root overrides.
    #[serde(default)]
    pub endpoints: Endpoints,

    /// The cloud account.
    pub account: Option<Account>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Token refresh period in seconds (`shell` only).
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,

    /// Consecutive failed refreshes before going offline; 0 never does.
    #[serde(default = "default_max_refresh_failures")]
    pub max_refresh_failures: u32,

    /// Relay prefix for the China region. Empty disables it.
    #[serde(default = "default_relay")]
    pub relay: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
            max_refresh_failures: default_max_refresh_failures(),
            relay: default_relay(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> u64 {
    120
}
fn default_max_refresh_failures() -> u32 {
    3
}
fn default_relay() -> String {
    DEFAULT_CN_RELAY.into()
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Endpoints {
    pub eu: Option<String>,
    pub us: Option<String>,
    pub cn: Option<String>,
}

/// Account settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Account {
    pub username: String,

    /// Phone country code; `1` selects the US region, `86` China,
    /// anything else Europe.
    pub country_code: String,

    #[serde(default)]
    pub platform: Platform,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Save the session (and password) in the store after login.
    #[serde(default)]
    pub remember: bool,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "lightdeck", "lightdeck")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "lightdeck", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the persistent store lives.
pub fn store_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "lightdeck", "store.json"]),
        |dirs| dirs.data_dir().join("store.json"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Nested keys use a double underscore in env vars, e.g.
/// `LIGHTDECK_ACCOUNT__COUNTRY_CODE=1`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LIGHTDECK_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the account password: env var, then keyring, then plaintext.
pub fn resolve_password(account: &Account) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &account.username) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = account.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoPassword {
        username: account.username.clone(),
    })
}

/// Save a password to the system keyring.
pub fn store_password(username: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, username)?.set_password(password)?;
    Ok(())
}

/// Build login credentials from the configured account.
pub fn resolve_credentials(cfg: &Config) -> Result<Credentials, ConfigError> {
    let account = cfg.account.as_ref().ok_or(ConfigError::NoAccount)?;
    validate_account(account)?;
    Ok(Credentials {
        username: account.username.clone(),
        password: resolve_password(account)?,
        country_code: account.country_code.clone(),
        platform: account.platform,
    })
}

fn validate_account(account: &Account) -> Result<(), ConfigError> {
    if account.username.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "account.username".into(),
            reason: "must not be empty".into(),
        });
    }
    let code = account.country_code.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation {
            field: "account.country_code".into(),
            reason: format!("expected digits, got '{}'", account.country_code),
        });
    }
    Ok(())
}

// ── Controller config ───────────────────────────────────────────────

/// Build a `ControllerConfig` from the loaded config.
pub fn to_controller_config(cfg: &Config) -> Result<ControllerConfig, ConfigError> {
    let d = &cfg.defaults;
    if d.timeout == 0 {
        return Err(ConfigError::Validation {
            field: "defaults.timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    if d.refresh_interval == 0 {
        return Err(ConfigError::Validation {
            field: "defaults.refresh_interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let defaults = RegionEndpoints::default();
    let endpoints = RegionEndpoints {
        eu: endpoint("endpoints.eu", cfg.endpoints.eu.as_deref(), defaults.eu)?,
        us: endpoint("endpoints.us", cfg.endpoints.us.as_deref(), defaults.us)?,
        cn: endpoint("endpoints.cn", cfg.endpoints.cn.as_deref(), defaults.cn)?,
    };

    let relay_url = match d.relay.trim() {
        "" => None,
        relay => Some(parse_url("defaults.relay", relay)?),
    };

    Ok(ControllerConfig {
        endpoints,
        relay_url,
        timeout: Duration::from_secs(d.timeout),
        refresh_interval: Duration::from_secs(d.refresh_interval),
        max_refresh_failures: d.max_refresh_failures,
        auto_refresh: true,
    })
}

fn endpoint(field: &str, value: Option<&str>, fallback: String) -> Result<String, ConfigError> {
    value.map_or(Ok(fallback), |v| parse_url(field, v))
}

fn parse_url(field: &str, value: &str) -> Result<String, ConfigError> {
    let url: url::Url = value.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {value}"),
    })?;
    Ok(url.to_string())
}
