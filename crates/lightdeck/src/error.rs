//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use lightdeck_config::ConfigError;
use lightdeck_core::{AuthError, ControlError, CoreError, DirectoryError, StoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the light cloud: {reason}")]
    #[diagnostic(
        code(lightdeck::connection_failed),
        help(
            "Check your network connection and the configured endpoints.\n\
             Commands still work offline against the saved device list."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login failed: {message}")]
    #[diagnostic(
        code(lightdeck::auth_failed),
        help("Check username, password, country code and platform, then run: lightdeck login")
    )]
    AuthFailed { message: String },

    #[error("Not logged in")]
    #[diagnostic(
        code(lightdeck::not_logged_in),
        help("Run: lightdeck login --remember")
    )]
    NotLoggedIn,

    #[error("No credentials configured")]
    #[diagnostic(
        code(lightdeck::no_credentials),
        help(
            "Configure an account with: lightdeck config init\n\
             Or pass --username and --country-code."
        )
    )]
    NoCredentials,

    // ── Devices ──────────────────────────────────────────────────────
    #[error("No light selected")]
    #[diagnostic(
        code(lightdeck::no_device_selected),
        help("List lights with `lightdeck devices`, then run: lightdeck select <id>")
    )]
    NoDeviceSelected,

    #[error("Light '{id}' not found")]
    #[diagnostic(
        code(lightdeck::not_found),
        help("Run: lightdeck devices (or `lightdeck refresh` to rediscover)")
    )]
    DeviceNotFound { id: String },

    // ── Cloud ────────────────────────────────────────────────────────
    #[error("The cloud rejected the command ({code}): {message}")]
    #[diagnostic(code(lightdeck::remote_error))]
    Remote { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for '{field}': {reason}")]
    #[diagnostic(code(lightdeck::validation))]
    Validation { field: String, reason: String },

    // ── Config ───────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(lightdeck::config_error),
        help("Check your config file: lightdeck config path")
    )]
    Config(ConfigError),

    #[error("Store error: {message}")]
    #[diagnostic(
        code(lightdeck::store_error),
        help("The store file may be unreadable. Run `lightdeck config path` to locate it.")
    )]
    Store { message: String },

    // ── Generic ──────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(lightdeck::error))]
    Other(String),

    #[error(transparent)]
    #[diagnostic(code(lightdeck::io_error))]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NotLoggedIn | Self::NoCredentials => exit_code::AUTH,
            Self::NoDeviceSelected | Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Config(ConfigError::NoAccount | ConfigError::NoPassword { .. }) => {
                exit_code::AUTH
            }
            Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Auth(AuthError::Network { reason })
            | CoreError::Control(ControlError::Network { reason }) => {
                Self::ConnectionFailed { reason }
            }
            CoreError::Auth(AuthError::InvalidCredentials { message }) => {
                Self::AuthFailed { message }
            }
            CoreError::Auth(AuthError::NoRefreshToken) | CoreError::Control(ControlError::NoSession) => {
                Self::NotLoggedIn
            }
            CoreError::Auth(AuthError::NoSavedCredentials) => Self::NoCredentials,
            CoreError::Auth(AuthError::Persist(e)) | CoreError::Store(e) => e.into(),
            CoreError::Control(ControlError::Remote { code, message }) => {
                Self::Remote { code, message }
            }
            CoreError::Control(ControlError::NoDeviceSelected) => Self::NoDeviceSelected,
            CoreError::Directory(DirectoryError::NotFound { id }) => Self::DeviceNotFound { id },
            CoreError::Color(e) => Self::Validation {
                field: "color".into(),
                reason: e.to_string(),
            },
            CoreError::Config { message } => Self::Other(message),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_exit_with_connection_code() {
        let err: CliError = CoreError::from(ControlError::Network {
            reason: "timed out".into(),
        })
        .into();
        assert!(matches!(err, CliError::ConnectionFailed { .. }));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn auth_failures_exit_with_auth_code() {
        let err: CliError = CoreError::from(AuthError::InvalidCredentials {
            message: "bad password".into(),
        })
        .into();
        assert_eq!(err.exit_code(), exit_code::AUTH);

        let err: CliError = CoreError::from(AuthError::NoSavedCredentials).into();
        assert!(matches!(err, CliError::NoCredentials));
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn missing_selection_is_not_found() {
        let err: CliError = CoreError::from(ControlError::NoDeviceSelected).into();
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err: CliError = ConfigError::Validation {
            field: "defaults.timeout".into(),
            reason: "must be at least 1 second".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn remote_rejection_keeps_code() {
        let err: CliError = CoreError::from(ControlError::Remote {
            code: "DEVICE_OFFLINE".into(),
            message: "device offline".into(),
        })
        .into();
        assert!(err.to_string().contains("DEVICE_OFFLINE"));
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
