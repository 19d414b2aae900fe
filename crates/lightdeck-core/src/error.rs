// ── Core error types ──
//
// User-facing errors from lightdeck-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<lightdeck_api::Error>`
// impls classify every transport-layer error as either "could not reach the
// cloud" or "the cloud said no".

use thiserror::Error;

use crate::color::ColorError;

/// Login and token refresh failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Login rejected: {message}")]
    InvalidCredentials { message: String },

    #[error("Cannot reach the cloud: {reason}")]
    Network { reason: String },

    #[error("No refresh token held -- log in first")]
    NoRefreshToken,

    #[error("No saved credentials")]
    NoSavedCredentials,

    #[error("Could not save credentials: {0}")]
    Persist(#[from] StoreError),
}

/// Device command and discovery failures.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Network error: {reason}")]
    Network { reason: String },

    #[error("Command failed ({code}): {message}")]
    Remote { code: String, message: String },

    #[error("No device selected")]
    NoDeviceSelected,

    #[error("Not logged in")]
    NoSession,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Device not found: {id}")]
    NotFound { id: String },
}

/// Persistent store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Stored value is not valid: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store backend error: {message}")]
    Backend { message: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Color(#[from] ColorError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if the cloud could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthError::Network { .. }) | Self::Control(ControlError::Network { .. })
        )
    }

    /// Returns `true` if logging in again could resolve the failure.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Auth(
                AuthError::InvalidCredentials { .. }
                    | AuthError::NoRefreshToken
                    | AuthError::NoSavedCredentials
            ) | Self::Control(ControlError::NoSession)
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lightdeck_api::Error> for AuthError {
    fn from(err: lightdeck_api::Error) -> Self {
        if err.is_transport() {
            AuthError::Network {
                reason: err.to_string(),
            }
        } else {
            // Anything the cloud answered without a token counts as a
            // rejected login, including bodies we could not parse.
            AuthError::InvalidCredentials {
                message: err.to_string(),
            }
        }
    }
}

impl From<lightdeck_api::Error> for ControlError {
    fn from(err: lightdeck_api::Error) -> Self {
        match err {
            e if e.is_transport() => ControlError::Network {
                reason: e.to_string(),
            },
            lightdeck_api::Error::Remote { code, message } => ControlError::Remote { code, message },
            other => ControlError::Remote {
                code: "INVALID_RESPONSE".into(),
                message: other.to_string(),
            },
        }
    }
}
