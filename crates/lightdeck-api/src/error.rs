use thiserror::Error;

/// Top-level error type for the `lightdeck-api` crate.
///
/// Separates failures that never reached the cloud (transport, URL) from
/// answers the cloud gave us that we did not like. `lightdeck-core` relies
/// on that split to pick between its `Network` and `Remote` variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login or token refresh answered without an access token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Skill envelope ──────────────────────────────────────────────
    /// The skill endpoint answered with a non-`SUCCESS` header code.
    #[error("Cloud rejected the request ({code}): {message}")]
    Remote { code: String, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the request never produced a usable HTTP exchange.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::InvalidUrl(_))
    }
}
