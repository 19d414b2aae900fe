// lightdeck-api: Async Rust client for the cloud smart-light skill API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod skill;
pub mod transport;

pub use auth::{Platform, Region};
pub use client::CloudClient;
pub use error::Error;
pub use models::{ApiDevice, ColorPayload, ControlCommand, ControlRequest, TokenGrant};
pub use transport::TransportConfig;
