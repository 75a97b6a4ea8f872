// jackery-api: Async Rust client for the Jackery power-station cloud API
//
// Login handshake (AES payload + RSA-wrapped key), device identity
// derivation, and a session client that keeps the bearer token alive.

pub mod auth;
pub mod client;
pub mod crypto;
pub mod devices;
pub mod error;
pub mod identity;
pub mod transport;

pub use auth::{Credentials, Session, SessionState};
pub use client::{ClientConfig, DEFAULT_BASE_URL, SessionClient, TOKEN_EXPIRED_CODE};
pub use crypto::{Handshake, LoginEnvelope};
pub use devices::{DEFAULT_POLL_INTERVAL, Device, TelemetrySnapshot};
pub use error::Error;
pub use transport::TransportConfig;
