//! # Helix
//!
//! REST client for the Twitch Helix API with OAuth refresh and rate-limit
//! retries.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true (enabled when client credentials are configured)

pub mod client;
pub mod credentials;
pub mod endpoints;
pub mod rate_limit;
pub mod transport;

pub use client::{HelixCall, HelixClient};
pub use credentials::{JsonFileSecretStore, MemorySecretStore, OAuthCredential, SecretStore};
pub use endpoints::ChannelUpdate;
pub use rate_limit::{RateLimitState, RetryScheduler};
pub use transport::{HttpTransport, ReqwestTransport};
