//! # Chat Protocol
//!
//! Line codec, connection seam and the session state machine for the
//! IRC-based chat interface.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod client;
pub mod codec;
pub mod connector;
pub mod session;

pub use client::ChatClient;
pub use connector::{Connector, TcpConnector};
pub use session::{Session, SessionConfig, SessionEvent, SessionState, ShutdownHandle};
