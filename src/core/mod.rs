//! # Core Module
//!
//! Core domain types, configuration, and error handling for the relay bot.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Chat models, directory and typed errors; chunking sized for chat
//! - 1.1.0: Add response module with message chunking utilities
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod response;

// Re-export commonly used items
pub use config::{CommandConfig, Config};
pub use directory::ChatDirectory;
pub use error::{ConfigError, HelixError, SessionError};
pub use models::{Channel, ChatEvent, Membership, User};
pub use response::{chunk_for_chat, chunk_text, mention_reply, MESSAGE_LIMIT};
