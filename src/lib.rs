// Core layer - shared types, configuration and errors
pub mod core;

// Chat protocol layer - codec, transport and session
pub mod irc;

// Application layer - tiered command routing
pub mod commands;

// Helix REST client
pub mod helix;

// External relay hook
pub mod relay;

// Event loop wiring session, router and relay
pub mod orchestrator;

// Re-export core config for convenience
pub use crate::core::{CommandConfig, Config};

pub use commands::{CommandHandler, CommandRegistry, CommandRouter};
pub use helix::HelixClient;
pub use irc::{ChatClient, Session, SessionConfig};
pub use orchestrator::Orchestrator;
