//! # Command System
//!
//! Prefix command (`!ping`) handling for chat messages.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Tiered router for chat commands (public, whitelisted, private, canned)
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 1.0.0: Initial reorganization with modular command structure

pub mod context;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod router;

// Re-export handler infrastructure
pub use context::{CommandInvocation, Tier};
pub use handler::CommandHandler;
pub use handlers::create_all_handlers;
pub use handlers::shoutout::ShoutoutHandler;
pub use registry::CommandRegistry;
pub use router::CommandRouter;
