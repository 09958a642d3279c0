//! Per-command handler implementations
//!
//! - **Version**: 2.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.1.0: Helix-backed shoutout handler, registered by the binary when Helix is configured
//! - 2.0.0: Chat handlers (utility, admin) replace interaction handlers
//! - 1.0.0: Initial extraction from the monolithic command handler

pub mod admin;
pub mod shoutout;
pub mod utility;

use std::sync::Arc;

use super::handler::CommandHandler;
use crate::core::config::CommandConfig;

/// Create all built-in command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
/// Which tier may run each command is decided by `config`, not here.
pub fn create_all_handlers(config: &CommandConfig) -> Vec<Arc<dyn CommandHandler>> {
    vec![
        Arc::new(utility::UtilityHandler::new(config.public.clone())),
        Arc::new(admin::AdminHandler),
    ]
}
