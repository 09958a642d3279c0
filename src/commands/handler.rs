//! Chat command handler trait
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Handlers return an optional reply instead of answering directly
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;

use super::context::CommandInvocation;
use crate::irc::ChatClient;

/// Trait for chat command handlers
///
/// Each handler processes one or more commands. Handlers are registered with a
/// `CommandRegistry` and dispatched by the router based on command name and
/// the caller's tier.
///
/// Handlers run on the event-processing task. Anything slow (HTTP calls,
/// long computations) should be spawned onto its own task; the handler then
/// returns `Ok(None)` or a short acknowledgement.
///
/// # Example
///
/// ```ignore
/// pub struct PingHandler;
///
/// #[async_trait]
/// impl CommandHandler for PingHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["ping"]
///     }
///
///     async fn handle(
///         &self,
///         invocation: &CommandInvocation,
///         client: &mut dyn ChatClient,
///     ) -> Result<Option<String>> {
///         Ok(Some("Pong!".to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Command name(s) this handler processes, lowercase
    fn command_names(&self) -> &'static [&'static str];

    /// Handle the command
    ///
    /// # Arguments
    ///
    /// * `invocation` - Parsed command with its originating chat event
    /// * `client` - The chat session, for membership changes or extra messages
    ///
    /// Returns the reply to post in chat, if any. Errors are logged by the
    /// router and never shown to chat.
    async fn handle(
        &self,
        invocation: &CommandInvocation,
        client: &mut dyn ChatClient,
    ) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the trait is object-safe (can be used with dyn)
    fn _assert_object_safe(_: &dyn CommandHandler) {}
}
