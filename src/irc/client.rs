//! Capability interface command handlers use to act on the chat session.
//!
//! `Session` is the production implementation; tests use a recording double.

use async_trait::async_trait;

use crate::core::error::SessionError;

#[async_trait]
pub trait ChatClient: Send {
    /// The bot's own login
    fn nickname(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// Channels currently in the membership map, sorted
    fn joined_channels(&self) -> Vec<String>;

    /// Join `channel`, optionally recording an external relay target.
    async fn join_channel(
        &mut self,
        channel: &str,
        target: Option<&str>,
    ) -> Result<(), SessionError>;

    /// Drop `target` (or the whole channel when `None`); PART once nothing is left.
    async fn leave_channel(
        &mut self,
        channel: &str,
        target: Option<&str>,
    ) -> Result<(), SessionError>;

    async fn send_message(
        &mut self,
        text: &str,
        channel: Option<&str>,
    ) -> Result<(), SessionError>;

    /// Stop the session for good
    async fn close(&mut self);
}
