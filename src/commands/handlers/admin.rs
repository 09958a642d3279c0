//! Admin command handlers
//!
//! Handles: join, leave, channels, stop
//!
//! Meant for the private or whitelisted tier; the handler itself does not
//! check who is calling.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Channel membership commands for chat sessions
//! - 1.0.0: Extracted from the monolithic command handler

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};

use crate::commands::context::CommandInvocation;
use crate::commands::handler::CommandHandler;
use crate::irc::ChatClient;

/// Handler for admin commands: join, leave, channels, stop
pub struct AdminHandler;

#[async_trait]
impl CommandHandler for AdminHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["join", "leave", "channels", "stop"]
    }

    async fn handle(
        &self,
        invocation: &CommandInvocation,
        client: &mut dyn ChatClient,
    ) -> Result<Option<String>> {
        match invocation.name.as_str() {
            "join" => self.handle_join(invocation, client).await,
            "leave" => self.handle_leave(invocation, client).await,
            "channels" => Ok(Some(Self::channel_list(client))),
            "stop" => self.handle_stop(invocation, client).await,
            _ => Ok(None),
        }
    }
}

impl AdminHandler {
    /// `join <channel> [target]`
    async fn handle_join(
        &self,
        invocation: &CommandInvocation,
        client: &mut dyn ChatClient,
    ) -> Result<Option<String>> {
        let Some(channel) = invocation.args.first() else {
            return Ok(Some(format!("Usage: {}join <channel>", invocation.prefix)));
        };
        let target = invocation.args.get(1).map(String::as_str);

        client.join_channel(channel, target).await?;
        info!(
            "[{}] {} joined #{}",
            invocation.request_id,
            client.nickname(),
            channel.trim_start_matches('#')
        );
        Ok(Some(format!("Joined #{}", channel.trim_start_matches('#').to_lowercase())))
    }

    /// `leave [channel] [target]`, defaulting to the channel the command came from
    async fn handle_leave(
        &self,
        invocation: &CommandInvocation,
        client: &mut dyn ChatClient,
    ) -> Result<Option<String>> {
        let channel = invocation
            .args
            .first()
            .map(String::as_str)
            .unwrap_or_else(|| invocation.channel());
        let target = invocation.args.get(1).map(String::as_str);
        let name = channel.trim_start_matches('#').to_lowercase();

        client.leave_channel(channel, target).await?;
        info!("[{}] Left #{name}", invocation.request_id);

        // Replying into a channel we just parted would fail
        if name == invocation.channel() && !client.joined_channels().contains(&name) {
            return Ok(None);
        }
        Ok(Some(format!("Left #{name}")))
    }

    fn channel_list(client: &dyn ChatClient) -> String {
        let channels = client.joined_channels();
        if channels.is_empty() {
            return "Not in any channels.".to_string();
        }
        let listed: Vec<String> = channels.iter().map(|c| format!("#{c}")).collect();
        format!("Channels: {}", listed.join(", "))
    }

    /// Say goodbye, then close the session for good
    async fn handle_stop(
        &self,
        invocation: &CommandInvocation,
        client: &mut dyn ChatClient,
    ) -> Result<Option<String>> {
        warn!(
            "[{}] 🛑 Stop requested by {}",
            invocation.request_id,
            invocation.sender()
        );
        if let Err(e) = client
            .send_message("Shutting down. Bye!", Some(invocation.channel()))
            .await
        {
            warn!("[{}] Could not say goodbye: {e}", invocation.request_id);
        }
        client.close().await;
        Ok(None)
    }
}
