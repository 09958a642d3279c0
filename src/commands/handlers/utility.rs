//! Utility command handlers
//!
//! Handles: ping, uptime, help
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Replies are returned to the router as chat text
//! - 1.0.0: Extracted from the monolithic command handler

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::time::{Duration, Instant};

use crate::commands::context::CommandInvocation;
use crate::commands::handler::CommandHandler;
use crate::irc::ChatClient;

/// Handler for utility commands: ping, uptime, help
pub struct UtilityHandler {
    start_time: Instant,
    /// Commands advertised by `help`
    public_commands: Vec<String>,
}

impl UtilityHandler {
    pub fn new(public_commands: Vec<String>) -> Self {
        UtilityHandler {
            start_time: Instant::now(),
            public_commands,
        }
    }

    fn uptime(&self) -> String {
        format!("⏱️ Uptime: {}", format_duration(self.start_time.elapsed()))
    }

    fn help(&self, prefix: &str) -> String {
        if self.public_commands.is_empty() {
            return "No public commands are enabled.".to_string();
        }
        let listed: Vec<String> = self
            .public_commands
            .iter()
            .map(|name| format!("{prefix}{name}"))
            .collect();
        format!("Available commands: {}", listed.join(", "))
    }
}

#[async_trait]
impl CommandHandler for UtilityHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["ping", "uptime", "help"]
    }

    async fn handle(
        &self,
        invocation: &CommandInvocation,
        _client: &mut dyn ChatClient,
    ) -> Result<Option<String>> {
        let reply = match invocation.name.as_str() {
            "ping" => "Pong!".to_string(),
            "uptime" => self.uptime(),
            "help" => self.help(&invocation.prefix),
            _ => return Ok(None),
        };

        info!(
            "[{}] {} command completed for {}",
            invocation.request_id,
            invocation.name,
            invocation.sender()
        );
        Ok(Some(reply))
    }
}

/// Largest-unit-first duration, e.g. `2d 3h 4m 5s` or `42s`
pub fn format_duration(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = total / 86400;
    let hours = (total % 86400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ChatEvent;
    use crate::irc::client::testing::RecordingClient;

    fn invocation(text: &str) -> CommandInvocation {
        let event = ChatEvent::parse(&format!(":alice!alice@h PRIVMSG #bob :{text}")).unwrap();
        CommandInvocation::parse(&event, &["!".to_string()]).unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 4)), "3h 0m 4s");
        assert_eq!(
            format_duration(Duration::from_secs(2 * 86400 + 3 * 3600 + 4 * 60 + 5)),
            "2d 3h 4m 5s"
        );
    }

    #[tokio::test]
    async fn test_ping_and_help() {
        let handler = UtilityHandler::new(vec!["ping".into(), "uptime".into()]);
        let mut client = RecordingClient::new("relaybot");

        let reply = handler.handle(&invocation("!ping"), &mut client).await.unwrap();
        assert_eq!(reply.as_deref(), Some("Pong!"));

        let reply = handler.handle(&invocation("!help"), &mut client).await.unwrap();
        assert_eq!(reply.as_deref(), Some("Available commands: !ping, !uptime"));
    }

    #[tokio::test]
    async fn test_uptime_reply() {
        let handler = UtilityHandler::new(Vec::new());
        let mut client = RecordingClient::new("relaybot");

        let reply = handler.handle(&invocation("!uptime"), &mut client).await.unwrap();
        assert!(reply.unwrap().starts_with("⏱️ Uptime: "));
    }
}
