//! Shoutout command handler
//!
//! Handles: so
//!
//! Resolves the named user through Helix and posts an official shoutout
//! from the current channel. Needs a Helix client, so it is only registered
//! when one is configured.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

use crate::commands::context::CommandInvocation;
use crate::commands::handler::CommandHandler;
use crate::helix::HelixClient;
use crate::irc::ChatClient;

pub struct ShoutoutHandler {
    helix: Arc<HelixClient>,
    /// User id of the bot account, sent as the moderator
    moderator_id: String,
}

impl ShoutoutHandler {
    pub fn new(helix: Arc<HelixClient>, moderator_id: impl Into<String>) -> Self {
        ShoutoutHandler {
            helix,
            moderator_id: moderator_id.into(),
        }
    }

    /// Room id from the message tags, falling back to a lookup by name
    async fn broadcaster_id(&self, invocation: &CommandInvocation) -> Result<Option<String>> {
        if let Some(room) = invocation.event.tag("room-id").filter(|id| !id.is_empty()) {
            return Ok(Some(room.to_string()));
        }
        Ok(self.helix.user_id(invocation.channel()).await?)
    }
}

#[async_trait]
impl CommandHandler for ShoutoutHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["so"]
    }

    async fn handle(
        &self,
        invocation: &CommandInvocation,
        _client: &mut dyn ChatClient,
    ) -> Result<Option<String>> {
        let Some(target) = invocation.args.first() else {
            return Ok(Some(format!("Usage: {}so <user>", invocation.prefix)));
        };
        let target = target.trim_start_matches('@').to_lowercase();

        let Some(target_id) = self.helix.user_id(&target).await? else {
            return Ok(Some(format!("No user named {target}")));
        };
        let Some(broadcaster_id) = self.broadcaster_id(invocation).await? else {
            warn!(
                "[{}] No user id for channel #{}",
                invocation.request_id,
                invocation.channel()
            );
            return Ok(None);
        };

        self.helix
            .send_shoutout(&broadcaster_id, &target_id, &self.moderator_id)
            .await?;
        info!(
            "[{}] 📣 {} shouted out {target} in #{}",
            invocation.request_id,
            invocation.sender(),
            invocation.channel()
        );
        Ok(Some(format!("📣 Go check out {target}!")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ChatEvent;
    use crate::helix::client::tests::client;
    use crate::helix::transport::{HttpResponse, Method};
    use crate::irc::client::testing::RecordingClient;

    fn invocation(line: &str) -> CommandInvocation {
        let event = ChatEvent::parse(line).unwrap();
        CommandInvocation::parse(&event, &["!".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn test_shoutout_uses_room_id() {
        let (helix, transport, _) = client(vec![
            HttpResponse::new(200, r#"{"data":[{"id":"42","login":"carol"}]}"#),
            HttpResponse::new(204, ""),
        ]);
        let handler = ShoutoutHandler::new(Arc::new(helix), "7");
        let mut chat = RecordingClient::new("relaybot");

        let reply = handler
            .handle(
                &invocation("@room-id=99 :alice!alice@h PRIVMSG #bob :!so @Carol"),
                &mut chat,
            )
            .await
            .unwrap();

        assert_eq!(reply.as_deref(), Some("📣 Go check out carol!"));
        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::Post);
        assert_eq!(
            requests[1].full_url(),
            "https://api.twitch.tv/helix/chat/shoutouts?from_broadcaster_id=99&to_broadcaster_id=42&moderator_id=7"
        );
    }

    #[tokio::test]
    async fn test_shoutout_looks_up_channel_without_room_id() {
        let (helix, transport, _) = client(vec![
            HttpResponse::new(200, r#"{"data":[{"id":"42"}]}"#),
            HttpResponse::new(200, r#"{"data":[{"id":"99"}]}"#),
            HttpResponse::new(204, ""),
        ]);
        let handler = ShoutoutHandler::new(Arc::new(helix), "7");
        let mut chat = RecordingClient::new("relaybot");

        handler
            .handle(&invocation(":alice!alice@h PRIVMSG #bob :!so carol"), &mut chat)
            .await
            .unwrap();

        let urls = transport.urls();
        assert_eq!(urls[1], "https://api.twitch.tv/helix/users?login=bob");
        assert!(urls[2].contains("from_broadcaster_id=99"));
    }

    #[tokio::test]
    async fn test_unknown_user_and_usage() {
        let (helix, transport, _) = client(vec![HttpResponse::new(200, r#"{"data":[]}"#)]);
        let handler = ShoutoutHandler::new(Arc::new(helix), "7");
        let mut chat = RecordingClient::new("relaybot");

        let reply = handler
            .handle(&invocation(":alice!alice@h PRIVMSG #bob :!so"), &mut chat)
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("Usage: !so <user>"));

        let reply = handler
            .handle(&invocation(":alice!alice@h PRIVMSG #bob :!so ghost"), &mut chat)
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("No user named ghost"));
        assert_eq!(transport.requests().len(), 1);
    }
}
