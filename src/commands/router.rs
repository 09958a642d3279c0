//! # Command Router
//!
//! Resolves a chat event to a command, walks the authorization tiers and
//! produces the reply to post back in chat.
//!
//! Tiers are evaluated independently in a fixed order: public, whitelisted,
//! private, canned response. Every matching tier runs, and a later tier's
//! reply replaces an earlier one.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Relay offer moved ahead of prefix matching
//! - 1.1.0: Handler failures are contained per tier
//! - 1.0.0: Initial tiered dispatch

use log::{debug, info, warn};
use std::sync::Arc;

use super::context::{CommandInvocation, Tier};
use super::registry::CommandRegistry;
use crate::core::config::CommandConfig;
use crate::core::models::ChatEvent;
use crate::irc::ChatClient;
use crate::relay::{self, RelaySink};

pub struct CommandRouter {
    config: Arc<CommandConfig>,
    registry: CommandRegistry,
    relay: Arc<dyn RelaySink>,
}

impl CommandRouter {
    pub fn new(
        config: Arc<CommandConfig>,
        registry: CommandRegistry,
        relay: Arc<dyn RelaySink>,
    ) -> Self {
        CommandRouter {
            config,
            registry,
            relay,
        }
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Route one chat event and return the reply, if any.
    pub async fn route(&self, event: &ChatEvent, client: &mut dyn ChatClient) -> Option<String> {
        self.resolve(event, client)
            .await
            .and_then(|invocation| invocation.reply)
    }

    /// Like `route`, but returns the full invocation with its final tier.
    ///
    /// `None` means the event was not a command at all.
    pub async fn resolve(
        &self,
        event: &ChatEvent,
        client: &mut dyn ChatClient,
    ) -> Option<CommandInvocation> {
        relay::offer(self.relay.as_ref(), event);

        let mut invocation = CommandInvocation::parse(event, &self.config.prefixes)?;
        let is_self = event.sender.login == client.nickname().to_lowercase();
        let name = invocation.name.clone();

        debug!(
            "[{}] 🔎 Resolving {}{} from {} in #{}",
            invocation.request_id,
            invocation.prefix,
            name,
            event.sender.login,
            event.channel.name
        );

        if listed(&self.config.public, &name) {
            self.dispatch(&mut invocation, Tier::Public, client).await;
        }

        if listed(&self.config.whitelisted, &name) && (is_self || self.is_whitelisted(event)) {
            self.dispatch(&mut invocation, Tier::Whitelisted, client)
                .await;
        }

        if listed(&self.config.private, &name) && is_self {
            self.dispatch(&mut invocation, Tier::Private, client).await;
        }

        if let Some(canned) = self.config.responses.get(&name) {
            invocation.tier = Tier::ResponseOnly;
            invocation.reply = Some(canned.clone());
        }

        if invocation.reply.is_some() {
            info!(
                "[{}] ✅ {} resolved as {}",
                invocation.request_id, name, invocation.tier
            );
        }

        Some(invocation)
    }

    fn is_whitelisted(&self, event: &ChatEvent) -> bool {
        self.config
            .whitelist
            .iter()
            .any(|entry| *entry == event.sender.id || *entry == event.sender.login)
    }

    /// Run the handler for `tier`. Only a non-empty reply replaces the candidate.
    async fn dispatch(
        &self,
        invocation: &mut CommandInvocation,
        tier: Tier,
        client: &mut dyn ChatClient,
    ) {
        let Some(handler) = self.registry.get(&invocation.name) else {
            debug!(
                "[{}] No handler registered for {} ({tier})",
                invocation.request_id, invocation.name
            );
            return;
        };

        invocation.tier = tier;
        match handler.handle(invocation, client).await {
            Ok(Some(reply)) => invocation.reply = Some(reply),
            Ok(None) => {}
            Err(e) => warn!(
                "[{}] ❌ Handler for {} failed in {tier} tier: {e:#}",
                invocation.request_id, invocation.name
            ),
        }
    }
}

fn listed(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::handler::CommandHandler;
    use crate::irc::client::testing::RecordingClient;
    use crate::relay::testing::RecordingRelay;
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    /// Echoes the tier it was invoked under
    struct TierEcho;

    #[async_trait]
    impl CommandHandler for TierEcho {
        fn command_names(&self) -> &'static [&'static str] {
            &["stop", "status"]
        }

        async fn handle(
            &self,
            invocation: &CommandInvocation,
            _client: &mut dyn ChatClient,
        ) -> Result<Option<String>> {
            Ok(Some(format!("{} from {}", invocation.name, invocation.tier)))
        }
    }

    struct Failing;

    #[async_trait]
    impl CommandHandler for Failing {
        fn command_names(&self) -> &'static [&'static str] {
            &["boom"]
        }

        async fn handle(
            &self,
            invocation: &CommandInvocation,
            _client: &mut dyn ChatClient,
        ) -> Result<Option<String>> {
            if invocation.tier == Tier::Public {
                bail!("public boom");
            }
            Ok(Some("private boom".to_string()))
        }
    }

    fn event(line: &str) -> ChatEvent {
        ChatEvent::parse(line).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    fn router(config: CommandConfig, relay: Arc<RecordingRelay>) -> CommandRouter {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(TierEcho));
        registry.register(Arc::new(Failing));
        CommandRouter::new(Arc::new(config), registry, relay)
    }

    #[tokio::test]
    async fn test_later_tier_overwrites_earlier() {
        let config = CommandConfig {
            public: names(&["stop"]),
            private: names(&["stop"]),
            ..CommandConfig::default()
        };
        let router = router(config, Arc::new(RecordingRelay::default()));
        let mut client = RecordingClient::new("Relaybot");

        let own = event(":relaybot!relaybot@h PRIVMSG #bob :!stop");
        let invocation = router.resolve(&own, &mut client).await.unwrap();
        assert_eq!(invocation.tier, Tier::Private);
        assert_eq!(invocation.reply.as_deref(), Some("stop from private"));

        let other = event(":alice!alice@h PRIVMSG #bob :!stop");
        let reply = router.route(&other, &mut client).await;
        assert_eq!(reply.as_deref(), Some("stop from public"));
    }

    #[tokio::test]
    async fn test_whitelist_by_id_login_or_self() {
        let config = CommandConfig {
            whitelist: names(&["42", "carol"]),
            whitelisted: names(&["status"]),
            ..CommandConfig::default()
        };
        let router = router(config, Arc::new(RecordingRelay::default()));
        let mut client = RecordingClient::new("relaybot");

        let by_id = event("@user-id=42 :alice!alice@h PRIVMSG #bob :!status");
        assert_eq!(
            router.route(&by_id, &mut client).await.as_deref(),
            Some("status from whitelisted")
        );

        let by_login = event(":carol!carol@h PRIVMSG #bob :!status");
        assert!(router.route(&by_login, &mut client).await.is_some());

        let by_self = event(":relaybot!relaybot@h PRIVMSG #bob :!status");
        assert!(router.route(&by_self, &mut client).await.is_some());

        let stranger = event(":dave!dave@h PRIVMSG #bob :!status");
        let invocation = router.resolve(&stranger, &mut client).await.unwrap();
        assert_eq!(invocation.tier, Tier::None);
        assert!(invocation.reply.is_none());
    }

    #[tokio::test]
    async fn test_handler_failure_only_skips_its_tier() {
        let config = CommandConfig {
            public: names(&["boom"]),
            private: names(&["boom"]),
            ..CommandConfig::default()
        };
        let router = router(config, Arc::new(RecordingRelay::default()));
        let mut client = RecordingClient::new("relaybot");

        let stranger = event(":alice!alice@h PRIVMSG #bob :!boom");
        assert_eq!(router.route(&stranger, &mut client).await, None);

        let own = event(":relaybot!relaybot@h PRIVMSG #bob :!boom");
        assert_eq!(
            router.route(&own, &mut client).await.as_deref(),
            Some("private boom")
        );
    }

    #[tokio::test]
    async fn test_ping_without_canned_response_relays_only() {
        let relay = Arc::new(RecordingRelay::default());
        let router = router(CommandConfig::default(), relay.clone());
        let mut client = RecordingClient::new("relaybot");

        let ping = event(":alice!alice@x.tmi.twitch.tv PRIVMSG #bob :!ping");
        assert_eq!(router.route(&ping, &mut client).await, None);
        assert_eq!(
            relay.lines(),
            vec![("bob".to_string(), "[TTV] #bob - alice: !ping".to_string())]
        );
    }

    #[tokio::test]
    async fn test_ping_with_canned_response() {
        let mut config = CommandConfig::default();
        config
            .responses
            .insert("ping".to_string(), "Pong!".to_string());
        let router = router(config, Arc::new(RecordingRelay::default()));
        let mut client = RecordingClient::new("relaybot");

        let ping = event(":alice!alice@x.tmi.twitch.tv PRIVMSG #bob :!PING");
        let invocation = router.resolve(&ping, &mut client).await.unwrap();
        assert_eq!(invocation.tier, Tier::ResponseOnly);
        assert_eq!(invocation.reply.as_deref(), Some("Pong!"));
    }

    #[tokio::test]
    async fn test_plain_chat_is_relayed_but_not_routed() {
        let relay = Arc::new(RecordingRelay::default());
        let router = router(CommandConfig::default(), relay.clone());
        let mut client = RecordingClient::new("relaybot");

        let chatter = event(":alice!alice@h PRIVMSG #bob :just chatting");
        assert!(router.resolve(&chatter, &mut client).await.is_none());
        assert_eq!(relay.lines().len(), 1);
    }
}
