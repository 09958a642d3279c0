//! # Orchestrator
//!
//! The event loop: reads session events, feeds chat through the command
//! router and posts replies back as `@sender, reply`. Also drives the
//! reconnect policy when the connection drops.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use log::{debug, error, info, warn};

use crate::commands::CommandRouter;
use crate::core::directory::ChatDirectory;
use crate::core::error::SessionError;
use crate::core::models::ChatEvent;
use crate::core::response::mention_reply;
use crate::irc::session::{Session, SessionEvent, ShutdownHandle};
use crate::irc::ChatClient;

pub struct Orchestrator {
    session: Session,
    router: CommandRouter,
    directory: ChatDirectory,
}

impl Orchestrator {
    pub fn new(session: Session, router: CommandRouter) -> Self {
        Orchestrator {
            session,
            router,
            directory: ChatDirectory::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn directory(&self) -> &ChatDirectory {
        &self.directory
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.session.shutdown_handle()
    }

    /// Connect and process events until the session stops.
    ///
    /// Returns `Ok(())` after a requested shutdown and `Err` when the
    /// reconnect policy gives up.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        match self.session.connect().await {
            Ok(()) => {}
            Err(SessionError::Stopped) => return Ok(()),
            Err(e) => return Err(e),
        }
        self.directory
            .sync_membership(&self.session.joined_channels());

        loop {
            match self.session.next_event().await {
                Ok(Some(SessionEvent::Chat(event))) => self.handle_chat(event).await,
                Ok(Some(SessionEvent::Other(line))) => debug!("Ignoring {line}"),
                Ok(None) | Err(SessionError::Transient(_)) | Err(SessionError::NotConnected) => {
                    match self.session.handle_disconnect().await {
                        Ok(()) => info!("✅ Reconnected"),
                        Err(SessionError::Stopped) => break,
                        Err(e) => {
                            error!("❌ Session lost for good: {e}");
                            return Err(e);
                        }
                    }
                }
                Err(SessionError::Stopped) => break,
                Err(e) => {
                    error!("❌ Session error: {e}");
                    return Err(e);
                }
            }
        }

        info!("Event loop stopped");
        Ok(())
    }

    /// Route one chat event and post its reply, if any.
    pub async fn handle_chat(&mut self, event: ChatEvent) {
        self.directory.observe(&event);

        let reply = self.router.route(&event, &mut self.session).await;
        self.directory
            .sync_membership(&self.session.joined_channels());

        let Some(reply) = reply else {
            return;
        };
        let text = mention_reply(&event.sender.login, &reply);
        if let Err(e) = self
            .session
            .send_message(&text, Some(&event.channel.name))
            .await
        {
            warn!(
                "Could not reply to {} in #{}: {e}",
                event.sender.login, event.channel.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{create_all_handlers, CommandRegistry};
    use crate::core::config::CommandConfig;
    use crate::irc::connector::testing::ScriptedConnector;
    use crate::irc::session::SessionConfig;
    use crate::relay::testing::RecordingRelay;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn orchestrator(
        config: CommandConfig,
        client: DuplexStream,
        relay: Arc<RecordingRelay>,
    ) -> Orchestrator {
        let connector = Arc::new(ScriptedConnector::new(vec![Ok(client)]));
        let session = Session::new(SessionConfig::new("relaybot", "oauth:secret"), connector)
            .with_channels(["bob"]);

        let mut registry = CommandRegistry::new();
        for handler in create_all_handlers(&config) {
            registry.register(handler);
        }
        let router = CommandRouter::new(Arc::new(config), registry, relay);
        Orchestrator::new(session, router)
    }

    /// Read from the server side until `needle` shows up
    async fn read_until(server: &mut DuplexStream, needle: &str) -> String {
        let mut seen = String::new();
        let mut buf = vec![0u8; 4096];
        while !seen.contains(needle) {
            let n = tokio::time::timeout(Duration::from_secs(5), server.read(&mut buf))
                .await
                .expect("timed out waiting for output")
                .unwrap();
            assert!(n > 0, "connection closed before {needle:?}");
            seen.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
        seen
    }

    #[tokio::test]
    async fn test_canned_ping_reply_and_relay() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let relay = Arc::new(RecordingRelay::default());
        let mut config = CommandConfig::default();
        config
            .responses
            .insert("ping".to_string(), "Pong!".to_string());

        let mut orchestrator = orchestrator(config, client, relay.clone());
        let shutdown = orchestrator.shutdown_handle();
        let task = tokio::spawn(async move {
            let result = orchestrator.run().await;
            (orchestrator, result)
        });

        read_until(&mut server, "JOIN #bob\n").await;
        server
            .write_all(b":alice!alice@x.tmi.twitch.tv PRIVMSG #bob :!ping\r\n")
            .await
            .unwrap();

        let written = read_until(&mut server, "Pong!").await;
        assert!(written.contains("PRIVMSG #bob :@alice, Pong!\n"));

        shutdown.shutdown();
        let (orchestrator, result) = task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(
            relay.lines(),
            vec![("bob".to_string(), "[TTV] #bob - alice: !ping".to_string())]
        );
        assert_eq!(orchestrator.directory().last_message(), Some("!ping"));
    }

    #[tokio::test]
    async fn test_no_reply_without_handler_or_canned_response() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let relay = Arc::new(RecordingRelay::default());
        let mut orchestrator = orchestrator(CommandConfig::default(), client, relay.clone());

        orchestrator.session.connect().await.unwrap();
        read_until(&mut server, "JOIN #bob\n").await;

        let event = ChatEvent::parse(":alice!alice@x.tmi.twitch.tv PRIVMSG #bob :!ping").unwrap();
        orchestrator.handle_chat(event).await;

        assert_eq!(relay.lines().len(), 1);
        // Nothing but the handshake was written
        orchestrator.session.close().await;
        let mut rest = String::new();
        server.read_to_string(&mut rest).await.unwrap();
        assert!(!rest.contains("PRIVMSG"));
    }

    #[tokio::test]
    async fn test_private_join_command_updates_directory() {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        let config = CommandConfig {
            private: vec!["join".to_string()],
            ..CommandConfig::default()
        };
        let mut orchestrator =
            orchestrator(config, client, Arc::new(RecordingRelay::default()));

        orchestrator.session.connect().await.unwrap();
        read_until(&mut server, "JOIN #bob\n").await;

        let own = ChatEvent::parse(":relaybot!relaybot@h PRIVMSG #bob :!join carol").unwrap();
        orchestrator.handle_chat(own).await;

        let written = read_until(&mut server, "Joined #carol").await;
        assert!(written.contains("JOIN #carol\n"));
        assert!(written.contains("PRIVMSG #bob :@relaybot, Joined #carol\n"));
        assert_eq!(orchestrator.session.joined_channels(), vec!["bob", "carol"]);
        assert!(orchestrator.directory().channel("carol").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_surfaces_fatal_after_retries() {
        let connector = Arc::new(ScriptedConnector::refusing(6));
        let session = Session::new(SessionConfig::new("relaybot", "oauth:secret"), connector);
        let router = CommandRouter::new(
            Arc::new(CommandConfig::default()),
            CommandRegistry::new(),
            Arc::new(RecordingRelay::default()),
        );
        let mut orchestrator = Orchestrator::new(session, router);

        let err = orchestrator.run().await.unwrap_err();
        assert!(matches!(err, SessionError::Fatal { attempts: 5, .. }));
    }
}
