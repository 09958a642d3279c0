//! # Chat Session
//!
//! Owns the single connection to the chat server: handshake, inbound line
//! reading, heartbeat replies, channel membership and the reconnect policy.
//!
//! - **Version**: 2.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.1.0: Shutdown handle cancels a pending reconnect sleep
//! - 2.0.0: Relay targets per channel, PART only when the last target leaves
//! - 1.0.0: Initial connection state machine with fixed-delay reconnect

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::core::error::SessionError;
use crate::core::models::ChatEvent;
use crate::core::response::chunk_for_chat;
use crate::irc::client::ChatClient;
use crate::irc::codec::{self, LineKind};
use crate::irc::connector::{BoxedStream, Connector};

/// Delay before a reconnect attempt
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Consecutive failed reconnects tolerated before giving up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Capabilities requested during the handshake
pub const DEFAULT_CAPABILITIES: &[&str] = &["twitch.tv/tags", "twitch.tv/commands"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Joined,
    Reconnecting,
    Stopped,
}

/// Something read off the wire that the caller may care about
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Chat(ChatEvent),
    /// Any non-chat, non-heartbeat line
    Other(String),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub nickname: String,
    pub secret: String,
    pub capabilities: Vec<String>,
    pub reconnect_delay: Duration,
    pub max_retries: u32,
}

impl SessionConfig {
    pub fn new(nickname: impl Into<String>, secret: impl Into<String>) -> Self {
        SessionConfig {
            nickname: nickname.into().to_lowercase(),
            secret: secret.into(),
            capabilities: DEFAULT_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            reconnect_delay: RECONNECT_DELAY,
            max_retries: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// Cloneable handle that stops a session from another task.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

pub struct Session {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    state: SessionState,
    reader: Option<BufReader<ReadHalf<BoxedStream>>>,
    writer: Option<WriteHalf<BoxedStream>>,
    /// channel name -> external relay targets
    channels: BTreeMap<String, BTreeSet<String>>,
    retry_count: u32,
    running: bool,
    last_channel: Option<String>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Session {
    pub fn new(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Session {
            config,
            connector,
            state: SessionState::Disconnected,
            reader: None,
            writer: None,
            channels: BTreeMap::new(),
            retry_count: 0,
            running: false,
            last_channel: None,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Record channels to join on the next handshake
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for channel in channels {
            self.channels.entry(normalize(channel.as_ref())).or_default();
        }
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_channel(&self) -> Option<&str> {
        self.last_channel.as_deref()
    }

    /// Relay targets recorded for `channel`, if it is in the map
    pub fn relay_targets(&self, channel: &str) -> Option<&BTreeSet<String>> {
        self.channels.get(&normalize(channel))
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// One connection attempt plus handshake.
    ///
    /// The server never acknowledges the handshake explicitly, so the session
    /// counts as joined as soon as every handshake line is written.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.stop_requested() {
            self.state = SessionState::Stopped;
            return Err(SessionError::Stopped);
        }

        self.running = true;
        self.state = SessionState::Connecting;
        let stream = match self.connector.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                self.state = SessionState::Disconnected;
                return Err(SessionError::Transient(e));
            }
        };

        let (read_half, write_half) = tokio::io::split(stream);
        self.reader = Some(BufReader::new(read_half));
        self.writer = Some(write_half);
        self.state = SessionState::Authenticating;

        self.write(&codec::pass_line(&self.config.secret)).await?;
        self.write(&codec::nick_line(&self.config.nickname)).await?;
        self.write(&codec::cap_req_line(&self.config.capabilities)).await?;
        let channels: Vec<String> = self.channels.keys().cloned().collect();
        for channel in &channels {
            self.write(&codec::join_line(channel)).await?;
        }

        self.state = SessionState::Joined;
        info!(
            "🔗 Connected as {} ({} channels)",
            self.config.nickname,
            channels.len()
        );
        Ok(())
    }

    /// Connect, retrying on failure with a fixed delay.
    ///
    /// After `max_retries` consecutive failed retries the next failure is
    /// returned as `SessionError::Fatal` and nothing else is scheduled.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        loop {
            let err = match self.start().await {
                Ok(()) => {
                    self.retry_count = 0;
                    return Ok(());
                }
                Err(SessionError::Stopped) => return Err(SessionError::Stopped),
                Err(e) => e,
            };

            if self.retry_count >= self.config.max_retries {
                error!(
                    "❌ Connection failed after {} retries: {err}",
                    self.retry_count
                );
                self.running = false;
                self.drop_connection();
                self.state = SessionState::Disconnected;
                return Err(SessionError::Fatal {
                    attempts: self.retry_count,
                    last_error: err.to_string(),
                });
            }

            self.retry_count += 1;
            self.state = SessionState::Reconnecting;
            warn!(
                "Connection attempt failed: {err}. Retry {}/{} in {:?}...",
                self.retry_count, self.config.max_retries, self.config.reconnect_delay
            );

            if !self.wait_or_shutdown(self.config.reconnect_delay).await {
                info!("Reconnect cancelled by shutdown");
                self.stop_local();
                return Err(SessionError::Stopped);
            }
        }
    }

    /// Sleep for `delay`. Returns `false` if shutdown was requested first.
    async fn wait_or_shutdown(&mut self, delay: Duration) -> bool {
        let shutdown = &mut self.shutdown_rx;
        tokio::select! {
            _ = sleep(delay) => true,
            _ = shutdown.changed() => false,
        }
    }

    /// Handle a closed connection: reconnect when the session should still
    /// be running, otherwise report it as stopped.
    pub async fn handle_disconnect(&mut self) -> Result<(), SessionError> {
        self.drop_connection();
        if !self.running || self.stop_requested() {
            self.stop_local();
            return Err(SessionError::Stopped);
        }

        self.state = SessionState::Reconnecting;
        info!(
            "🔌 Connection lost, reconnecting in {:?}",
            self.config.reconnect_delay
        );
        if !self.wait_or_shutdown(self.config.reconnect_delay).await {
            self.stop_local();
            return Err(SessionError::Stopped);
        }
        self.connect().await
    }

    /// Read until the next event worth handing to the caller.
    ///
    /// Heartbeats are answered here. `Ok(None)` means the peer closed the
    /// connection; call [`Session::handle_disconnect`] next.
    pub async fn next_event(&mut self) -> Result<Option<SessionEvent>, SessionError> {
        loop {
            let Some(reader) = self.reader.as_mut() else {
                return Err(SessionError::NotConnected);
            };
            let shutdown = &mut self.shutdown_rx;
            let mut buf = Vec::new();

            let read = tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => Some(read),
                _ = shutdown.changed() => None,
            };
            let Some(read) = read else {
                self.close().await;
                return Err(SessionError::Stopped);
            };

            match read {
                Ok(0) => {
                    info!("Server closed the connection");
                    self.drop_connection();
                    return Ok(None);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Read error: {e}");
                    self.drop_connection();
                    return Err(SessionError::Transient(e));
                }
            }

            // Bad bytes become U+FFFD instead of failing the whole stream
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }
            match codec::classify(line) {
                LineKind::Heartbeat => {
                    debug!("💓 Heartbeat");
                    self.write(&codec::pong_line()).await?;
                }
                LineKind::Chat => match ChatEvent::parse(line) {
                    Some(event) => {
                        self.last_channel = Some(event.channel.name.clone());
                        return Ok(Some(SessionEvent::Chat(event)));
                    }
                    None => {
                        debug!("Unparseable chat line: {line}");
                        return Ok(Some(SessionEvent::Other(line.to_string())));
                    }
                },
                LineKind::Other => {
                    debug!("⬅️ {line}");
                    return Ok(Some(SessionEvent::Other(line.to_string())));
                }
            }
        }
    }

    /// Send one raw line. Credential lines are never logged.
    pub async fn write(&mut self, line: &str) -> Result<(), SessionError> {
        let Some(writer) = self.writer.as_mut() else {
            warn!("Cannot send, not connected: {}", codec::redact(line));
            return Err(SessionError::NotConnected);
        };

        debug!("➡️ {}", codec::redact(line));
        let framed = format!("{line}\n");
        let result = async {
            writer.write_all(framed.as_bytes()).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!("Write failed for {}: {e}", codec::redact(line));
            self.drop_connection();
            return Err(SessionError::Transient(e));
        }
        Ok(())
    }

    /// Stop the session and cancel any pending reconnect.
    pub async fn close(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        self.stop_local();
        info!("Session closed");
    }

    fn stop_local(&mut self) {
        self.running = false;
        self.drop_connection();
        self.state = SessionState::Stopped;
    }

    fn drop_connection(&mut self) {
        self.reader = None;
        self.writer = None;
        if self.state != SessionState::Stopped {
            self.state = SessionState::Disconnected;
        }
    }
}

#[async_trait]
impl ChatClient for Session {
    fn nickname(&self) -> &str {
        &self.config.nickname
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    fn joined_channels(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    async fn join_channel(
        &mut self,
        channel: &str,
        target: Option<&str>,
    ) -> Result<(), SessionError> {
        let name = normalize(channel);
        let already_joined = self.channels.contains_key(&name);
        let targets = self.channels.entry(name.clone()).or_default();
        if let Some(target) = target {
            targets.insert(target.to_string());
        }

        if already_joined {
            debug!("Already in #{name}, relay targets updated");
            return Ok(());
        }

        info!("➕ Joining #{name}");
        if self.is_connected() {
            self.write(&codec::join_line(&name)).await?;
        }
        Ok(())
    }

    async fn leave_channel(
        &mut self,
        channel: &str,
        target: Option<&str>,
    ) -> Result<(), SessionError> {
        let name = normalize(channel);
        let Some(targets) = self.channels.get_mut(&name) else {
            debug!("Not in #{name}, nothing to leave");
            return Ok(());
        };

        match target {
            Some(target) => {
                targets.remove(target);
                if !targets.is_empty() {
                    debug!("#{name} still relayed to {} targets", targets.len());
                    return Ok(());
                }
            }
            None => targets.clear(),
        }

        self.channels.remove(&name);
        if self.last_channel.as_deref() == Some(name.as_str()) {
            self.last_channel = None;
        }
        info!("➖ Leaving #{name}");
        if self.is_connected() {
            self.write(&codec::part_line(&name)).await?;
        }
        Ok(())
    }

    async fn send_message(
        &mut self,
        text: &str,
        channel: Option<&str>,
    ) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let channel = match channel.map(normalize).or_else(|| self.last_channel.clone()) {
            Some(channel) => channel,
            None => return Err(SessionError::NoChannel),
        };

        for chunk in chunk_for_chat(text) {
            self.write(&codec::privmsg_line(&channel, &chunk)).await?;
        }
        Ok(())
    }

    async fn close(&mut self) {
        Session::close(self).await;
    }
}

fn normalize(channel: &str) -> String {
    channel.trim().trim_start_matches('#').to_lowercase()
}
