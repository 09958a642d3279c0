//! Transport seam for the chat session
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use async_trait::async_trait;
use log::debug;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

/// Default TMI endpoint (plain text)
pub const DEFAULT_SERVER: &str = "irc.chat.twitch.tv:6667";

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Any bidirectional byte stream the session can own
pub trait ChatStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ChatStream for T {}

pub type BoxedStream = Box<dyn ChatStream>;

/// Opens a fresh stream for every (re)connect attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> io::Result<BoxedStream>;
}

/// Plain TCP connector
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        TcpConnector { addr: addr.into() }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER)
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> io::Result<BoxedStream> {
        debug!("Connecting to {}", self.addr);
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connection timeout"))??;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}
