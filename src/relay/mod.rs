//! # Relay
//!
//! Hook that mirrors chat activity into an external system (a community
//! chat bridge, a log sink). The bridge itself lives outside this crate; the
//! bot only offers lines to a `RelaySink`.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true

use log::{debug, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc;

use crate::core::models::ChatEvent;

/// Consumer of relayed chat lines. Implementations must not block.
pub trait RelaySink: Send + Sync {
    fn relay(&self, channel: &str, text: &str);
}

/// Relay used when forwarding is disabled
pub struct NoopRelay;

impl RelaySink for NoopRelay {
    fn relay(&self, _channel: &str, _text: &str) {}
}

/// A relayed line, as handed to the bridge task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub channel: String,
    pub text: String,
}

/// Forwards lines over an unbounded channel to a bridge task.
pub struct ChannelRelay {
    tx: mpsc::UnboundedSender<RelayMessage>,
}

impl ChannelRelay {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelRelay { tx }, rx)
    }
}

impl RelaySink for ChannelRelay {
    fn relay(&self, channel: &str, text: &str) {
        let message = RelayMessage {
            channel: channel.to_string(),
            text: text.to_string(),
        };
        if self.tx.send(message).is_err() {
            debug!("Relay receiver gone, dropping line for #{channel}");
        }
    }
}

/// Relay line for a chat event: `[TTV] #channel - sender: text`
pub fn relay_line(event: &ChatEvent) -> String {
    format!(
        "[TTV] #{} - {}: {}",
        event.channel.name, event.sender.login, event.text
    )
}

/// Offer `event` to `sink`. A panicking sink is logged and ignored.
pub fn offer(sink: &dyn RelaySink, event: &ChatEvent) {
    let line = relay_line(event);
    let result = catch_unwind(AssertUnwindSafe(|| sink.relay(&event.channel.name, &line)));
    if result.is_err() {
        warn!("Relay sink panicked for #{}", event.channel.name);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingRelay {
        pub lines: Mutex<Vec<(String, String)>>,
    }

    impl RelaySink for RecordingRelay {
        fn relay(&self, channel: &str, text: &str) {
            self.lines
                .lock()
                .unwrap()
                .push((channel.to_string(), text.to_string()));
        }
    }

    impl RecordingRelay {
        pub fn lines(&self) -> Vec<(String, String)> {
            self.lines.lock().unwrap().clone()
        }
    }
}
