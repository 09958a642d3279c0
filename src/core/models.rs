//! Chat entities: users, channels and parsed chat events
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Populate ids and display names from IRCv3 tags
//! - 1.0.0: Initial typed models

use chrono::{DateTime, Utc};

use crate::irc::codec::{self, LineKind, Tags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Joined,
    Left,
}

/// A chat room, keyed by its lowercase name.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Platform room id when known, otherwise the name
    pub id: String,
    pub name: String,
    pub membership: Membership,
}

impl Channel {
    pub fn new(name: &str) -> Self {
        let name = name.trim_start_matches('#').to_lowercase();
        Channel {
            id: name.clone(),
            name,
            membership: Membership::Left,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// A chatter as last observed.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub login: String,
    pub display_name: String,
    pub last_seen: DateTime<Utc>,
    pub last_channel: Option<String>,
    pub last_message: Option<String>,
}

impl User {
    pub fn new(login: &str) -> Self {
        let login = login.to_lowercase();
        User {
            id: login.clone(),
            display_name: login.clone(),
            login,
            last_seen: Utc::now(),
            last_channel: None,
            last_message: None,
        }
    }
}

/// One inbound chat message. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub raw: String,
    pub sender: User,
    pub channel: Channel,
    pub text: String,
    pub tags: Tags,
    pub timestamp: DateTime<Utc>,
}

impl ChatEvent {
    /// Parse a raw PRIVMSG line. Returns `None` for anything that is not a
    /// well-formed chat line.
    pub fn parse(raw: &str) -> Option<Self> {
        let (tags, rest) = codec::split_tags(raw);
        if codec::classify(rest) != LineKind::Chat {
            return None;
        }

        let login = codec::parse_sender(rest)?;
        let channel_name = codec::parse_channel_tag(rest)?;
        let text = codec::extract_payload(rest, codec::CHAT_KEYWORD);
        let timestamp = Utc::now();

        let mut sender = User::new(login);
        if let Some(id) = tags.get("user-id").filter(|v| !v.is_empty()) {
            sender.id = id.clone();
        }
        if let Some(name) = tags.get("display-name").filter(|v| !v.is_empty()) {
            sender.display_name = name.clone();
        }
        sender.last_seen = timestamp;
        sender.last_channel = Some(channel_name.to_lowercase());
        sender.last_message = Some(text.clone());

        let mut channel = Channel::new(channel_name);
        if let Some(room) = tags.get("room-id").filter(|v| !v.is_empty()) {
            channel = channel.with_id(room.clone());
        }
        channel.membership = Membership::Joined;

        Some(ChatEvent {
            raw: raw.to_string(),
            sender,
            channel,
            text,
            tags,
            timestamp,
        })
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
