//! # Line Codec
//!
//! Pure helpers over raw TMI protocol lines: inbound field extraction and
//! outbound line formatting. Nothing here performs I/O and nothing panics on
//! truncated input; missing fields come back as `None`.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: IRCv3 tag splitting with value unescaping
//! - 1.1.0: Outbound formatters for the handshake and channel membership
//! - 1.0.0: Sender, channel and payload extraction

use std::collections::HashMap;

/// Keyword that marks a chat message line
pub const CHAT_KEYWORD: &str = "PRIVMSG";
/// Server literal used by heartbeats
pub const SERVER_LITERAL: &str = "tmi.twitch.tv";
/// Keyword of the credential line (never logged)
pub const CREDENTIAL_KEYWORD: &str = "PASS";

/// Parsed IRCv3 message tags
pub type Tags = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heartbeat,
    Chat,
    Other,
}

/// Exact heartbeat line the server sends
pub fn heartbeat_literal() -> String {
    format!("PING :{SERVER_LITERAL}")
}

/// Login between the leading `:` and the first `!`.
pub fn parse_sender(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(':')?;
    let end = rest.find('!')?;
    let sender = &rest[..end];
    if sender.is_empty() || sender.contains(' ') {
        return None;
    }
    Some(sender)
}

/// Name of the first `#`-prefixed token, without the `#`.
pub fn parse_channel_tag(line: &str) -> Option<&str> {
    line.split_whitespace()
        .find(|token| token.starts_with('#'))
        .map(|token| &token[1..])
        .filter(|name| !name.is_empty())
}

/// Text after `keyword` and the channel tag, trimmed.
pub fn extract_payload(line: &str, keyword: &str) -> String {
    let Some(pos) = line.find(keyword) else {
        return String::new();
    };
    let after = line[pos + keyword.len()..].trim_start();

    // Skip the channel token if it sits right after the keyword
    let after = if after.starts_with('#') {
        match after.find(' ') {
            Some(space) => &after[space..],
            None => "",
        }
    } else {
        after
    };

    let after = after.trim_start();
    after.strip_prefix(':').unwrap_or(after).trim().to_string()
}

pub fn classify(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed == heartbeat_literal() {
        LineKind::Heartbeat
    } else if trimmed.contains(&format!(" {CHAT_KEYWORD} ")) {
        LineKind::Chat
    } else {
        LineKind::Other
    }
}

/// Split a leading `@tags` block from the rest of the line.
///
/// Untagged lines come back with an empty map and the line unchanged.
pub fn split_tags(line: &str) -> (Tags, &str) {
    let mut tags = Tags::new();
    let Some(body) = line.strip_prefix('@') else {
        return (tags, line);
    };

    let (raw_tags, rest) = match body.find(' ') {
        Some(space) => (&body[..space], body[space + 1..].trim_start()),
        None => (body, ""),
    };

    for pair in raw_tags.split(';').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, unescape_tag_value(v)),
            None => (pair, String::new()),
        };
        tags.insert(key.to_string(), value);
    }

    (tags, rest)
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

// ============================================================================
// Outbound lines
// ============================================================================

pub fn pass_line(secret: &str) -> String {
    format!("{CREDENTIAL_KEYWORD} {secret}")
}

pub fn nick_line(nickname: &str) -> String {
    format!("NICK {nickname}")
}

pub fn cap_req_line(capabilities: &[String]) -> String {
    format!("CAP REQ :{}", capabilities.join(" "))
}

pub fn join_line(channel: &str) -> String {
    format!("JOIN #{}", channel.trim_start_matches('#'))
}

pub fn part_line(channel: &str) -> String {
    format!("PART #{}", channel.trim_start_matches('#'))
}

pub fn privmsg_line(channel: &str, text: &str) -> String {
    format!("PRIVMSG #{} :{}", channel.trim_start_matches('#'), text)
}

pub fn pong_line() -> String {
    format!("PONG :{SERVER_LITERAL}")
}

/// Line as it may appear in logs. Credential lines are masked.
pub fn redact(line: &str) -> String {
    if line.starts_with(CREDENTIAL_KEYWORD) {
        format!("{CREDENTIAL_KEYWORD} ***")
    } else {
        line.to_string()
    }
}
