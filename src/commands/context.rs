//! Parsed command invocations
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Invocation carries its chat event and resolved tier
//! - 1.0.0: Initial implementation with shared handler state

use std::fmt;
use uuid::Uuid;

use crate::core::models::ChatEvent;

/// Authorization class a command was resolved under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Public,
    Whitelisted,
    Private,
    ResponseOnly,
    None,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Public => "public",
            Tier::Whitelisted => "whitelisted",
            Tier::Private => "private",
            Tier::ResponseOnly => "response-only",
            Tier::None => "none",
        };
        f.write_str(name)
    }
}

/// One command found in a chat message. Built per event, dropped after dispatch.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub request_id: Uuid,
    pub prefix: String,
    /// Lowercased command token
    pub name: String,
    pub args: Vec<String>,
    pub event: ChatEvent,
    pub tier: Tier,
    pub reply: Option<String>,
}

impl CommandInvocation {
    /// Match `event.text` against `prefixes` in order; the first match wins.
    ///
    /// Returns `None` when no prefix matches or nothing follows the prefix.
    pub fn parse(event: &ChatEvent, prefixes: &[String]) -> Option<Self> {
        let prefix = prefixes
            .iter()
            .find(|p| !p.is_empty() && event.text.starts_with(p.as_str()))?;

        let mut tokens = event.text[prefix.len()..].split_whitespace();
        let name = tokens.next()?.to_lowercase();
        let args = tokens.map(str::to_string).collect();

        Some(CommandInvocation {
            request_id: Uuid::new_v4(),
            prefix: prefix.clone(),
            name,
            args,
            event: event.clone(),
            tier: Tier::None,
            reply: None,
        })
    }

    /// Arguments joined back into one string
    pub fn rest(&self) -> String {
        self.args.join(" ")
    }

    pub fn sender(&self) -> &str {
        &self.event.sender.login
    }

    pub fn channel(&self) -> &str {
        &self.event.channel.name
    }
}
