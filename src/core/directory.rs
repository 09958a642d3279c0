//! In-memory lookup of users and channels seen on the event path
//!
//! Owned by the event-processing task, so it is never mutated concurrently.

use std::collections::HashMap;

use crate::core::models::{Channel, ChatEvent, Membership, User};

#[derive(Debug, Default)]
pub struct ChatDirectory {
    users: HashMap<String, User>,
    channels: HashMap<String, Channel>,
    last_user: Option<String>,
    last_channel: Option<String>,
    last_message: Option<String>,
}

impl ChatDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chat event: create or refresh its user and channel.
    pub fn observe(&mut self, event: &ChatEvent) {
        let login = event.sender.login.clone();
        let user = self
            .users
            .entry(login.clone())
            .or_insert_with(|| event.sender.clone());
        user.id = event.sender.id.clone();
        user.display_name = event.sender.display_name.clone();
        user.last_seen = event.timestamp;
        user.last_channel = Some(event.channel.name.clone());
        user.last_message = Some(event.text.clone());

        let channel = self
            .channels
            .entry(event.channel.name.clone())
            .or_insert_with(|| event.channel.clone());
        if event.channel.id != event.channel.name {
            channel.id = event.channel.id.clone();
        }

        self.last_user = Some(login);
        self.last_channel = Some(event.channel.name.clone());
        self.last_message = Some(event.text.clone());
    }

    /// Mark `joined` channels as joined and every other known channel as left.
    pub fn sync_membership(&mut self, joined: &[String]) {
        for name in joined {
            self.channels
                .entry(name.clone())
                .or_insert_with(|| Channel::new(name));
        }
        for (name, channel) in self.channels.iter_mut() {
            channel.membership = if joined.contains(name) {
                Membership::Joined
            } else {
                Membership::Left
            };
        }
    }

    pub fn user(&self, login: &str) -> Option<&User> {
        self.users.get(&login.to_lowercase())
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&name.trim_start_matches('#').to_lowercase())
    }

    pub fn last_user(&self) -> Option<&User> {
        self.last_user.as_deref().and_then(|login| self.users.get(login))
    }

    pub fn last_channel(&self) -> Option<&Channel> {
        self.last_channel.as_deref().and_then(|name| self.channels.get(name))
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
