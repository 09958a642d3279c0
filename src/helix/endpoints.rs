//! Thin Helix endpoint wrappers
//!
//! Each method binds its parameters to a path, query and body, picks the HTTP
//! method and hands the call to `HelixClient::call`. Bodies come back raw;
//! decoding is up to the caller.

use serde_json::{json, Map, Value};

use super::client::{HelixCall, HelixClient};
use crate::core::error::HelixError;

type HelixResult = Result<String, HelixError>;

/// Fields accepted by `modify_channel_info`. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ChannelUpdate {
    pub title: Option<String>,
    pub game_id: Option<String>,
    pub broadcaster_language: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ChannelUpdate {
    fn to_json(&self) -> Value {
        let mut body = Map::new();
        if let Some(title) = &self.title {
            body.insert("title".into(), json!(title));
        }
        if let Some(game_id) = &self.game_id {
            body.insert("game_id".into(), json!(game_id));
        }
        if let Some(language) = &self.broadcaster_language {
            body.insert("broadcaster_language".into(), json!(language));
        }
        if let Some(tags) = &self.tags {
            body.insert("tags".into(), json!(tags));
        }
        Value::Object(body)
    }
}

impl HelixClient {
    /// Look up several users by login
    pub async fn get_users(&self, logins: &[&str]) -> HelixResult {
        let call = logins
            .iter()
            .fold(HelixCall::get("users"), |call, login| call.query("login", login));
        self.call(call).await
    }

    pub async fn get_user(&self, login: &str) -> HelixResult {
        self.call(HelixCall::get("users").query("login", login)).await
    }

    /// Numeric id for `login`, or `None` when no such user exists
    pub async fn user_id(&self, login: &str) -> Result<Option<String>, HelixError> {
        let body = self.get_user(login).await?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| HelixError::Transport(format!("unreadable users response: {e}")))?;
        Ok(value["data"][0]["id"].as_str().map(str::to_string))
    }

    pub async fn start_raid(
        &self,
        from_broadcaster_id: &str,
        to_broadcaster_id: &str,
    ) -> HelixResult {
        self.call(
            HelixCall::post("raids")
                .query("from_broadcaster_id", from_broadcaster_id)
                .query("to_broadcaster_id", to_broadcaster_id),
        )
        .await
    }

    pub async fn cancel_raid(&self, broadcaster_id: &str) -> HelixResult {
        self.call(HelixCall::delete("raids").query("broadcaster_id", broadcaster_id))
            .await
    }

    pub async fn create_poll(
        &self,
        broadcaster_id: &str,
        title: &str,
        choices: &[&str],
        duration_secs: u32,
    ) -> HelixResult {
        let choices: Vec<Value> = choices.iter().map(|c| json!({ "title": c })).collect();
        self.call(HelixCall::post("polls").body(json!({
            "broadcaster_id": broadcaster_id,
            "title": title,
            "choices": choices,
            "duration": duration_secs,
        })))
        .await
    }

    /// End a poll. `archive` hides the results instead of showing them.
    pub async fn end_poll(
        &self,
        broadcaster_id: &str,
        poll_id: &str,
        archive: bool,
    ) -> HelixResult {
        let status = if archive { "ARCHIVED" } else { "TERMINATED" };
        self.call(HelixCall::patch("polls").body(json!({
            "broadcaster_id": broadcaster_id,
            "id": poll_id,
            "status": status,
        })))
        .await
    }

    pub async fn get_clips(&self, broadcaster_id: &str, first: u32) -> HelixResult {
        self.call(
            HelixCall::get("clips")
                .query("broadcaster_id", broadcaster_id)
                .query("first", first),
        )
        .await
    }

    pub async fn create_clip(&self, broadcaster_id: &str) -> HelixResult {
        self.call(HelixCall::post("clips").query("broadcaster_id", broadcaster_id))
            .await
    }

    pub async fn get_channel_info(&self, broadcaster_id: &str) -> HelixResult {
        self.call(HelixCall::get("channels").query("broadcaster_id", broadcaster_id))
            .await
    }

    pub async fn modify_channel_info(
        &self,
        broadcaster_id: &str,
        update: &ChannelUpdate,
    ) -> HelixResult {
        self.call(
            HelixCall::patch("channels")
                .query("broadcaster_id", broadcaster_id)
                .body(update.to_json()),
        )
        .await
    }

    pub async fn get_streams(&self, user_logins: &[&str]) -> HelixResult {
        let call = user_logins
            .iter()
            .fold(HelixCall::get("streams"), |call, login| call.query("user_login", login));
        self.call(call).await
    }

    pub async fn get_chatters(&self, broadcaster_id: &str, moderator_id: &str) -> HelixResult {
        self.call(
            HelixCall::get("chat/chatters")
                .query("broadcaster_id", broadcaster_id)
                .query("moderator_id", moderator_id),
        )
        .await
    }

    pub async fn send_shoutout(
        &self,
        from_broadcaster_id: &str,
        to_broadcaster_id: &str,
        moderator_id: &str,
    ) -> HelixResult {
        self.call(
            HelixCall::post("chat/shoutouts")
                .query("from_broadcaster_id", from_broadcaster_id)
                .query("to_broadcaster_id", to_broadcaster_id)
                .query("moderator_id", moderator_id),
        )
        .await
    }

    /// Ban `user_id`, or time them out when `duration_secs` is set
    pub async fn ban_user(
        &self,
        broadcaster_id: &str,
        moderator_id: &str,
        user_id: &str,
        duration_secs: Option<u32>,
        reason: &str,
    ) -> HelixResult {
        let mut data = json!({ "user_id": user_id, "reason": reason });
        if let Some(duration) = duration_secs {
            data["duration"] = json!(duration);
        }
        self.call(
            HelixCall::post("moderation/bans")
                .query("broadcaster_id", broadcaster_id)
                .query("moderator_id", moderator_id)
                .body(json!({ "data": data })),
        )
        .await
    }

    pub async fn unban_user(
        &self,
        broadcaster_id: &str,
        moderator_id: &str,
        user_id: &str,
    ) -> HelixResult {
        self.call(
            HelixCall::delete("moderation/bans")
                .query("broadcaster_id", broadcaster_id)
                .query("moderator_id", moderator_id)
                .query("user_id", user_id),
        )
        .await
    }

    pub async fn send_chat_announcement(
        &self,
        broadcaster_id: &str,
        moderator_id: &str,
        message: &str,
        color: Option<&str>,
    ) -> HelixResult {
        let mut body = json!({ "message": message });
        if let Some(color) = color {
            body["color"] = json!(color);
        }
        self.call(
            HelixCall::post("chat/announcements")
                .query("broadcaster_id", broadcaster_id)
                .query("moderator_id", moderator_id)
                .body(body),
        )
        .await
    }
}
