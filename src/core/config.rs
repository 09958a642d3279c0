//! # Configuration
//!
//! Environment settings (loaded through dotenvy by the binary) plus the YAML
//! command configuration that drives tier resolution.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Command tiers and canned responses moved to a YAML file
//! - 1.0.0: Environment-based configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::error::ConfigError;
use crate::irc::connector::DEFAULT_SERVER;

/// Default location of the persisted OAuth tokens
pub const DEFAULT_SECRETS_PATH: &str = "secrets.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub nickname: String,
    /// Chat password, `oauth:<token>`
    pub secret: String,
    pub channels: Vec<String>,
    pub server: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub secrets_path: String,
    pub commands_path: Option<String>,
    pub relay_enabled: bool,
    pub reconnect_delay_secs: u64,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let nickname = get("TWITCH_NICKNAME").ok_or(ConfigError::Missing("TWITCH_NICKNAME"))?;
        let mut secret = get("TWITCH_SECRET").ok_or(ConfigError::Missing("TWITCH_SECRET"))?;
        if !secret.starts_with("oauth:") {
            secret = format!("oauth:{secret}");
        }

        let channels = get("TWITCH_CHANNELS")
            .map(|raw| {
                raw.split(',')
                    .map(|c| c.trim().trim_start_matches('#').to_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let relay_enabled = match get("RELAY_ENABLED") {
            None => false,
            Some(v) => parse_bool("RELAY_ENABLED", &v)?,
        };

        let reconnect_delay_secs = match get("RECONNECT_DELAY_SECS") {
            None => 5,
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                key: "RECONNECT_DELAY_SECS".into(),
                reason: format!("not a number: {v}"),
            })?,
        };

        Ok(Config {
            nickname: nickname.to_lowercase(),
            secret,
            channels,
            server: get("TWITCH_SERVER").unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            client_id: get("TWITCH_CLIENT_ID"),
            client_secret: get("TWITCH_CLIENT_SECRET"),
            secrets_path: get("SECRETS_PATH").unwrap_or_else(|| DEFAULT_SECRETS_PATH.to_string()),
            commands_path: get("COMMANDS_CONFIG"),
            relay_enabled,
            reconnect_delay_secs,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Ok(true),
        "0" | "false" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            reason: format!("expected a boolean, got {value}"),
        }),
    }
}

fn default_prefixes() -> Vec<String> {
    vec!["!".to_string()]
}

/// Command routing configuration
///
/// ```yaml
/// prefixes: ["!", "?"]
/// whitelist: ["12345", "trusted_mod"]
/// public: [ping, uptime, help]
/// whitelisted: [so]
/// private: [join, leave, stop]
/// responses:
///   discord: "https://discord.gg/example"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandConfig {
    /// Tried in order, first match wins
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,

    /// User ids or logins allowed to run whitelisted commands
    #[serde(default)]
    pub whitelist: Vec<String>,

    #[serde(default)]
    pub public: Vec<String>,

    #[serde(default)]
    pub whitelisted: Vec<String>,

    #[serde(default)]
    pub private: Vec<String>,

    /// Canned replies keyed by command name
    #[serde(default)]
    pub responses: HashMap<String, String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        CommandConfig {
            prefixes: default_prefixes(),
            whitelist: Vec::new(),
            public: Vec::new(),
            whitelisted: Vec::new(),
            private: Vec::new(),
            responses: HashMap::new(),
        }
    }
}

impl CommandConfig {
    /// Load and validate a YAML command configuration
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: CommandConfig = serde_yaml::from_str(contents)?;
        config.normalized()
    }

    /// Lowercase command names and whitelist entries, reject empty prefixes.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        if self.prefixes.is_empty() {
            self.prefixes = default_prefixes();
        }
        if self.prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                key: "prefixes".into(),
                reason: "prefixes must not be empty".into(),
            });
        }

        for list in [
            &mut self.public,
            &mut self.whitelisted,
            &mut self.private,
            &mut self.whitelist,
        ] {
            for name in list.iter_mut() {
                *name = name.trim().to_lowercase();
            }
            list.retain(|name| !name.is_empty());
        }

        for name in self.public.iter().chain(&self.whitelisted).chain(&self.private) {
            if name.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid {
                    key: "commands".into(),
                    reason: format!("command name contains whitespace: {name}"),
                });
            }
        }

        self.responses = self
            .responses
            .into_iter()
            .map(|(name, reply)| (name.trim().to_lowercase(), reply))
            .collect();

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_lookup_minimal() {
        let config = Config::from_lookup(lookup(&[
            ("TWITCH_NICKNAME", "RelayBot"),
            ("TWITCH_SECRET", "abc123"),
        ]))
        .unwrap();

        assert_eq!(config.nickname, "relaybot");
        assert_eq!(config.secret, "oauth:abc123");
        assert!(config.channels.is_empty());
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.secrets_path, DEFAULT_SECRETS_PATH);
        assert!(!config.relay_enabled);
        assert_eq!(config.reconnect_delay_secs, 5);
    }

    #[test]
    fn test_from_lookup_channels_and_flags() {
        let config = Config::from_lookup(lookup(&[
            ("TWITCH_NICKNAME", "bot"),
            ("TWITCH_SECRET", "oauth:abc"),
            ("TWITCH_CHANNELS", "#Bob, carol,,"),
            ("RELAY_ENABLED", "true"),
        ]))
        .unwrap();

        assert_eq!(config.secret, "oauth:abc");
        assert_eq!(config.channels, vec!["bob", "carol"]);
        assert!(config.relay_enabled);
    }

    #[test]
    fn test_missing_secret_is_error() {
        let err = Config::from_lookup(lookup(&[("TWITCH_NICKNAME", "bot"), ("TWITCH_SECRET", " ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TWITCH_SECRET")));

        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TWITCH_NICKNAME")));
    }

    #[test]
    fn test_invalid_bool() {
        let err = Config::from_lookup(lookup(&[
            ("TWITCH_NICKNAME", "bot"),
            ("TWITCH_SECRET", "x"),
            ("RELAY_ENABLED", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_command_config_defaults() {
        let config = CommandConfig::from_yaml("public: [Ping]").unwrap();
        assert_eq!(config.prefixes, vec!["!"]);
        assert_eq!(config.public, vec!["ping"]);
        assert!(config.responses.is_empty());
    }

    #[test]
    fn test_command_config_full() {
        let yaml = r#"
prefixes: ["?", "!"]
whitelist: ["12345", "TrustedMod"]
public: [ping, uptime]
whitelisted: [so]
private: [join, leave, stop]
responses:
  Discord: "https://discord.gg/example"
"#;
        let config = CommandConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.prefixes, vec!["?", "!"]);
        assert_eq!(config.whitelist, vec!["12345", "trustedmod"]);
        assert_eq!(config.private.len(), 3);
        assert_eq!(
            config.responses.get("discord").map(String::as_str),
            Some("https://discord.gg/example")
        );
    }

    #[test]
    fn test_command_config_rejects_blank_prefix() {
        assert!(CommandConfig::from_yaml("prefixes: [\"\"]").is_err());
    }

    #[test]
    fn test_command_config_rejects_bad_yaml() {
        assert!(matches!(
            CommandConfig::from_yaml("public: {not: [a list"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
