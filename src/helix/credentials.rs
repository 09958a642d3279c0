//! OAuth credential and the secret store it persists to
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.0.0: JSON file and in-memory secret stores

use anyhow::{Context, Result};
use dashmap::DashMap;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Named string secrets that survive restarts
pub trait SecretStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemorySecretStore {
    values: DashMap<String, String>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).map(|v| v.value().clone())
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// Flat JSON object on disk, rewritten on every `set`.
pub struct JsonFileSecretStore {
    path: PathBuf,
    values: DashMap<String, String>,
}

impl JsonFileSecretStore {
    /// Open `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = DashMap::new();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read secrets from {}", path.display()))?;
            let stored: BTreeMap<String, String> = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid secrets file {}", path.display()))?;
            for (name, value) in stored {
                values.insert(name, value);
            }
            debug!("Loaded {} secrets from {}", values.len(), path.display());
        }

        Ok(JsonFileSecretStore { path, values })
    }

    fn flush(&self) -> Result<()> {
        let snapshot: BTreeMap<String, String> = self
            .values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write secrets to {}", self.path.display()))
    }
}

impl SecretStore for JsonFileSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).map(|v| v.value().clone())
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.values.insert(name.to_string(), value.to_string());
        self.flush()
    }
}

/// Access/refresh token pair. Debug output never shows the tokens.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthCredential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until expiry, as reported by the token endpoint
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl OAuthCredential {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        OAuthCredential {
            access_token: access_token.into(),
            refresh_token,
            expires_in: None,
        }
    }

    /// Read the stored pair; `None` without an access token.
    pub fn load(store: &dyn SecretStore) -> Option<Self> {
        let access_token = store.get(ACCESS_TOKEN_KEY)?;
        Some(OAuthCredential::new(
            access_token,
            store.get(REFRESH_TOKEN_KEY),
        ))
    }

    pub fn persist(&self, store: &dyn SecretStore) -> Result<()> {
        store.set(ACCESS_TOKEN_KEY, &self.access_token)?;
        match &self.refresh_token {
            Some(refresh) => store.set(REFRESH_TOKEN_KEY, refresh),
            None => {
                warn!("Persisting credential without a refresh token");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tmi-relay-{}-{name}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySecretStore::new();
        assert!(OAuthCredential::load(&store).is_none());

        OAuthCredential::new("abc", Some("def".into()))
            .persist(&store)
            .unwrap();
        let loaded = OAuthCredential::load(&store).unwrap();
        assert_eq!(loaded.access_token, "abc");
        assert_eq!(loaded.refresh_token.as_deref(), Some("def"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_path("reopen");
        {
            let store = JsonFileSecretStore::open(&path).unwrap();
            store.set(ACCESS_TOKEN_KEY, "first").unwrap();
            store.set(ACCESS_TOKEN_KEY, "second").unwrap();
        }
        let reopened = JsonFileSecretStore::open(&path).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("second"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let path = temp_path("garbage");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonFileSecretStore::open(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_debug_hides_tokens() {
        let credential = OAuthCredential::new("secret-access", Some("secret-refresh".into()));
        let printed = format!("{credential:?}");
        assert!(!printed.contains("secret-access"));
        assert!(!printed.contains("secret-refresh"));
    }
}
