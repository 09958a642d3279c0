//! # Helix Client
//!
//! Authenticated calls against the Twitch Helix API. Two error bodies get
//! special treatment: a missing token fails for good, an invalid token is
//! refreshed once and the call retried once. HTTP 429 responses are retried
//! after the server-provided reset time when a `RetryScheduler` is attached.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Refresh is skipped when another call already swapped the token
//! - 1.0.0: Initial release with OAuth refresh and rate-limit retries

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::credentials::{OAuthCredential, SecretStore};
use super::rate_limit::{parse_reset, RetryScheduler, RESET_HEADER};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody};
use crate::core::error::HelixError;

pub const HELIX_BASE: &str = "https://api.twitch.tv/helix/";
pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

const TOKEN_MISSING: &str = "OAuth token is missing";
const TOKEN_INVALID: &str = "Invalid OAuth token";

/// One Helix call, relative to the API base
#[derive(Debug, Clone, PartialEq)]
pub struct HelixCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HelixCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        HelixCall {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Lock key for rate-limit serialization
    fn endpoint_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Sentinel {
    TokenMissing,
    TokenInvalid,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn sentinel(body: &str) -> Option<Sentinel> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    if parsed.message.contains(TOKEN_MISSING) {
        Some(Sentinel::TokenMissing)
    } else if parsed.message.contains(TOKEN_INVALID) {
        Some(Sentinel::TokenInvalid)
    } else {
        None
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct HelixClient {
    client_id: String,
    client_secret: Option<String>,
    base_url: String,
    token_url: String,
    credential: RwLock<OAuthCredential>,
    refresh_lock: Mutex<()>,
    store: Arc<dyn SecretStore>,
    transport: Arc<dyn HttpTransport>,
    scheduler: Option<Arc<RetryScheduler>>,
}

impl HelixClient {
    pub fn new(
        client_id: impl Into<String>,
        credential: OAuthCredential,
        store: Arc<dyn SecretStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        HelixClient {
            client_id: client_id.into(),
            client_secret: None,
            base_url: HELIX_BASE.to_string(),
            token_url: TOKEN_URL.to_string(),
            credential: RwLock::new(credential),
            refresh_lock: Mutex::new(()),
            store,
            transport,
            scheduler: None,
        }
    }

    /// Needed for refresh grants
    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<RetryScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn scheduler(&self) -> Option<&Arc<RetryScheduler>> {
        self.scheduler.as_ref()
    }

    pub async fn access_token(&self) -> String {
        self.credential.read().await.access_token.clone()
    }

    /// Send `call` once with the current token. Returns the response and the
    /// token it was sent with.
    async fn send_once(&self, call: &HelixCall) -> Result<(HttpResponse, String), HelixError> {
        let token = self.access_token().await;

        let mut request = HttpRequest::new(call.method, format!("{}{}", self.base_url, call.path));
        request.query = call.query.clone();
        request.headers = vec![
            ("Authorization".to_string(), format!("Bearer {token}")),
            ("Client-Id".to_string(), self.client_id.clone()),
        ];
        if let Some(body) = &call.body {
            request.body = RequestBody::Json(body.clone());
        }

        let response = self.transport.send(request).await?;
        Ok((response, token))
    }

    /// One authenticated call. An invalid token gets exactly one refresh and
    /// one retry.
    pub async fn query(&self, call: &HelixCall) -> Result<String, HelixError> {
        let (response, used_token) = self.send_once(call).await?;

        if response.is_success() {
            return Ok(response.body);
        }

        match sentinel(&response.body) {
            Some(Sentinel::TokenMissing) => Err(HelixError::TokenMissing),
            Some(Sentinel::TokenInvalid) => {
                debug!("Token rejected on {}, refreshing", call.path);
                self.refresh_if_stale(&used_token).await?;

                let (retry, _) = self.send_once(call).await?;
                if retry.is_success() {
                    return Ok(retry.body);
                }
                match sentinel(&retry.body) {
                    Some(Sentinel::TokenInvalid) => Err(HelixError::AuthExpired),
                    Some(Sentinel::TokenMissing) => Err(HelixError::TokenMissing),
                    None => Err(status_error(retry)),
                }
            }
            None => Err(status_error(response)),
        }
    }

    /// `query` plus 429 handling: wait until `Ratelimit-Reset` and retry, up
    /// to the scheduler's ceiling. Without a scheduler a 429 is returned as is.
    ///
    /// A success body carrying the invalid-token message also gets one
    /// refresh, after which the call goes back through the same loop.
    pub async fn query_with_rate_limit_handling(
        &self,
        call: &HelixCall,
    ) -> Result<String, HelixError> {
        let request_id = Uuid::new_v4();
        let scheduler = self.scheduler.as_ref();
        let _guard = match scheduler {
            Some(scheduler) => Some(scheduler.lock(&call.endpoint_key()).await),
            None => None,
        };
        let mut state = scheduler.map(|scheduler| scheduler.state());
        let mut refreshed = false;

        loop {
            match self.query(call).await {
                Ok(body) if sentinel(&body) == Some(Sentinel::TokenInvalid) => {
                    if refreshed {
                        return Err(HelixError::AuthExpired);
                    }
                    warn!("[{request_id}] Token sentinel in a success body, refreshing");
                    self.refresh_access_token().await?;
                    refreshed = true;
                }
                Ok(body) => return Ok(body),
                Err(HelixError::RateLimited { reset_epoch }) => {
                    let (Some(scheduler), Some(state)) = (scheduler, state.as_mut()) else {
                        return Err(HelixError::RateLimited { reset_epoch });
                    };
                    let Some(wait) = state.schedule_retry(reset_epoch, scheduler.now()) else {
                        warn!(
                            "[{request_id}] ❌ {} still rate limited after {} retries",
                            call.path, state.retries
                        );
                        return Err(HelixError::RetriesExhausted {
                            retries: state.retries,
                        });
                    };
                    info!(
                        "[{request_id}] ⏳ Rate limited on {}, retry {} in {}s",
                        call.path,
                        state.retries,
                        wait.as_secs()
                    );
                    scheduler.wait(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Entry point for endpoint wrappers
    pub async fn call(&self, call: HelixCall) -> Result<String, HelixError> {
        self.query_with_rate_limit_handling(&call).await
    }

    /// Refresh unless another call already replaced `used_token`.
    async fn refresh_if_stale(&self, used_token: &str) -> Result<(), HelixError> {
        let _guard = self.refresh_lock.lock().await;
        if self.access_token().await != used_token {
            debug!("Token already refreshed by another call");
            return Ok(());
        }
        self.refresh_access_token_locked().await
    }

    /// Exchange the refresh token for a new pair, swap it in and persist it.
    ///
    /// Any failure here is a configuration problem and is not retried.
    pub async fn refresh_access_token(&self) -> Result<(), HelixError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_access_token_locked().await
    }

    async fn refresh_access_token_locked(&self) -> Result<(), HelixError> {
        let refresh_token = self
            .credential
            .read()
            .await
            .refresh_token
            .clone()
            .ok_or_else(|| HelixError::Configuration("no refresh token stored".into()))?;
        let client_secret = self
            .client_secret
            .clone()
            .ok_or_else(|| HelixError::Configuration("client secret not configured".into()))?;

        let mut request = HttpRequest::new(Method::Post, self.token_url.clone());
        request.body = RequestBody::Form(vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.clone()),
            ("client_id".to_string(), self.client_id.clone()),
            ("client_secret".to_string(), client_secret),
        ]);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| HelixError::Configuration(format!("token refresh failed: {e}")))?;
        if !response.is_success() {
            return Err(HelixError::Configuration(format!(
                "token refresh rejected with HTTP {}",
                response.status
            )));
        }

        let token: TokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            HelixError::Configuration(format!("unreadable token refresh response: {e}"))
        })?;
        let credential = OAuthCredential {
            access_token: token.access_token,
            refresh_token: token.refresh_token.or(Some(refresh_token)),
            expires_in: token.expires_in,
        };

        *self.credential.write().await = credential.clone();

        if let Err(e) = credential.persist(self.store.as_ref()) {
            warn!("Refreshed token could not be persisted: {e:#}");
        }
        info!("🔑 Access token refreshed");
        Ok(())
    }
}

fn status_error(response: HttpResponse) -> HelixError {
    if response.status == 429 {
        HelixError::RateLimited {
            reset_epoch: parse_reset(response.header(RESET_HEADER)),
        }
    } else {
        HelixError::Http {
            status: response.status,
            body: response.body,
        }
    }
}
