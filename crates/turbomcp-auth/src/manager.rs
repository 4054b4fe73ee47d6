//! Client-side OAuth token acquisition and caching.
//!
//! When a request receives a 401 with a Bearer challenge, a [`TokenManager`]
//! is consulted: it dispatches to one of three [`ProviderStrategy`]
//! implementations, caches the result per resource, and single-flights
//! refreshes so concurrent callers for the same resource share one exchange.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use turbomcp_core::{Error, Result};

use crate::challenge::AuthorizationServerMetadata;

/// A token snapshot as returned by a token endpoint exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl OAuthTokenResponse {
    /// Treated expired when `now >= expiresAt - skew`.
    fn is_expired(&self, skew: ChronoDuration) -> bool {
        match self.expires_at {
            Some(exp) => Utc::now() >= exp - skew,
            None => false,
        }
    }
}

/// One of the three ways a client can obtain a token.
#[async_trait]
pub trait ProviderStrategy: Send + Sync {
    async fn fetch_token(
        &self,
        http: &reqwest::Client,
        metadata: &AuthorizationServerMetadata,
    ) -> Result<OAuthTokenResponse>;
}

/// RFC 6749 §4.4 client-credentials grant: no user interaction, suited to
/// service-to-service calls.
#[derive(Debug)]
pub struct ClientCredentialsProvider {
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

#[async_trait]
impl ProviderStrategy for ClientCredentialsProvider {
    async fn fetch_token(
        &self,
        http: &reqwest::Client,
        metadata: &AuthorizationServerMetadata,
    ) -> Result<OAuthTokenResponse> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }
        exchange(http, &metadata.token_endpoint, &form).await
    }
}

/// RFC 8628 device authorization grant: the user completes sign-in on a
/// second device while this provider polls the token endpoint.
pub struct DeviceCodeProvider {
    pub client_id: String,
    pub scope: Option<String>,
    /// Invoked with the verification URI and user code for display.
    pub on_prompt: Arc<dyn Fn(&str, &str) + Send + Sync>,
    pub poll_interval: std::time::Duration,
}

impl std::fmt::Debug for DeviceCodeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeProvider")
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderStrategy for DeviceCodeProvider {
    async fn fetch_token(
        &self,
        http: &reqwest::Client,
        metadata: &AuthorizationServerMetadata,
    ) -> Result<OAuthTokenResponse> {
        let device_endpoint = metadata
            .device_authorization_endpoint
            .as_ref()
            .ok_or_else(|| Error::internal("authorization server does not advertise device_authorization_endpoint"))?;

        let mut form = vec![("client_id", self.client_id.as_str())];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }
        #[derive(Deserialize)]
        struct DeviceAuth {
            device_code: String,
            user_code: String,
            verification_uri: String,
            #[serde(default = "default_interval")]
            interval: u64,
        }
        fn default_interval() -> u64 {
            5
        }

        let resp = http
            .post(device_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::internal(format!("device authorization request failed: {e}")))?;
        let auth: DeviceAuth = resp
            .json()
            .await
            .map_err(|e| Error::internal(format!("malformed device authorization response: {e}")))?;

        (self.on_prompt)(&auth.verification_uri, &auth.user_code);

        let interval = std::cmp::max(self.poll_interval, std::time::Duration::from_secs(auth.interval));
        loop {
            tokio::time::sleep(interval).await;
            let poll_form = [
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                ("device_code", auth.device_code.as_str()),
                ("client_id", self.client_id.as_str()),
            ];
            match exchange(http, &metadata.token_endpoint, &poll_form).await {
                Ok(token) => return Ok(token),
                Err(_) => continue,
            }
        }
    }
}

/// RFC 7636 authorization-code grant with PKCE. The authorization step
/// (redirecting the user, capturing the callback's `code`) happens outside
/// this crate; this provider exchanges an already-obtained code and verifier.
#[derive(Debug)]
pub struct AuthorizationCodePkceProvider {
    pub client_id: String,
    pub redirect_uri: String,
    pub code: String,
    pub code_verifier: String,
}

#[async_trait]
impl ProviderStrategy for AuthorizationCodePkceProvider {
    async fn fetch_token(
        &self,
        http: &reqwest::Client,
        metadata: &AuthorizationServerMetadata,
    ) -> Result<OAuthTokenResponse> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", self.code.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("code_verifier", self.code_verifier.as_str()),
        ];
        exchange(http, &metadata.token_endpoint, &form).await
    }
}

async fn exchange(http: &reqwest::Client, token_endpoint: &str, form: &[(&str, &str)]) -> Result<OAuthTokenResponse> {
    let resp = http
        .post(token_endpoint)
        .form(form)
        .send()
        .await
        .map_err(|e| Error::internal(format!("token request failed: {e}")))?;
    if !resp.status().is_success() {
        return Err(Error::authentication_failed(format!(
            "token endpoint returned {}",
            resp.status()
        )));
    }
    #[derive(Deserialize)]
    struct TokenEndpointResponse {
        access_token: String,
        expires_in: Option<i64>,
        refresh_token: Option<String>,
        #[serde(default)]
        scope: Option<String>,
    }
    let body: TokenEndpointResponse = resp
        .json()
        .await
        .map_err(|e| Error::internal(format!("malformed token response: {e}")))?;

    Ok(OAuthTokenResponse {
        access_token: body.access_token,
        expires_at: body.expires_in.map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        refresh_token: body.refresh_token,
        scopes: body
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    })
}

/// Caches tokens per resource URI; refresh is single-flighted per key so
/// concurrent callers for the same resource share one exchange rather than
/// stampeding the token endpoint.
pub struct TokenManager {
    http: reqwest::Client,
    cache: Mutex<HashMap<String, OAuthTokenResponse>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    skew: ChronoDuration,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager").finish_non_exhaustive()
    }
}

impl Default for TokenManager {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: Mutex::new(HashMap::new()),
            locks: DashMap::new(),
            skew: ChronoDuration::seconds(30),
        }
    }
}

impl TokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the authorization-server metadata document referenced by a
    /// protected-resource's `authorization_servers[0]`.
    pub async fn discover(&self, issuer: &str) -> Result<AuthorizationServerMetadata> {
        let url = format!("{}/.well-known/oauth-authorization-server", issuer.trim_end_matches('/'));
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::internal(format!("authorization server discovery failed: {e}")))?;
        resp.json()
            .await
            .map_err(|e| Error::internal(format!("malformed authorization server metadata: {e}")))
    }

    /// Returns a cached, non-expired token for `resource`, or runs `strategy`
    /// to obtain one. At most one exchange runs per resource at a time.
    pub async fn token_for(
        &self,
        resource: &str,
        metadata: &AuthorizationServerMetadata,
        strategy: &dyn ProviderStrategy,
    ) -> Result<OAuthTokenResponse> {
        if let Some(cached) = self.cache.lock().await.get(resource) {
            if !cached.is_expired(self.skew) {
                return Ok(cached.clone());
            }
        }

        let lock = self
            .locks
            .entry(resource.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Re-check: another caller may have refreshed while we waited for the lock.
        if let Some(cached) = self.cache.lock().await.get(resource) {
            if !cached.is_expired(self.skew) {
                return Ok(cached.clone());
            }
        }

        let token = strategy.fetch_token(&self.http, metadata).await?;
        self.cache.lock().await.insert(resource.to_string(), token.clone());
        Ok(token)
    }

    /// Invalidate a cached token, e.g. after a 401 despite a cached token.
    pub async fn invalidate(&self, resource: &str) {
        self.cache.lock().await.remove(resource);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider(OAuthTokenResponse);

    #[async_trait]
    impl ProviderStrategy for FixedProvider {
        async fn fetch_token(&self, _http: &reqwest::Client, _metadata: &AuthorizationServerMetadata) -> Result<OAuthTokenResponse> {
            Ok(self.0.clone())
        }
    }

    fn metadata() -> AuthorizationServerMetadata {
        AuthorizationServerMetadata {
            issuer: "https://auth.example.com".into(),
            authorization_endpoint: "https://auth.example.com/authorize".into(),
            token_endpoint: "https://auth.example.com/token".into(),
            jwks_uri: "https://auth.example.com/jwks".into(),
            device_authorization_endpoint: None,
            registration_endpoint: None,
        }
    }

    #[tokio::test]
    async fn caches_token_until_expiry() {
        let manager = TokenManager::new();
        let provider = FixedProvider(OAuthTokenResponse {
            access_token: "tok1".into(),
            expires_at: Some(Utc::now() + ChronoDuration::minutes(5)),
            refresh_token: None,
            scopes: vec![],
        });
        let first = manager.token_for("https://api.example.com/mcp", &metadata(), &provider).await.unwrap();
        assert_eq!(first.access_token, "tok1");

        // Same resource, different provider response: cache hit means the
        // new provider is never even consulted.
        let provider2 = FixedProvider(OAuthTokenResponse {
            access_token: "tok2".into(),
            expires_at: Some(Utc::now() + ChronoDuration::minutes(5)),
            refresh_token: None,
            scopes: vec![],
        });
        let second = manager.token_for("https://api.example.com/mcp", &metadata(), &provider2).await.unwrap();
        assert_eq!(second.access_token, "tok1");
    }

    #[tokio::test]
    async fn expired_token_triggers_refresh() {
        let manager = TokenManager::new();
        let expired = FixedProvider(OAuthTokenResponse {
            access_token: "expired".into(),
            expires_at: Some(Utc::now() - ChronoDuration::seconds(1)),
            refresh_token: None,
            scopes: vec![],
        });
        manager.token_for("https://api.example.com/mcp", &metadata(), &expired).await.unwrap();

        let fresh = FixedProvider(OAuthTokenResponse {
            access_token: "fresh".into(),
            expires_at: Some(Utc::now() + ChronoDuration::minutes(5)),
            refresh_token: None,
            scopes: vec![],
        });
        let refreshed = manager.token_for("https://api.example.com/mcp", &metadata(), &fresh).await.unwrap();
        assert_eq!(refreshed.access_token, "fresh");
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let manager = TokenManager::new();
        let provider = FixedProvider(OAuthTokenResponse {
            access_token: "tok1".into(),
            expires_at: Some(Utc::now() + ChronoDuration::minutes(5)),
            refresh_token: None,
            scopes: vec![],
        });
        manager.token_for("https://api.example.com/mcp", &metadata(), &provider).await.unwrap();
        manager.invalidate("https://api.example.com/mcp").await;

        let provider2 = FixedProvider(OAuthTokenResponse {
            access_token: "tok2".into(),
            expires_at: Some(Utc::now() + ChronoDuration::minutes(5)),
            refresh_token: None,
            scopes: vec![],
        });
        let result = manager.token_for("https://api.example.com/mcp", &metadata(), &provider2).await.unwrap();
        assert_eq!(result.access_token, "tok2");
    }
}
