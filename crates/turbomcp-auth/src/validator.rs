//! Bearer token extraction and validation for the HTTP transport's
//! authentication gate.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use turbomcp_core::{Error, Result};

use crate::resource::audience_matches;

/// Standard registered claims this validator inspects; anything else in the
/// token is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub aud: Option<String>,
    pub iss: Option<String>,
    pub exp: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Resolves the decoding key for a token's header (`kid`/`alg`), typically
/// backed by a JWKS cache; kept as a trait so callers can plug in a static
/// key, a JWKS fetcher, or a test double without this crate depending on
/// an HTTP client for key retrieval.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn decoding_key(&self, kid: Option<&str>, alg: Algorithm) -> Result<DecodingKey>;
}

/// A fixed single key, for deployments with one signing key (or tests).
pub struct StaticKey {
    key: DecodingKey,
}

impl std::fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticKey").finish_non_exhaustive()
    }
}

impl StaticKey {
    pub fn new(key: DecodingKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl KeyProvider for StaticKey {
    async fn decoding_key(&self, _kid: Option<&str>, _alg: Algorithm) -> Result<DecodingKey> {
        Ok(self.key.clone())
    }
}

/// Validates bearer tokens against a configured resource identifier.
pub struct BearerTokenValidator {
    resource: String,
    issuer: Option<String>,
    clock_skew: Duration,
    allowed_algorithms: Vec<Algorithm>,
    keys: Box<dyn KeyProvider>,
}

impl std::fmt::Debug for BearerTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenValidator")
            .field("resource", &self.resource)
            .field("issuer", &self.issuer)
            .field("clock_skew", &self.clock_skew)
            .field("allowed_algorithms", &self.allowed_algorithms)
            .finish_non_exhaustive()
    }
}

impl BearerTokenValidator {
    pub fn new(resource: impl Into<String>, keys: Box<dyn KeyProvider>) -> Self {
        Self {
            resource: resource.into(),
            issuer: None,
            clock_skew: Duration::from_secs(60),
            allowed_algorithms: vec![Algorithm::ES256, Algorithm::RS256, Algorithm::PS256],
            keys,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// The resource identifier tokens must carry as their audience.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// `Authorization: Bearer <token>` → the raw token string.
    pub fn extract_from_header(authorization_header: &str) -> Result<&str> {
        let mut parts = authorization_header.splitn(2, char::is_whitespace);
        let scheme = parts.next().unwrap_or_default();
        let token = parts.next().map(str::trim).unwrap_or_default();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return Err(Error::invalid_params(
                "Authorization header must have the form: Bearer <token>",
            ));
        }
        Ok(token)
    }

    /// Validate signature, audience (must equal this server's resource
    /// identifier, compared in constant time), issuer (if configured), and
    /// expiry (with clock-skew leeway). Returns the decoded claims.
    pub async fn validate(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).map_err(|e| Error::authentication_failed(e.to_string()))?;
        if !self.allowed_algorithms.contains(&header.alg) {
            return Err(Error::authentication_failed(format!(
                "algorithm {:?} is not permitted",
                header.alg
            )));
        }
        let key = self.keys.decoding_key(header.kid.as_deref(), header.alg).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[&self.resource]);
        validation.leeway = self.clock_skew.as_secs();
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| Error::authentication_failed(e.to_string()))?;

        match &data.claims.aud {
            Some(aud) if audience_matches(aud, &self.resource) => {}
            _ => {
                return Err(Error::authentication_failed(format!(
                    "token audience does not match resource {}",
                    self.resource
                )))
            }
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_rejects_non_bearer_scheme() {
        assert!(BearerTokenValidator::extract_from_header("Basic xyz").is_err());
    }

    #[test]
    fn extract_rejects_missing_token() {
        assert!(BearerTokenValidator::extract_from_header("Bearer").is_err());
    }

    #[test]
    fn extract_accepts_bearer_case_insensitively() {
        assert_eq!(BearerTokenValidator::extract_from_header("bearer abc123").unwrap(), "abc123");
    }
}
