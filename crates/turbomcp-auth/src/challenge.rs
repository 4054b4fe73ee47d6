//! Protected-resource metadata (RFC 9728) and the `WWW-Authenticate`
//! challenge emitted on 401/403.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Served from `GET /.well-known/oauth-protected-resource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
}

/// Served from `GET /.well-known/oauth-authorization-server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_authorization_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
}

/// The reason a request was rejected, surfaced in both the header and the
/// JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeReason {
    MissingToken,
    InvalidToken,
    InsufficientScope,
}

impl ChallengeReason {
    fn error_code(self) -> &'static str {
        match self {
            Self::MissingToken | Self::InvalidToken => "invalid_token",
            Self::InsufficientScope => "insufficient_scope",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::MissingToken => "Request did not include bearer token",
            Self::InvalidToken => "The access token is invalid or expired",
            Self::InsufficientScope => "The access token lacks the required scope",
        }
    }

    /// The HTTP status this reason maps to.
    pub fn status(self) -> u16 {
        match self {
            Self::MissingToken | Self::InvalidToken => 401,
            Self::InsufficientScope => 403,
        }
    }
}

/// Builds the `WWW-Authenticate: Bearer …` header and matching JSON body
/// for a rejected request, per RFC 6750 / RFC 9728.
#[derive(Debug, Clone)]
pub struct Challenge {
    resource: String,
    metadata_uri: String,
    reason: ChallengeReason,
    error_uri: Option<String>,
}

impl Challenge {
    pub fn new(resource: impl Into<String>, metadata_uri: impl Into<String>, reason: ChallengeReason) -> Self {
        Self {
            resource: resource.into(),
            metadata_uri: metadata_uri.into(),
            reason,
            error_uri: None,
        }
    }

    #[must_use]
    pub fn with_error_uri(mut self, uri: impl Into<String>) -> Self {
        self.error_uri = Some(uri.into());
        self
    }

    /// `Bearer resource="…", resource_metadata="…", error="…", error_description="…"[, error_uri="…"]`.
    pub fn www_authenticate_header(&self) -> String {
        let mut parts = vec![
            format!("resource=\"{}\"", self.resource),
            format!("resource_metadata=\"{}\"", self.metadata_uri),
            format!("error=\"{}\"", self.reason.error_code()),
            format!("error_description=\"{}\"", self.reason.description()),
        ];
        if let Some(uri) = &self.error_uri {
            parts.push(format!("error_uri=\"{uri}\""));
        }
        format!("Bearer {}", parts.join(", "))
    }

    /// `{error, error_description, error_uri, status}`.
    pub fn body(&self) -> Value {
        json!({
            "error": self.reason.error_code(),
            "error_description": self.reason.description(),
            "error_uri": self.error_uri,
            "status": self.reason.status(),
        })
    }

    pub fn status(&self) -> u16 {
        self.reason.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_challenge_matches_rfc_shape() {
        let challenge = Challenge::new(
            "https://example.com/mcp",
            "https://example.com/.well-known/oauth-protected-resource",
            ChallengeReason::MissingToken,
        );
        let header = challenge.www_authenticate_header();
        assert!(header.starts_with("Bearer resource=\"https://example.com/mcp\""));
        assert!(header.contains("resource_metadata=\"https://example.com/.well-known/oauth-protected-resource\""));
        assert!(header.contains("error=\"invalid_token\""));
        assert!(header.contains("error_description=\"Request did not include bearer token\""));
        assert_eq!(challenge.status(), 401);

        let body = challenge.body();
        assert_eq!(body["error"], "invalid_token");
        assert_eq!(body["status"], 401);
    }

    #[test]
    fn insufficient_scope_maps_to_403() {
        let challenge = Challenge::new("https://example.com/mcp", "https://example.com/meta", ChallengeReason::InsufficientScope);
        assert_eq!(challenge.status(), 403);
        assert!(challenge.www_authenticate_header().contains("insufficient_scope"));
    }
}
