//! The OAuth 2.0 protected-resource gate fronting the HTTP+SSE transport:
//! a bearer-token-checking middleware plus the unauthenticated
//! `.well-known` discovery routes it points clients at on rejection.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use turbomcp_auth::{
    AuthorizationServerMetadata, BearerTokenValidator, Challenge, ChallengeReason,
    ProtectedResourceMetadata,
};

/// Bundles the validator with the metadata served to unauthenticated
/// clients so they can discover how to obtain a token.
pub struct AuthGate {
    validator: Arc<BearerTokenValidator>,
    metadata_uri: String,
    protected_resource: Arc<ProtectedResourceMetadata>,
    authorization_server: Arc<AuthorizationServerMetadata>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("metadata_uri", &self.metadata_uri)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    pub fn new(
        validator: BearerTokenValidator,
        metadata_uri: impl Into<String>,
        authorization_server: AuthorizationServerMetadata,
    ) -> Self {
        let metadata_uri = metadata_uri.into();
        let protected_resource = ProtectedResourceMetadata {
            resource: validator.resource().to_string(),
            authorization_servers: vec![authorization_server.issuer.clone()],
        };
        Self {
            validator: Arc::new(validator),
            metadata_uri,
            protected_resource: Arc::new(protected_resource),
            authorization_server: Arc::new(authorization_server),
        }
    }

    /// The unauthenticated discovery routes: `/.well-known/oauth-protected-resource`
    /// and `/.well-known/oauth-authorization-server`. Merge this *before*
    /// layering [`Self::middleware`] onto the routes it guards, or the
    /// discovery routes themselves get gated.
    pub fn metadata_router(&self) -> Router {
        Router::new()
            .route(
                "/.well-known/oauth-protected-resource",
                get(serve_protected_resource_metadata),
            )
            .route(
                "/.well-known/oauth-authorization-server",
                get(serve_authorization_server_metadata),
            )
            .with_state(self.clone_state())
    }

    fn clone_state(&self) -> MetadataState {
        MetadataState {
            protected_resource: self.protected_resource.clone(),
            authorization_server: self.authorization_server.clone(),
        }
    }
}

#[derive(Clone)]
struct MetadataState {
    protected_resource: Arc<ProtectedResourceMetadata>,
    authorization_server: Arc<AuthorizationServerMetadata>,
}

async fn serve_protected_resource_metadata(State(state): State<MetadataState>) -> impl IntoResponse {
    Json((*state.protected_resource).clone())
}

async fn serve_authorization_server_metadata(State(state): State<MetadataState>) -> impl IntoResponse {
    Json((*state.authorization_server).clone())
}

/// Rejects any request without a valid bearer token whose audience matches
/// this gate's resource identifier, with a `WWW-Authenticate` challenge
/// pointing at the discovery routes above.
pub async fn auth_gate_middleware(
    State(gate): State<Arc<AuthGate>>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(header) = header else {
        return challenge_response(&gate, ChallengeReason::MissingToken);
    };

    let token = match BearerTokenValidator::extract_from_header(header) {
        Ok(token) => token,
        Err(_) => return challenge_response(&gate, ChallengeReason::InvalidToken),
    };

    if gate.validator.validate(token).await.is_err() {
        return challenge_response(&gate, ChallengeReason::InvalidToken);
    }

    next.run(request).await
}

fn challenge_response(gate: &AuthGate, reason: ChallengeReason) -> Response {
    let challenge = Challenge::new(gate.validator.resource(), gate.metadata_uri.clone(), reason);
    let status = StatusCode::from_u16(challenge.status()).unwrap_or(StatusCode::UNAUTHORIZED);
    let header = HeaderValue::from_str(&challenge.www_authenticate_header())
        .unwrap_or_else(|_| HeaderValue::from_static("Bearer"));
    let mut response = (status, Json(challenge.body())).into_response();
    response
        .headers_mut()
        .insert(axum::http::header::WWW_AUTHENTICATE, header);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use tower::ServiceExt as _;
    use turbomcp_auth::validator::StaticKey;

    fn test_gate() -> AuthGate {
        let key = jsonwebtoken::DecodingKey::from_secret(b"unused-in-these-tests");
        let validator = BearerTokenValidator::new("https://mcp.example.com", Box::new(StaticKey::new(key)));
        let authorization_server = AuthorizationServerMetadata {
            issuer: "https://auth.example.com".into(),
            authorization_endpoint: "https://auth.example.com/authorize".into(),
            token_endpoint: "https://auth.example.com/token".into(),
            jwks_uri: "https://auth.example.com/jwks".into(),
            device_authorization_endpoint: None,
            registration_endpoint: None,
        };
        AuthGate::new(
            validator,
            "https://mcp.example.com/.well-known/oauth-protected-resource",
            authorization_server,
        )
    }

    #[tokio::test]
    async fn missing_bearer_token_is_rejected_with_challenge() {
        let gate = Arc::new(test_gate());
        let router = Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(gate, auth_gate_middleware));

        let response = router
            .oneshot(Request::builder().uri("/protected").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(axum::http::header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn protected_resource_metadata_is_served_unauthenticated() {
        let gate = test_gate();
        let router = gate.metadata_router();

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/.well-known/oauth-protected-resource")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
