//! The OAuth 2.0 protected-resource authentication gate that fronts the
//! HTTP transport.
//!
//! Server side: [`validator::BearerTokenValidator`] extracts and validates
//! bearer tokens, [`challenge::Challenge`] builds the `WWW-Authenticate`
//! response for rejected requests, and [`resource::canonicalize_resource_uri`]
//! normalizes the `resource`/`aud` identifier per RFC 8707.
//!
//! Client side: [`manager::TokenManager`] caches tokens per resource and
//! dispatches to one of three [`manager::ProviderStrategy`] implementations.

#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub mod challenge;
pub mod manager;
pub mod resource;
pub mod validator;

pub use challenge::{AuthorizationServerMetadata, Challenge, ChallengeReason, ProtectedResourceMetadata};
pub use manager::{OAuthTokenResponse, ProviderStrategy, TokenManager};
pub use resource::canonicalize_resource_uri;
pub use validator::{BearerTokenValidator, Claims, KeyProvider};

pub mod prelude {
    pub use crate::challenge::{Challenge, ChallengeReason};
    pub use crate::manager::{OAuthTokenResponse, ProviderStrategy, TokenManager};
    pub use crate::resource::canonicalize_resource_uri;
    pub use crate::validator::{BearerTokenValidator, Claims};
}
