//! Client-side elicitation handling.

use async_trait::async_trait;
use turbomcp_protocol::types::ElicitationResult;

/// Resolves an incoming `elicitation/create` request into an answer. Set on
/// the client via [`crate::client::Client::set_elicitation_handler`]; may be
/// cleared at runtime by passing `None`.
#[async_trait]
pub trait ElicitationHandler: Send + Sync {
    async fn handle(&self, message: String, requested_schema: serde_json::Value) -> ElicitationResult;
}

#[async_trait]
impl<F> ElicitationHandler for F
where
    F: Fn(String, serde_json::Value) -> ElicitationResult + Send + Sync,
{
    async fn handle(&self, message: String, requested_schema: serde_json::Value) -> ElicitationResult {
        (self)(message, requested_schema)
    }
}

/// The default behavior when no handler is set: decline.
#[derive(Debug)]
pub struct DeclineByDefault;

#[async_trait]
impl ElicitationHandler for DeclineByDefault {
    async fn handle(&self, _message: String, _requested_schema: serde_json::Value) -> ElicitationResult {
        ElicitationResult::decline()
    }
}
