//! Elicitation payloads: server-originated `elicitation/create` requests
//! and the client's resolved answer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters of a server-originated `elicitation/create` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationRequest {
    pub message: String,
    #[serde(rename = "requestedSchema")]
    pub requested_schema: Value,
}

/// How the user (via the client's handler) resolved an elicitation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElicitationAction {
    Accept,
    Decline,
    Cancel,
}

/// The client's answer to an `elicitation/create` request.
///
/// `content` MUST be present and satisfy `requestedSchema` when `action` is
/// `Accept`; absent otherwise. This invariant is enforced by the elicitation
/// subsystem (`turbomcp-server::elicitation`), not by this type alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitationResult {
    pub action: ElicitationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl ElicitationResult {
    pub fn accept(content: Value) -> Self {
        Self {
            action: ElicitationAction::Accept,
            content: Some(content),
        }
    }

    pub fn decline() -> Self {
        Self {
            action: ElicitationAction::Decline,
            content: None,
        }
    }

    pub fn cancel() -> Self {
        Self {
            action: ElicitationAction::Cancel,
            content: None,
        }
    }
}
