//! `completion/complete` payloads.

use serde::{Deserialize, Serialize};

/// Identifies what is being completed: a prompt argument or a resource
/// template parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionReference {
    #[serde(rename = "ref/prompt")]
    Prompt { name: String },
    #[serde(rename = "ref/resource")]
    Resource { uri: String },
}

impl CompletionReference {
    /// The identifier used as the second half of the `(refType, identifier)`
    /// registry key.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Prompt { name } => name,
            Self::Resource { uri } => uri,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prompt { .. } => "ref/prompt",
            Self::Resource { .. } => "ref/resource",
        }
    }
}

/// The argument being completed and its partial value so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionArgument {
    pub name: String,
    pub value: String,
}

/// Optional surrounding context a completion handler may use to narrow
/// suggestions (e.g. previously-resolved argument values).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionContext {
    #[serde(default)]
    pub arguments: std::collections::HashMap<String, String>,
}

/// Parameters of a `completion/complete` request.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionCompleteParams {
    #[serde(rename = "ref")]
    pub reference: CompletionReference,
    pub argument: CompletionArgument,
    #[serde(default)]
    pub context: Option<CompletionContext>,
}

/// A completion handler's suggestions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResult {
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(rename = "hasMore", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}
