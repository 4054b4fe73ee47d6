//! Content payloads: a closed, `type`-tagged union (design note iv), not a
//! class hierarchy. New variants are added here, never by subclassing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of content returned from a tool call, prompt message, or resource
/// read. Tagged on `type` so peers can deserialize without prior knowledge of
/// which variant is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Plain UTF-8 text.
    Text { text: String },
    /// A pointer to a resource rather than inline bytes.
    ResourceLink {
        uri: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// Inline binary content, base64-encoded per the JSON-RPC transport's
    /// text-only framing.
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn resource_link(uri: impl Into<String>) -> Self {
        Self::ResourceLink {
            uri: uri.into(),
            name: None,
            mime_type: None,
        }
    }

    /// The inline text, if this is a `Text` variant.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Arbitrary `_meta` bag carried by several envelope shapes; kept as an
/// opaque JSON object rather than modeled field-by-field.
pub type Meta = Option<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_content_tags_as_text() {
        let content = Content::text("hello");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn resource_link_omits_absent_optional_fields() {
        let content = Content::resource_link("file:///a.txt");
        let json = serde_json::to_value(&content).unwrap();
        assert!(json.get("name").is_none());
        assert!(json.get("mimeType").is_none());
    }
}
