//! Well-known JSON-RPC method and notification names.

/// Server-exposed request methods.
pub mod request {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const PROMPTS_GET: &str = "prompts/get";
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_READ: &str = "resources/read";
    pub const COMPLETION_COMPLETE: &str = "completion/complete";
}

/// Client-exposed request methods, originated by the server.
pub mod server_originated {
    pub const ELICITATION_CREATE: &str = "elicitation/create";
}

/// Notification method names (no response expected either direction).
pub mod notification {
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const CANCELLED: &str = "notifications/cancelled";
    pub const PROGRESS: &str = "notifications/progress";
    pub const PROMPTS_LIST_CHANGED: &str = "prompts/list_changed";
    pub const RESOURCES_LIST_CHANGED: &str = "resources/list_changed";
    pub const TOOLS_LIST_CHANGED: &str = "tools/list_changed";
}
