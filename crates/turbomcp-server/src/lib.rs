//! Session lifecycle, dispatcher, and service registries for MCP servers.
//!
//! Start from [`builder::ServerBuilder`]: register tools/prompts/resources/
//! completions, then [`builder::ServerBuilder::build`] into a shared
//! [`dispatcher::Dispatcher`] and hand each accepted transport to
//! [`builder::accept_session`].

#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub mod builder;
pub mod dispatcher;
pub mod elicitation;
pub mod registry;
pub mod session;

pub use builder::{accept_session, ServerBuilder};
pub use dispatcher::Dispatcher;
pub use session::{Session, SessionState, SharedSession};

pub mod prelude {
    pub use crate::builder::{accept_session, ServerBuilder};
    pub use crate::registry::{CompletionRegistry, InvocationContext, PromptRegistry, ResourceRegistry, ToolRegistry};
    pub use crate::session::{Session, SessionState};
    pub use turbomcp_protocol::types::{
        Content, ResourceContent, ResourceDescriptor, ToolCallResult, ToolDescriptor,
    };
}
