//! Typed client facade for MCP: connect over any [`turbomcp_transport::Transport`],
//! issue typed RPCs, and subscribe to inbound notifications.
//!
//! Start from [`client::Client::connect`].

#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub mod catalog;
pub mod client;
pub mod elicitation;

pub use client::{Client, NotificationEvent};
pub use elicitation::{DeclineByDefault, ElicitationHandler};

pub mod prelude {
    pub use crate::catalog::PromptResourceCatalog;
    pub use crate::client::{Client, NotificationEvent};
    pub use crate::elicitation::{DeclineByDefault, ElicitationHandler};
}
