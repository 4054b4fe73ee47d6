//! HTTP + SSE transport: a POST channel for client→server frames and
//! a long-lived `text/event-stream` GET channel for server→client frames.
//!
//! Per design note (v), only the outbound-only server transport variant is
//! implemented: [`server::SseHub`] is an ingress host that feeds inbound
//! frames to whatever dispatcher owns the session, and a per-session
//! [`server::SseServerTransport`] only ever *writes* onto the stream channel
//! directly; there is no event-based callback surface.

pub mod auth;
pub mod client;
pub mod server;

pub use auth::AuthGate;
pub use client::{SseClientConfig, SseClientTransport};
pub use server::{SseHub, SseServerTransport};
