//! Transport variants sharing one abstract contract.

#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub mod stdio;
pub mod traits;

#[cfg(feature = "http")]
pub mod http_sse;

pub use traits::{Transport, TransportState};
