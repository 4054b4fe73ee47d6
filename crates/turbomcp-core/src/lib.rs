//! Shared primitives used by every other `turbomcp` crate: the error
//! taxonomy, the wire-visible `RequestId` type, session identifiers, and
//! cooperative cancellation tokens.

#![warn(missing_debug_implementations)]
#![warn(clippy::all)]

pub mod cancellation;
pub mod correlator;
pub mod error;
pub mod id;
pub mod session;

pub use cancellation::CancellationToken;
pub use correlator::{Correlator, Outcome};
pub use error::{Error, ErrorKind, Result};
pub use id::RequestId;
pub use session::SessionId;
