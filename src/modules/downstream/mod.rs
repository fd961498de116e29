//! Downstream (client-facing) JSON/WebSocket protocol and session handling.

pub mod protocol;
pub mod rate_limit;
pub mod session;

pub use protocol::{ClientMessage, Command, ServerMessage};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use session::{DownstreamDeps, DownstreamState};
