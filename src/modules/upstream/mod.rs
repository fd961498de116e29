//! Upstream (broker) connectivity: handshake state machine, frame
//! correlation and the events a session emits toward its owner.

pub mod correlation;
pub mod events;
pub mod session;

pub use events::UpstreamEvent;
pub use session::{HandshakeState, UpstreamCredentials, UpstreamSession, UpstreamSessionConfig};
