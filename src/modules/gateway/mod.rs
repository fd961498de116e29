//! Accept loop, session bookkeeping and the HTTP health/metrics surface.

pub mod health;
pub mod registry;
pub mod server;

pub use health::GatewayMetrics;
pub use registry::ConnectionRegistry;
pub use server::Gateway;
