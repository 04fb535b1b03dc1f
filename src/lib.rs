//! Dual-surface HTTP front door.
//!
//! Serves one set of routes on a loopback address and a superset on a
//! private overlay network (plain HTTP on 80, TLS on 443).

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod overlay;
pub mod routing;

pub use config::GatewayConfig;
pub use http::{DualSurfaceServer, ServerError};
pub use lifecycle::{ServerState, Shutdown, ShutdownReason};
pub use routing::RouteRegistry;
