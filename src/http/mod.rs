//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! RouteRegistry (user routes)
//!     → debug.rs (debug bundle, overlay only)
//!     → diagnostics.rs (/metrics, /who, /quitquitquit, overlay only)
//!     → server.rs (middleware stack, listeners, lifecycle)
//!     → loopback surface | overlay surface (80, 443)
//! ```

pub mod debug;
pub mod diagnostics;
pub mod server;

pub use server::{DualSurfaceServer, ServerError};
