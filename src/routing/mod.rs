//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RouteRegistry::public(pattern, handler)       → loopback + overlay tables
//! RouteRegistry::overlay_only(pattern, handler) → overlay table
//! built-in diagnostics (at start)               → overlay table
//!     → into_routers() → (loopback Router, overlay Router)
//! ```
//!
//! # Design Decisions
//! - Tables are built once and immutable while serving
//! - Pattern matching is axum's; no custom routing language

pub mod registry;

pub use registry::RouteRegistry;
