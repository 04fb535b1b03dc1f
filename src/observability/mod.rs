//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (request counters and latencies per surface)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → GET /metrics on the overlay surface (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
