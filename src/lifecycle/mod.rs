//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! State (state.rs):
//!     Unstarted → Joining → Serving → Terminated
//!
//! Shutdown (shutdown.rs):
//!     /quitquitquit | Ctrl+C | Shutdown::trigger → stop all listeners → run() returns
//!
//! Signals (signals.rs):
//!     SIGINT → Shutdown::trigger(Signal)
//! ```
//!
//! # Design Decisions
//! - Ordered startup: overlay join first, listeners last
//! - No restart: a terminated server stays terminated
//! - Shutdown does not drain in-flight requests

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::{Shutdown, ShutdownReason, ShutdownSignal};
pub use state::ServerState;
