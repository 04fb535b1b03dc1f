//! Server lifecycle states.

use std::fmt;

/// Lifecycle of a [`DualSurfaceServer`](crate::http::DualSurfaceServer).
///
/// Transitions only move forward:
/// `Unstarted → Joining → Serving → Terminated`. A startup error goes
/// straight from `Unstarted` or `Joining` to `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    Unstarted,
    Joining,
    Serving,
    Terminated,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Unstarted => "unstarted",
            ServerState::Joining => "joining",
            ServerState::Serving => "serving",
            ServerState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
