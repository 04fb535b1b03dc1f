//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Loopback: bind(local_addr) → serve_plain
//! Overlay:  OverlaySession::listen(80)  → serve_plain
//!           OverlaySession::listen(443) → serve_tls (tls.rs resolver)
//!     → Hand off to the axum router of that surface
//! ```
//!
//! # Design Decisions
//! - Listeners are bound before serving so bind errors surface early
//! - TLS certificates are resolved per handshake, never cached here
//! - One shutdown `Handle` per listener

pub mod listener;
pub mod tls;
