//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) and/or CLI flags
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → moved into DualSurfaceServer
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the server is constructed
//! - All fields except hostname and local address have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::HostOverlayConfig;
pub use schema::PeerConfig;
pub use schema::TimeoutConfig;
pub use validation::{validate_config, ValidationError};
