//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that parse but cannot
//! work. All errors are collected, not just the first.

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("hostname must not be empty")]
    EmptyHostname,

    #[error("hostname {0:?} is not a valid DNS label")]
    InvalidHostname(String),

    #[error("local_addr {0:?} is not a socket address")]
    InvalidLocalAddr(String),

    #[error("control_url {0:?} is not a valid URL")]
    InvalidControlUrl(String),

    #[error("timeouts.read_secs must be greater than zero")]
    ZeroReadTimeout,

    #[error("overlay.cert_path and overlay.key_path must be set together")]
    IncompleteTlsPair,
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.hostname.is_empty() {
        errors.push(ValidationError::EmptyHostname);
    } else if !is_dns_label(&config.hostname) {
        errors.push(ValidationError::InvalidHostname(config.hostname.clone()));
    }

    if config.local_addr.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidLocalAddr(config.local_addr.clone()));
    }

    if let Some(control_url) = &config.control_url {
        if url::Url::parse(control_url).is_err() {
            errors.push(ValidationError::InvalidControlUrl(control_url.clone()));
        }
    }

    if config.timeouts.read_secs == 0 {
        errors.push(ValidationError::ZeroReadTimeout);
    }

    if config.overlay.cert_path.is_some() != config.overlay.key_path.is_some() {
        errors.push(ValidationError::IncompleteTlsPair);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_dns_label(name: &str) -> bool {
    name.len() <= 63
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
