//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("dualgate-{}-{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_valid_file() {
        let path = write_temp(
            "valid.toml",
            "hostname = \"web\"\nlocal_addr = \"127.0.0.1:8081\"\nenable_overlay = false\n",
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.hostname, "web");
        assert!(!config.enable_overlay);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn reports_validation_errors() {
        let path = write_temp("invalid.toml", "local_addr = \"127.0.0.1:8081\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: hostname must not be empty");
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn reports_missing_file() {
        let err = load_config(Path::new("/nonexistent/dualgate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
