//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::VhostConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<VhostConfig, ConfigError> {
    let config: VhostConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<VhostConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AppConfig, TrustMode, TrustProxyConfig};

    #[test]
    fn parses_full_file() {
        let config = parse_config(
            r#"
            redirect_code = 301
            trust_proxy = ["127.0.0.1", "::1"]

            [observability]
            log_level = "debug"

            [[mounts]]
            address = "http://localhost:8000"
            hostnames = ["example.com"]
            aliases = ["www.example.com"]
            app = { type = "static", status = 204 }

            [[mounts]]
            address = "http://localhost:8000"
            hostnames = ["api.example.com"]
            app = { type = "upstream", url = "http://127.0.0.1:3000" }

            [[redirects]]
            address = "http://localhost:8000"
            from = ["example.org", "example.net"]
            to = "example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.redirect_code, 301);
        assert!(matches!(config.trust_proxy, TrustProxyConfig::Addresses(ref a) if a.len() == 2));
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.mounts.len(), 2);
        assert_eq!(
            config.mounts[0].app,
            AppConfig::Static {
                status: 204,
                body: String::new()
            }
        );
        assert_eq!(config.redirects[0].from.len(), 2);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.redirect_code, 302);
        assert_eq!(config.trust_proxy, TrustProxyConfig::Mode(TrustMode::None));
        assert!(config.mounts.is_empty());
    }

    #[test]
    fn reports_parse_and_validation_errors() {
        assert!(matches!(parse_config("mounts = 3"), Err(ConfigError::Parse(_))));

        let err = parse_config(
            r#"
            redirect_code = 307
            [[mounts]]
            address = "http://localhost"
            app = { type = "static" }
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/vhost.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
