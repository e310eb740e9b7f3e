//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Addresses parse, redirect codes are 301/302, aliases have a primary
//! - TLS entries name an https listener that something is mounted on
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function of the config apart from checking certificate files exist

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::schema::{AppConfig, VhostConfig};
use crate::net::address::{parse_address, ListenerId};
use crate::routing::hostname::WILDCARD;
use crate::routing::{Protocol, RedirectCode};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path to the offending value, e.g. `mounts[0].address`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &VhostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut listeners = HashSet::new();

    check_redirect_code("redirect_code", Some(config.redirect_code), &mut errors);

    for (i, mount) in config.mounts.iter().enumerate() {
        let field = |name: &str| format!("mounts[{i}].{name}");

        if let Some(id) = check_address(&field("address"), &mount.address, &mut errors) {
            listeners.insert(id);
        }
        check_redirect_code(&field("redirect_code"), mount.redirect_code, &mut errors);

        if !mount.aliases.is_empty() {
            let single = match mount.hostnames.as_slice() {
                [single] => single != WILDCARD && !single.starts_with("*."),
                _ => false,
            };
            if !single {
                errors.push(ValidationError::new(
                    field("aliases"),
                    "aliases require exactly one non-wildcard hostname",
                ));
            }
        }

        match &mount.app {
            AppConfig::Static { status, .. } => {
                if StatusCode::from_u16(*status).is_err() {
                    errors.push(ValidationError::new(
                        field("app.status"),
                        format!("{status} is not an HTTP status"),
                    ));
                }
            }
            AppConfig::Upstream { url } => {
                let ok = url::Url::parse(url)
                    .map(|u| u.scheme() == "http" && u.host().is_some())
                    .unwrap_or(false);
                if !ok {
                    errors.push(ValidationError::new(
                        field("app.url"),
                        format!("{url:?} is not an absolute http URL"),
                    ));
                }
            }
        }
    }

    for (i, redirect) in config.redirects.iter().enumerate() {
        let field = |name: &str| format!("redirects[{i}].{name}");

        if let Some(id) = check_address(&field("address"), &redirect.address, &mut errors) {
            listeners.insert(id);
        }
        check_redirect_code(&field("redirect_code"), redirect.redirect_code, &mut errors);
        if redirect.from.is_empty() {
            errors.push(ValidationError::new(field("from"), "at least one alias is required"));
        }
        if redirect.to.trim().is_empty() {
            errors.push(ValidationError::new(field("to"), "redirect target is required"));
        }
    }

    for (i, tls) in config.tls.iter().enumerate() {
        let field = |name: &str| format!("tls[{i}].{name}");

        match parse_address(&tls.address) {
            Ok(binding) if binding.protocol != Protocol::Https => {
                errors.push(ValidationError::new(field("address"), "TLS listeners must use https"))
            }
            Ok(binding) if binding.domain_socket => errors.push(ValidationError::new(
                field("address"),
                "TLS is not supported on domain sockets",
            )),
            Ok(binding) if !listeners.contains(&binding.identity()) => errors.push(ValidationError::new(
                field("address"),
                "nothing is mounted on this listener",
            )),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::new(field("address"), e.to_string())),
        }

        for (name, path) in [("cert_path", &tls.cert_path), ("key_path", &tls.key_path)] {
            if !path.exists() {
                errors.push(ValidationError::new(
                    field(name),
                    format!("{} does not exist", path.display()),
                ));
            }
        }
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", observability.log_level),
        ));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &str, address: &str, errors: &mut Vec<ValidationError>) -> Option<ListenerId> {
    match parse_address(address) {
        Ok(binding) => Some(binding.identity()),
        Err(e) => {
            errors.push(ValidationError::new(field, e.to_string()));
            None
        }
    }
}

fn check_redirect_code(field: &str, code: Option<u16>, errors: &mut Vec<ValidationError>) {
    if let Some(code) = code {
        if let Err(e) = RedirectCode::try_from(code) {
            errors.push(ValidationError::new(field, e.to_string()));
        }
    }
}
