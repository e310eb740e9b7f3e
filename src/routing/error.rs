//! Routing error definitions.
//!
//! Configuration-time failures are [`RouteError`]s and abort the `add`/`redirect`
//! call that raised them. Request-time failures are [`DispatchError`]s and are
//! handed to the error responder instead of escaping the dispatch boundary.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised while building the routing table.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    /// A required argument was missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Protocol is not one of `http` or `https`.
    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    /// Redirect code is not 301 or 302.
    #[error("Invalid redirect code: {0}")]
    InvalidRedirectCode(u16),

    /// A `*` appeared somewhere other than the leading domain segment.
    #[error("Invalid wildcard specification in {0:?}: wildcards are only permitted as the first domain segment")]
    InvalidWildcard(String),

    /// A handler is already mounted for the hostname and protocol.
    #[error("Ambiguous application mount: {protocol} is already bound for hostname {hostname:?}")]
    AmbiguousMount { hostname: String, protocol: String },

    /// Redirect target cannot be honoured.
    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    /// The trie already holds a payload for this token path.
    #[error("Trie already contains an element for path {0:?}")]
    DuplicateRoute(String),

    /// Address string could not be parsed into a binding.
    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

/// Result type for routing table construction.
pub type RouteResult<T> = Result<T, RouteError>;

/// Errors raised while dispatching a single request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The resolved hostname could not be tokenized.
    #[error("Malformed hostname {hostname:?}")]
    InvalidHostname {
        hostname: String,
        #[source]
        source: RouteError,
    },

    /// TLS enforcement needs a host to redirect to and the request named none.
    #[error("Request has no host to redirect to")]
    MissingHost,
}

impl DispatchError {
    /// Status code handed to the error responder.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::InvalidHostname { .. } | DispatchError::MissingHost => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn dispatch_error_keeps_cause() {
        let err = DispatchError::InvalidHostname {
            hostname: "a.*.com".into(),
            source: RouteError::InvalidWildcard("a.*.com".into()),
        };

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let source = err.source().expect("source is preserved");
        assert!(source.to_string().contains("a.*.com"));
    }

    #[test]
    fn ambiguous_mount_message_names_slot() {
        let err = RouteError::AmbiguousMount {
            hostname: "example.com".into(),
            protocol: "https".into(),
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous application mount: https is already bound for hostname \"example.com\""
        );
    }
}
