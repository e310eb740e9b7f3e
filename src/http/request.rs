//! Request inspection.
//!
//! # Responsibilities
//! - Resolve the request protocol (TLS, trusted `X-Forwarded-Proto`)
//! - Resolve the externally visible host (trusted `X-Forwarded-Host`, `Host`, URI authority)
//! - Capture the original path and query for redirects
//!
//! # Design Decisions
//! - Forwarded headers are only read when the peer passes the trust predicate (hop 0)
//! - Only the first value of a comma-separated forwarded header is used
//! - The routing hostname is lower-cased and stripped of its port

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, Request};

use crate::routing::hostname::split_host_port;
use crate::routing::protocol::Protocol;
use crate::security::TrustProxy;

pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Request extension inserted by listeners that terminated TLS themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsConnection;

/// Routing-relevant view of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// Effective protocol of the request.
    pub protocol: Protocol,
    /// Externally visible `host[:port]`, as sent by the client or proxy.
    pub host: String,
    /// Lower-cased hostname without port, used for trie lookup.
    pub hostname: String,
    /// Original path and query string.
    pub path_and_query: String,
    /// The peer passed the trust predicate, so its forwarded headers were used.
    pub trusted_proxy: bool,
}

impl RequestInfo {
    pub fn resolve<B>(req: &Request<B>, trust: &TrustProxy) -> Self {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let trusted = trust.is_trusted(peer, 0);
        let headers = req.headers();

        let mut protocol = if req.extensions().get::<TlsConnection>().is_some() {
            Protocol::Https
        } else {
            Protocol::Http
        };
        if trusted {
            if let Some(forwarded) = first_value(headers, &X_FORWARDED_PROTO).and_then(|v| v.parse().ok()) {
                protocol = forwarded;
            }
        }

        let host = trusted
            .then(|| first_value(headers, &X_FORWARDED_HOST))
            .flatten()
            .or_else(|| first_value(headers, &header::HOST))
            .or_else(|| req.uri().authority().map(|a| a.as_str()))
            .unwrap_or_default()
            .to_string();

        let hostname = split_host_port(&host).0.to_ascii_lowercase();

        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();

        Self {
            protocol,
            host,
            hostname,
            path_and_query,
            trusted_proxy: trusted,
        }
    }

    pub fn is_secure(&self) -> bool {
        self.protocol.is_secure()
    }
}

fn first_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then_some(first)
}
