//! Hostname tokenization.
//!
//! # Responsibilities
//! - Split `host[:port]` into trie tokens, most significant label first
//! - Keep IPv4 literals, IPv6 literals and dotless names as a single token
//! - Reject wildcards anywhere but the leading label
//!
//! # Design Decisions
//! - Tokens borrow from the input; no allocation per lookup
//! - The iterator is `Clone`, so one tokenization can be walked many times
//! - Case is not normalized here; callers lower-case first

use std::net::Ipv4Addr;

use crate::routing::error::{RouteError, RouteResult};

/// Token reserved for the wildcard segment.
pub const WILDCARD: &str = "*";

/// Lazy sequence of hostname tokens: reversed labels, then the port if any.
///
/// `mail.example.com:8080` yields `com`, `example`, `mail`, `8080`.
#[derive(Debug, Clone)]
pub struct HostnameTokens<'a> {
    rest: Option<&'a str>,
    single: bool,
    port: Option<&'a str>,
}

impl<'a> Iterator for HostnameTokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(rest) = self.rest else {
            return self.port.take();
        };

        if self.single {
            self.rest = None;
            return Some(rest);
        }

        match rest.rfind('.') {
            Some(idx) => {
                self.rest = Some(&rest[..idx]);
                Some(&rest[idx + 1..])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

/// Tokenize a hostname, validating wildcard placement.
pub fn tokenize(hostname: &str) -> RouteResult<HostnameTokens<'_>> {
    if let Some(pos) = hostname.rfind('*') {
        let leading = pos == 0 && matches!(hostname.as_bytes().get(1), None | Some(b'.') | Some(b':'));
        if !leading {
            return Err(RouteError::InvalidWildcard(hostname.to_string()));
        }
    }

    let (host, port) = split_host_port(hostname);
    let single = host.starts_with('[') || !host.contains('.') || host.parse::<Ipv4Addr>().is_ok();

    Ok(HostnameTokens {
        rest: Some(host),
        single,
        port,
    })
}

/// Split `host[:port]` at the port separator. Bracketed IPv6 hosts keep their
/// inner colons. An empty port counts as no port.
pub fn split_host_port(value: &str) -> (&str, Option<&str>) {
    let split = if value.starts_with('[') {
        value
            .find(']')
            .and_then(|end| value[end + 1..].strip_prefix(':').map(|_| end + 1))
    } else {
        value.find(':')
    };

    match split {
        Some(idx) => {
            let port = &value[idx + 1..];
            (&value[..idx], (!port.is_empty()).then_some(port))
        }
        None => (value, None),
    }
}
