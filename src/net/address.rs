//! Address parsing for listener bindings and redirect targets.
//!
//! # Formats
//! ```text
//! [scheme://]host:port            TCP listener, scheme defaults to http
//! [scheme://]*:port               all interfaces (also 0.0.0.0 or empty host)
//! [scheme://]unix:/abs/path       UNIX domain socket
//! [scheme://]unix:./rel/path      UNIX domain socket relative to the cwd
//! ```
//!
//! Redirect targets are `[scheme://]host[:port]` with no path.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::routing::error::{RouteError, RouteResult};
use crate::routing::hostname::split_host_port;
use crate::routing::protocol::Protocol;

/// Interface value meaning "every interface".
pub const ALL_INTERFACES: &str = "*";

const UNIX_PREFIX: &str = "unix:";

/// A parsed listener address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub protocol: Protocol,
    /// Hostname, IP literal, `*`, or absolute socket path.
    pub interface: String,
    pub port: Option<u16>,
    pub domain_socket: bool,
}

/// Identity of a physical listener. Protocol is deliberately absent: one
/// socket may serve an https mount and its insecure redirect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId {
    pub interface: String,
    pub port: Option<u16>,
}

impl Binding {
    pub fn identity(&self) -> ListenerId {
        ListenerId {
            interface: self.interface.clone(),
            port: self.port,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.domain_socket {
            return write!(f, "{}://{}{}", self.protocol, UNIX_PREFIX, self.interface);
        }
        write!(f, "{}://{}", self.protocol, self.interface)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.interface, port),
            None => f.write_str(&self.interface),
        }
    }
}

/// Parse a listener address into a [`Binding`].
pub fn parse_address(address: &str) -> RouteResult<Binding> {
    let invalid = |reason: &str| RouteError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let (protocol, rest) = split_scheme(address.trim(), Protocol::Http)?;

    if let Some(path) = strip_prefix_ignore_case(rest, UNIX_PREFIX) {
        let interface = if path.starts_with('/') {
            normalize(Path::new(path))
        } else if path.starts_with("./") || path.starts_with("../") {
            let cwd = std::env::current_dir().map_err(|e| invalid(&e.to_string()))?;
            normalize(&cwd.join(path))
        } else {
            return Err(invalid("domain socket path must be absolute or start with ./ or ../"));
        };

        return Ok(Binding {
            protocol,
            interface: interface.to_string_lossy().into_owned(),
            port: None,
            domain_socket: true,
        });
    }

    if rest.contains('/') {
        return Err(invalid("address cannot contain a path"));
    }

    let (host, port) = split_host_port(rest);
    let interface = match host {
        "" | ALL_INTERFACES | "0.0.0.0" => ALL_INTERFACES.to_string(),
        host => {
            url::Host::parse(host).map_err(|e| invalid(&e.to_string()))?;
            host.to_ascii_lowercase()
        }
    };

    let port = port
        .and_then(|p| p.parse::<u16>().ok())
        .filter(|p| *p != 0)
        .ok_or_else(|| invalid("bind port required"))?;

    Ok(Binding {
        protocol,
        interface,
        port: Some(port),
        domain_socket: false,
    })
}

/// Where a hostname alias sends browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    pub protocol: Protocol,
    pub host: String,
    pub port: Option<u16>,
}

impl Authority {
    /// Parse a redirect target. A missing scheme falls back to `default_protocol`.
    pub fn parse(target: &str, default_protocol: Protocol) -> RouteResult<Self> {
        let invalid = |reason: &str| RouteError::InvalidRedirect(format!("{target:?}: {reason}"));

        let (protocol, rest) = split_scheme(target.trim(), default_protocol)?;

        if strip_prefix_ignore_case(rest, UNIX_PREFIX).is_some() {
            return Err(invalid("cannot redirect to a domain socket"));
        }

        let rest = rest.strip_suffix('/').unwrap_or(rest);
        if rest.contains('/') {
            return Err(invalid("redirect target cannot contain a path"));
        }

        let (host, port) = split_host_port(rest);
        if host.is_empty() {
            return Err(invalid("hostname required"));
        }
        url::Host::parse(host).map_err(|e| invalid(&e.to_string()))?;

        let port = match port {
            Some(p) => Some(p.parse::<u16>().map_err(|_| invalid("invalid port"))?),
            None => None,
        };

        Ok(Self {
            protocol,
            host: host.to_ascii_lowercase(),
            port,
        })
    }

    /// Redirect location for a request path, preserved verbatim.
    pub fn location(&self, path_and_query: &str) -> String {
        format!("{}{}", self, path_and_query)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

// Scheme-less `host:port` and `unix:/path` forms are not URLs, so `url::Url` cannot parse them.
fn split_scheme(value: &str, default: Protocol) -> RouteResult<(Protocol, &str)> {
    match value.split_once("://") {
        Some((scheme, rest)) => Ok((scheme.parse()?, rest)),
        None => Ok((default, value)),
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..])
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp(protocol: Protocol, interface: &str, port: u16) -> Binding {
        Binding {
            protocol,
            interface: interface.into(),
            port: Some(port),
            domain_socket: false,
        }
    }

    #[test]
    fn parses_tcp_addresses() {
        assert_eq!(parse_address("http://127.0.0.1:8000").unwrap(), tcp(Protocol::Http, "127.0.0.1", 8000));
        assert_eq!(parse_address("HTTPS://LocalHost:8443").unwrap(), tcp(Protocol::Https, "localhost", 8443));
        assert_eq!(parse_address("localhost:8000").unwrap(), tcp(Protocol::Http, "localhost", 8000));
    }

    #[test]
    fn all_interfaces_shorthand() {
        assert_eq!(parse_address("http://*:8000").unwrap(), tcp(Protocol::Http, "*", 8000));
        assert_eq!(parse_address("http://0.0.0.0:8000").unwrap(), tcp(Protocol::Http, "*", 8000));
        assert_eq!(parse_address("http://:8000").unwrap(), tcp(Protocol::Http, "*", 8000));
    }

    #[test]
    fn port_required_for_tcp() {
        assert!(matches!(parse_address("http://127.0.0.1"), Err(RouteError::InvalidAddress { .. })));
        assert!(matches!(parse_address("http://127.0.0.1:0"), Err(RouteError::InvalidAddress { .. })));
        assert!(matches!(parse_address("http://127.0.0.1:http"), Err(RouteError::InvalidAddress { .. })));
    }

    #[test]
    fn unknown_scheme_rejected() {
        assert_eq!(parse_address("ftp://localhost:21"), Err(RouteError::InvalidProtocol("ftp".into())));
    }

    #[test]
    fn domain_sockets() {
        let binding = parse_address("http://unix:/foo/bar").unwrap();
        assert_eq!(binding.interface, "/foo/bar");
        assert_eq!(binding.port, None);
        assert!(binding.domain_socket);

        let binding = parse_address("https://unix:./foo/bar").unwrap();
        let expected = std::env::current_dir().unwrap().join("foo").join("bar");
        assert_eq!(binding.protocol, Protocol::Https);
        assert_eq!(binding.interface, expected.to_string_lossy());
    }

    #[test]
    fn socket_paths_need_prefix() {
        assert!(parse_address("http:///foo/bar").is_err());
        assert!(parse_address("http://./foo/bar").is_err());
        assert!(parse_address("http://unix:foo/bar").is_err());
    }

    #[test]
    fn display_round_trips() {
        for address in [
            "http://127.0.0.1:8000",
            "https://*:8443",
            "http://example.com:80",
            "http://unix:/tmp/app.sock",
        ] {
            let parsed = parse_address(address).unwrap();
            assert_eq!(parsed.to_string(), address);
            assert_eq!(parse_address(&parsed.to_string()).unwrap(), parsed);
        }
    }

    #[test]
    fn identity_ignores_protocol() {
        let a = parse_address("http://localhost:8000").unwrap();
        let b = parse_address("https://localhost:8000").unwrap();
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.identity().to_string(), "localhost:8000");
    }

    #[test]
    fn redirect_targets() {
        let target = Authority::parse("example.com", Protocol::Http).unwrap();
        assert_eq!(target.location("/"), "http://example.com/");

        let target = Authority::parse("http://Example.com:8000/", Protocol::Https).unwrap();
        assert_eq!(target.location("/a?b=c"), "http://example.com:8000/a?b=c");

        let target = Authority::parse("example.com", Protocol::Https).unwrap();
        assert_eq!(target.protocol, Protocol::Https);
    }

    #[test]
    fn redirect_targets_rejected() {
        assert!(matches!(
            Authority::parse("http://unix:/tmp/sock", Protocol::Http),
            Err(RouteError::InvalidRedirect(_))
        ));
        assert!(matches!(
            Authority::parse("example.com/path", Protocol::Http),
            Err(RouteError::InvalidRedirect(_))
        ));
        assert!(matches!(Authority::parse("", Protocol::Http), Err(RouteError::InvalidRedirect(_))));
    }
}
