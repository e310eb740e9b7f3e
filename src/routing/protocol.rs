//! Protocol families.

use std::fmt;
use std::str::FromStr;

use crate::routing::error::RouteError;

/// Supported listener and request protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    /// Insecure member of this protocol's family.
    pub fn base(self) -> Protocol {
        Protocol::Http
    }

    /// Secure member of this protocol's family.
    pub fn secure(self) -> Protocol {
        Protocol::Https
    }

    pub fn is_secure(self) -> bool {
        self == self.secure()
    }

    /// Whether `other` is the base or secure variant of `self`.
    pub fn shares_family(self, other: Protocol) -> bool {
        self.base() == other || self.secure() == other
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Protocol::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Protocol::Https)
        } else {
            Err(RouteError::InvalidProtocol(s.to_string()))
        }
    }
}

/// Base protocol for a protocol name; `None` for unknown names.
pub fn base_protocol(name: &str) -> Option<Protocol> {
    name.parse::<Protocol>().ok().map(Protocol::base)
}

/// Secure protocol for a protocol name; `None` for unknown names.
pub fn secure_protocol(name: &str) -> Option<Protocol> {
    name.parse::<Protocol>().ok().map(Protocol::secure)
}

/// True iff `b` is the base or secure variant of `a`. Unknown names never match.
pub fn share_protocol_family(a: &str, b: &str) -> bool {
    match (a.parse::<Protocol>(), b.parse::<Protocol>()) {
        (Ok(a), Ok(b)) => a.shares_family(b),
        _ => false,
    }
}
