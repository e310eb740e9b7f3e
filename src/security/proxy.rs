//! Reverse-proxy trust.
//!
//! `X-Forwarded-Host` and `X-Forwarded-Proto` are client-controlled unless the
//! connecting peer is a proxy we operate. The predicate decides, per peer and
//! hop index, whether those headers may be believed.

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

type Predicate = dyn Fn(Option<IpAddr>, usize) -> bool + Send + Sync;

/// Predicate deciding whether a peer's forwarded headers are trusted.
///
/// The peer is `None` when the connection has no IP address (UNIX sockets).
#[derive(Clone)]
pub struct TrustProxy {
    predicate: Arc<Predicate>,
}

impl TrustProxy {
    /// Never trust forwarded headers.
    pub fn none() -> Self {
        Self::from_fn(|_, _| false)
    }

    /// Trust forwarded headers from any peer.
    pub fn all() -> Self {
        Self::from_fn(|_, _| true)
    }

    /// Trust only the listed peer addresses.
    pub fn addresses(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        let addrs: HashSet<IpAddr> = addrs.into_iter().collect();
        Self::from_fn(move |peer, _| peer.is_some_and(|ip| addrs.contains(&ip)))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(Option<IpAddr>, usize) -> bool + Send + Sync + 'static,
    {
        Self { predicate: Arc::new(f) }
    }

    pub fn is_trusted(&self, peer: Option<IpAddr>, hop: usize) -> bool {
        (self.predicate)(peer, hop)
    }
}

impl Default for TrustProxy {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for TrustProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustProxy").finish_non_exhaustive()
    }
}
