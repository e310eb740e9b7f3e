//! Per-listener hostname routing.
//!
//! # Responsibilities
//! - Own the wildcard trie for one listener
//! - Bind applications, aliases and TLS enforcement to hostname + protocol
//! - Decide, per request, whether to forward, redirect, or report not-found
//!
//! # Design Decisions
//! - One entry per hostname path, one slot per protocol within it
//! - Registration validates everything before touching the trie
//! - Immutable once handed to a listener (shared via `Arc`, no locks)

use std::sync::Arc;

use axum::http::StatusCode;

use crate::http::application::Application;
use crate::http::request::RequestInfo;
use crate::http::response::ErrorResponder;
use crate::http::service::RouterService;
use crate::net::address::{Authority, Binding};
use crate::routing::error::{DispatchError, RouteError, RouteResult};
use crate::routing::hostname::{split_host_port, tokenize, WILDCARD};
use crate::routing::protocol::Protocol;
use crate::routing::trie::WildcardTrie;
use crate::security::TrustProxy;

/// Status used for alias and TLS-enforcement redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RedirectCode {
    /// 301
    MovedPermanently,
    /// 302
    #[default]
    Found,
}

impl RedirectCode {
    pub fn status(self) -> StatusCode {
        match self {
            RedirectCode::MovedPermanently => StatusCode::MOVED_PERMANENTLY,
            RedirectCode::Found => StatusCode::FOUND,
        }
    }
}

impl TryFrom<u16> for RedirectCode {
    type Error = RouteError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            301 => Ok(RedirectCode::MovedPermanently),
            302 => Ok(RedirectCode::Found),
            other => Err(RouteError::InvalidRedirectCode(other)),
        }
    }
}

/// Options for a single hostname registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptions {
    pub redirect_code: RedirectCode,
    /// Also answer insecure requests with a redirect to the secure protocol.
    pub force_tls: bool,
}

/// What a protocol slot of a route entry does.
#[derive(Debug, Clone)]
pub enum Slot {
    Application(Application),
    Redirect { target: Authority, code: RedirectCode },
    ForceTls { code: RedirectCode },
}

/// Protocol-indexed slots stored at one trie node.
#[derive(Debug, Clone, Default)]
pub struct RouteEntry {
    slots: [Option<Slot>; 2],
}

impl RouteEntry {
    pub fn get(&self, protocol: Protocol) -> Option<&Slot> {
        self.slots[slot_index(protocol)].as_ref()
    }

    pub fn contains(&self, protocol: Protocol) -> bool {
        self.get(protocol).is_some()
    }

    fn insert(&mut self, protocol: Protocol, slot: Slot) {
        self.slots[slot_index(protocol)] = Some(slot);
    }
}

fn slot_index(protocol: Protocol) -> usize {
    match protocol {
        Protocol::Http => 0,
        Protocol::Https => 1,
    }
}

/// Routing decision for one request.
#[derive(Debug)]
pub enum Outcome {
    /// Hand the request to a mounted application.
    Forward(Application),
    /// Hostname alias redirect.
    Redirect { code: RedirectCode, location: String },
    /// Insecure request to a TLS-enforced hostname.
    SecureRedirect { code: RedirectCode, location: String },
    NotFound,
}

impl Outcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Forward(_) => "forward",
            Outcome::Redirect { .. } => "redirect",
            Outcome::SecureRedirect { .. } => "tls_redirect",
            Outcome::NotFound => "not_found",
        }
    }
}

/// Hostname router for one listener.
#[derive(Debug, Clone)]
pub struct Router {
    binding: Binding,
    routes: WildcardTrie<RouteEntry>,
}

impl Router {
    pub fn new(binding: Binding) -> Self {
        Self {
            binding,
            routes: WildcardTrie::new(WILDCARD),
        }
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Whether nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Mount `app` for `hostname` on `protocol`.
    ///
    /// With `force_tls` on a secure protocol, insecure requests for the same
    /// hostname are redirected to the secure protocol.
    pub fn add(
        &mut self,
        app: Application,
        protocol: &str,
        hostname: &str,
        options: RouteOptions,
    ) -> RouteResult<&mut Self> {
        let protocol: Protocol = protocol.parse()?;
        let hostname = normalize_hostname(hostname)?;
        let enforce = options.force_tls && protocol.is_secure();

        self.ensure_vacant(&hostname, protocol, enforce)?;

        let entry = self.routes.get_or_insert_with(tokenize(&hostname)?, RouteEntry::default);
        entry.insert(protocol, Slot::Application(app));
        if enforce {
            entry.insert(protocol.base(), Slot::ForceTls { code: options.redirect_code });
        }

        tracing::info!(
            listener = %self.binding,
            hostname = %hostname,
            protocol = %protocol,
            force_tls = enforce,
            "Application mounted"
        );
        Ok(self)
    }

    /// Redirect requests for `hostname` on `protocol` to `target`.
    ///
    /// `target` is `[scheme://]host[:port]`; a missing scheme means `protocol`.
    /// The target must be in the same protocol family and may not be a domain socket.
    pub fn redirect(
        &mut self,
        protocol: &str,
        hostname: &str,
        target: &str,
        options: RouteOptions,
    ) -> RouteResult<&mut Self> {
        let protocol: Protocol = protocol.parse()?;
        let hostname = normalize_hostname(hostname)?;
        let target = Authority::parse(target, protocol)?;

        if !protocol.shares_family(target.protocol) {
            return Err(RouteError::InvalidRedirect(format!(
                "cannot redirect {} to {}",
                protocol, target.protocol
            )));
        }

        let mirror = options.force_tls && protocol.is_secure();
        self.ensure_vacant(&hostname, protocol, mirror)?;

        let slot = Slot::Redirect {
            target: target.clone(),
            code: options.redirect_code,
        };
        let entry = self.routes.get_or_insert_with(tokenize(&hostname)?, RouteEntry::default);
        if mirror {
            entry.insert(protocol.base(), slot.clone());
        }
        entry.insert(protocol, slot);

        tracing::info!(
            listener = %self.binding,
            hostname = %hostname,
            protocol = %protocol,
            target = %target,
            "Hostname alias registered"
        );
        Ok(self)
    }

    /// Routing decision for a resolved request.
    pub fn route(&self, info: &RequestInfo) -> Result<Outcome, DispatchError> {
        let tokens = tokenize(&info.hostname).map_err(|source| DispatchError::InvalidHostname {
            hostname: info.hostname.clone(),
            source,
        })?;

        let Some(slot) = self.routes.find(tokens).and_then(|entry| entry.get(info.protocol)) else {
            return Ok(Outcome::NotFound);
        };

        let outcome = match slot {
            Slot::Application(app) => Outcome::Forward(app.clone()),
            Slot::Redirect { target, code } => Outcome::Redirect {
                code: *code,
                location: target.location(&info.path_and_query),
            },
            Slot::ForceTls { .. } if info.host.is_empty() => return Err(DispatchError::MissingHost),
            Slot::ForceTls { code } => Outcome::SecureRedirect {
                code: *code,
                location: format!(
                    "{}://{}{}",
                    info.protocol.secure(),
                    info.host,
                    info.path_and_query
                ),
            },
        };
        Ok(outcome)
    }

    /// Freeze the router into a request handler.
    pub fn handler(self, errors: ErrorResponder, trust: TrustProxy) -> RouterService {
        RouterService::new(Arc::new(self), errors, trust)
    }

    fn ensure_vacant(&self, hostname: &str, protocol: Protocol, with_base: bool) -> RouteResult<()> {
        let Some(entry) = self.routes.get(tokenize(hostname)?) else {
            return Ok(());
        };

        let mut wanted = vec![protocol];
        if with_base {
            wanted.push(protocol.base());
        }

        match wanted.into_iter().find(|p| entry.contains(*p)) {
            Some(taken) => Err(RouteError::AmbiguousMount {
                hostname: hostname.to_string(),
                protocol: taken.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn normalize_hostname(hostname: &str) -> RouteResult<String> {
    let hostname = hostname.trim();
    if hostname.is_empty() {
        return Err(RouteError::InvalidArgument("hostname is required".into()));
    }
    if split_host_port(hostname).1.is_some() {
        return Err(RouteError::InvalidArgument(format!(
            "hostname {hostname:?} must not carry a port"
        )));
    }
    Ok(hostname.to_ascii_lowercase())
}
