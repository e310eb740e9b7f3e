//! Virtual-host dispatch façade and listener descriptors.
//!
//! # Responsibilities
//! - Map public addresses to one [`Router`] per physical listener
//! - Expand mount options (hostnames, aliases) into router registrations
//! - Produce listener descriptors in registration order
//! - Bind and serve listeners (plain or TLS-terminating) with graceful shutdown
//!
//! # Design Decisions
//! - Listener identity is `interface:port`; protocol is not part of it
//! - A failed registration leaves the façade unchanged
//! - TLS enforcement is explicit (`force_tls`), never inferred from the scheme

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Extension;
use axum_server::tls_rustls::RustlsConfig;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::http::application::Application;
use crate::http::request::TlsConnection;
use crate::http::response::{plain_text_errors, ErrorResponder};
use crate::http::service::RouterService;
use crate::lifecycle::Shutdown;
use crate::net::address::{parse_address, Binding};
use crate::net::listener::{self, BoundSocket, ListenerError};
use crate::routing::hostname::WILDCARD;
use crate::routing::{RedirectCode, RouteError, RouteOptions, RouteResult, Router};
use crate::security::TrustProxy;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for [`VirtualHosts::add`].
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    /// Hostname patterns served by the app. Empty means `*`.
    pub hostnames: Vec<String>,
    /// Hostnames redirected to the single primary hostname.
    pub aliases: Vec<String>,
    /// Overrides the façade default.
    pub redirect_code: Option<RedirectCode>,
    /// Redirect insecure requests to the secure protocol.
    pub force_tls: bool,
}

impl MountOptions {
    pub fn hostnames<I, S>(hostnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hostnames: hostnames.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn redirect_code(mut self, code: RedirectCode) -> Self {
        self.redirect_code = Some(code);
        self
    }

    pub fn force_tls(mut self, force_tls: bool) -> Self {
        self.force_tls = force_tls;
        self
    }
}

/// Options for [`VirtualHosts::redirect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectOptions {
    /// Overrides the façade default.
    pub redirect_code: Option<RedirectCode>,
    /// Also answer the insecure protocol with the same redirect.
    pub force_tls: bool,
}

/// Alias → target pairs.
///
/// Built from a single `(alias, target)` pair, a list of aliases sharing one
/// target, or any collection of pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aliases {
    pairs: Vec<(String, String)>,
}

impl Aliases {
    /// Every alias in `from` redirects to `to`.
    pub fn many<I, S>(from: I, to: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        from.into_iter().map(|alias| (alias.into(), to.to_string())).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(from, to)| (from.as_str(), to.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<F: Into<String>, T: Into<String>> From<(F, T)> for Aliases {
    fn from((from, to): (F, T)) -> Self {
        Self {
            pairs: vec![(from.into(), to.into())],
        }
    }
}

impl<F: Into<String>, T: Into<String>> FromIterator<(F, T)> for Aliases {
    fn from_iter<I: IntoIterator<Item = (F, T)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(f, t)| (f.into(), t.into())).collect(),
        }
    }
}

impl From<HashMap<String, String>> for Aliases {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Aliases {
    fn from(map: BTreeMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Dispatch container: one router per listener, built up by `add`/`redirect`.
pub struct VirtualHosts {
    routers: Vec<Router>,
    redirect_code: RedirectCode,
    errors: ErrorResponder,
    trust_proxy: TrustProxy,
}

impl VirtualHosts {
    pub fn new() -> Self {
        Self {
            routers: Vec::new(),
            redirect_code: RedirectCode::default(),
            errors: plain_text_errors(),
            trust_proxy: TrustProxy::none(),
        }
    }

    /// Default redirect status for mounts and aliases (301 or 302).
    pub fn with_redirect_code(mut self, code: u16) -> RouteResult<Self> {
        self.redirect_code = RedirectCode::try_from(code)?;
        Ok(self)
    }

    /// Builder for not-found and bad-request responses.
    pub fn with_errors(mut self, errors: ErrorResponder) -> Self {
        self.errors = errors;
        self
    }

    /// Which peers may set `X-Forwarded-Host` / `X-Forwarded-Proto`.
    pub fn with_trust_proxy(mut self, trust_proxy: TrustProxy) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub fn redirect_code(&self) -> RedirectCode {
        self.redirect_code
    }

    /// Mount `app` at `address` for each of `options.hostnames`.
    pub fn add(&mut self, app: Application, address: &str, options: MountOptions) -> RouteResult<&mut Self> {
        let binding = parse_address(address)?;
        let protocol = binding.protocol.as_str();

        let hostnames = if options.hostnames.is_empty() {
            vec![WILDCARD.to_string()]
        } else {
            options.hostnames
        };

        let primary = if options.aliases.is_empty() {
            None
        } else {
            match hostnames.as_slice() {
                [single] if single != WILDCARD && !single.starts_with("*.") => Some(single.clone()),
                _ => {
                    return Err(RouteError::InvalidArgument(
                        "aliases require exactly one non-wildcard hostname".into(),
                    ))
                }
            }
        };

        let route = RouteOptions {
            redirect_code: options.redirect_code.unwrap_or(self.redirect_code),
            force_tls: options.force_tls,
        };

        self.stage(binding, |router| {
            for hostname in &hostnames {
                router.add(app.clone(), protocol, hostname, route)?;
            }
            if let Some(primary) = &primary {
                for alias in &options.aliases {
                    router.redirect(protocol, alias, primary, route)?;
                }
            }
            Ok(())
        })?;
        Ok(self)
    }

    /// Redirect each alias at `address` to its target.
    pub fn redirect(
        &mut self,
        address: &str,
        aliases: impl Into<Aliases>,
        options: RedirectOptions,
    ) -> RouteResult<&mut Self> {
        let binding = parse_address(address)?;
        let protocol = binding.protocol.as_str();
        let aliases = aliases.into();
        if aliases.is_empty() {
            return Err(RouteError::InvalidArgument("at least one alias is required".into()));
        }

        let route = RouteOptions {
            redirect_code: options.redirect_code.unwrap_or(self.redirect_code),
            force_tls: options.force_tls,
        };

        self.stage(binding, |router| {
            for (from, to) in aliases.iter() {
                router.redirect(protocol, from, to, route)?;
            }
            Ok(())
        })?;
        Ok(self)
    }

    /// Bindings of the listeners registered so far, in registration order.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.routers.iter().map(Router::binding)
    }

    /// Freeze every router into a listener descriptor, in registration order.
    pub fn listeners(self) -> Vec<Listener> {
        let Self {
            routers,
            errors,
            trust_proxy,
            ..
        } = self;

        routers
            .into_iter()
            .map(|router| Listener {
                binding: router.binding().clone(),
                handler: router.handler(errors.clone(), trust_proxy.clone()),
            })
            .collect()
    }

    /// Apply `f` to a copy of the router for `binding`, committing only on success.
    fn stage<F>(&mut self, binding: Binding, f: F) -> RouteResult<()>
    where
        F: FnOnce(&mut Router) -> RouteResult<()>,
    {
        let identity = binding.identity();
        let existing = self
            .routers
            .iter()
            .position(|router| router.binding().identity() == identity);

        let mut staged = match existing {
            Some(i) => self.routers[i].clone(),
            None => Router::new(binding),
        };
        f(&mut staged)?;

        match existing {
            Some(i) => self.routers[i] = staged,
            None => self.routers.push(staged),
        }
        Ok(())
    }
}

impl Default for VirtualHosts {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VirtualHosts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualHosts")
            .field("routers", &self.routers)
            .field("redirect_code", &self.redirect_code)
            .finish_non_exhaustive()
    }
}

/// One physical listener: its binding, its dispatch handler, and the means to serve it.
#[derive(Debug, Clone)]
pub struct Listener {
    binding: Binding,
    handler: RouterService,
}

impl Listener {
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// The dispatch service, for embedding in another server.
    pub fn handler(&self) -> RouterService {
        self.handler.clone()
    }

    fn app(&self, tls: bool) -> axum::Router {
        let app = axum::Router::new().fallback_service(self.handler.clone());
        let app = if tls { app.layer(Extension(TlsConnection)) } else { app };
        app.layer(TraceLayer::new_for_http())
    }

    /// Bind the socket and start serving plain HTTP.
    ///
    /// Resolves once the socket is bound.
    pub async fn listen(self) -> Result<ListenerHandle, ListenerError> {
        let socket = listener::bind(&self.binding).await?;
        let local_addr = socket.local_addr();
        let shutdown = Shutdown::new();
        let address = self.binding.to_string();
        let app = self.app(false);
        let signal = shutdown.signalled();

        let task = match socket {
            BoundSocket::Tcp(listener) => {
                let serve = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                    .with_graceful_shutdown(signal);
                tokio::spawn(async move { serve.await.map_err(|source| ListenerError::Serve { address, source }) })
            }
            #[cfg(unix)]
            BoundSocket::Unix(listener) => {
                let serve = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(signal);
                tokio::spawn(async move { serve.await.map_err(|source| ListenerError::Serve { address, source }) })
            }
        };

        tracing::info!(binding = %self.binding, address = ?local_addr, "Listener started");
        Ok(ListenerHandle {
            binding: self.binding,
            local_addr,
            shutdown,
            task,
        })
    }

    /// Bind the socket and start serving HTTPS, terminating TLS here.
    ///
    /// Requests on this listener count as secure.
    pub async fn listen_tls(self, config: RustlsConfig) -> Result<ListenerHandle, ListenerError> {
        let addr = listener::resolve(&self.binding).await?;
        let shutdown = Shutdown::new();
        let address = self.binding.to_string();
        let app = self.app(true).into_make_service_with_connect_info::<SocketAddr>();

        let handle = axum_server::Handle::new();
        let server = axum_server::bind_rustls(addr, config).handle(handle.clone());
        let mut task = tokio::spawn(async move {
            server
                .serve(app)
                .await
                .map_err(|source| ListenerError::Serve { address, source })
        });

        let bound = tokio::select! {
            bound = handle.listening() => bound,
            exited = &mut task => return Err(exit_error(&self.binding, exited)),
        };
        let Some(local_addr) = bound else {
            return Err(exit_error(&self.binding, task.await));
        };

        let signal = shutdown.signalled();
        tokio::spawn(async move {
            signal.await;
            handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        tracing::info!(binding = %self.binding, address = %local_addr, "TLS listener started");
        Ok(ListenerHandle {
            binding: self.binding,
            local_addr: Some(local_addr),
            shutdown,
            task,
        })
    }
}

fn exit_error(
    binding: &Binding,
    exited: Result<Result<(), ListenerError>, tokio::task::JoinError>,
) -> ListenerError {
    match exited {
        Ok(Err(e)) => e,
        Ok(Ok(())) => ListenerError::Bind {
            address: binding.to_string(),
            source: io::Error::new(io::ErrorKind::AddrNotAvailable, "server exited before listening"),
        },
        Err(e) => ListenerError::Serve {
            address: binding.to_string(),
            source: io::Error::other(e),
        },
    }
}

/// A serving listener.
#[derive(Debug)]
pub struct ListenerHandle {
    binding: Binding,
    local_addr: Option<SocketAddr>,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), ListenerError>>,
}

impl ListenerHandle {
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Bound TCP address; `None` for UNIX sockets.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop accepting, drain in-flight requests, and wait for the server to exit.
    pub async fn close(self) -> Result<(), ListenerError> {
        self.shutdown.trigger();
        let result = match self.task.await {
            Ok(result) => result,
            Err(e) => Err(exit_error(&self.binding, Err(e))),
        };
        tracing::info!(binding = %self.binding, "Listener stopped");
        result
    }
}
