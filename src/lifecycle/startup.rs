//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a `VirtualHosts` routing table
//! - Load TLS material for listeners that terminate TLS
//! - Bind every listener, in registration order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners already started are closed again if a later one fails

use std::collections::HashMap;

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::{AppConfig, VhostConfig};
use crate::http::{Aliases, Application, ListenerHandle, MountOptions, RedirectOptions, Upstream, VirtualHosts};
use crate::net::address::{parse_address, ListenerId};
use crate::net::listener::ListenerError;
use crate::net::tls::load_tls_config;
use crate::routing::{RedirectCode, RouteError, RouteResult};

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid routing configuration: {0}")]
    Route(#[from] RouteError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Build the routing table described by `config`.
pub fn build_virtual_hosts(config: &VhostConfig) -> RouteResult<VirtualHosts> {
    let mut hosts = VirtualHosts::new()
        .with_redirect_code(config.redirect_code)?
        .with_trust_proxy(config.trust_proxy.to_trust_proxy());

    for mount in &config.mounts {
        let mut options = MountOptions::hostnames(mount.hostnames.iter().cloned())
            .aliases(mount.aliases.iter().cloned())
            .force_tls(mount.force_tls);
        if let Some(code) = mount.redirect_code {
            options = options.redirect_code(RedirectCode::try_from(code)?);
        }
        hosts.add(build_app(&mount.app)?, &mount.address, options)?;
    }

    for redirect in &config.redirects {
        let options = RedirectOptions {
            redirect_code: redirect.redirect_code.map(RedirectCode::try_from).transpose()?,
            force_tls: redirect.force_tls,
        };
        hosts.redirect(
            &redirect.address,
            Aliases::many(redirect.from.iter().cloned(), &redirect.to),
            options,
        )?;
    }

    Ok(hosts)
}

fn build_app(app: &AppConfig) -> RouteResult<Application> {
    match app {
        AppConfig::Static { status, body } => {
            let status = StatusCode::from_u16(*status)
                .map_err(|_| RouteError::InvalidArgument(format!("{status} is not an HTTP status")))?;
            let body = body.clone();
            Ok(Application::from_fn(move |_req| {
                let body = body.clone();
                async move { (status, body) }
            }))
        }
        AppConfig::Upstream { url } => Ok(Upstream::new(url)?.into_application()),
    }
}

/// All listeners of a running server.
#[derive(Debug)]
pub struct Running {
    handles: Vec<ListenerHandle>,
}

impl Running {
    pub fn handles(&self) -> &[ListenerHandle] {
        &self.handles
    }

    /// Close every listener, reporting the first failure.
    pub async fn close(self) -> Result<(), ListenerError> {
        let mut first = Ok(());
        for handle in self.handles {
            if let Err(e) = handle.close().await {
                tracing::warn!(error = %e, "Listener did not stop cleanly");
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        first
    }
}

/// Build the routing table and start every listener.
pub async fn start(config: &VhostConfig) -> Result<Running, StartupError> {
    let hosts = build_virtual_hosts(config)?;

    let mut tls = HashMap::<ListenerId, _>::new();
    for entry in &config.tls {
        let binding = parse_address(&entry.address)?;
        tls.insert(binding.identity(), load_tls_config(&entry.cert_path, &entry.key_path).await?);
    }

    let mut handles = Vec::new();
    for listener in hosts.listeners() {
        let started = match tls.remove(&listener.binding().identity()) {
            Some(tls_config) => listener.listen_tls(tls_config).await,
            None => listener.listen().await,
        };
        match started {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                let _ = Running { handles }.close().await;
                return Err(e.into());
            }
        }
    }

    tracing::info!(listeners = handles.len(), "All listeners started");
    Ok(Running { handles })
}
