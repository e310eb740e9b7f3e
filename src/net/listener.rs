//! Socket binding for listener bindings.
//!
//! # Responsibilities
//! - Bind TCP sockets (interface `*` means every IPv4 interface)
//! - Bind UNIX domain sockets, replacing a stale socket file
//! - Report bind failures as errors, never panic
//!
//! # Design Decisions
//! - Binding happens when a listener is started, not when mounts are registered

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;

use crate::net::address::{Binding, ALL_INTERFACES};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to load TLS configuration: {0}")]
    Tls(#[source] io::Error),

    #[error("Server on {address} failed: {source}")]
    Serve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported listener: {0}")]
    Unsupported(String),
}

/// A bound, not yet serving, socket.
#[derive(Debug)]
pub enum BoundSocket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl BoundSocket {
    /// Local TCP address; `None` for UNIX sockets.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            BoundSocket::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            BoundSocket::Unix(_) => None,
        }
    }
}

/// Bind the socket described by `binding`.
pub async fn bind(binding: &Binding) -> Result<BoundSocket, ListenerError> {
    let bind_error = |source| ListenerError::Bind {
        address: binding.to_string(),
        source,
    };

    if binding.domain_socket {
        return bind_unix(binding).map_err(bind_error);
    }

    let listener = TcpListener::bind(tcp_target(binding)?)
        .await
        .map_err(bind_error)?;

    tracing::info!(
        binding = %binding,
        address = ?listener.local_addr().ok(),
        "Listener bound"
    );
    Ok(BoundSocket::Tcp(listener))
}

/// Resolve a TCP binding to one socket address.
pub async fn resolve(binding: &Binding) -> Result<SocketAddr, ListenerError> {
    let not_found = || ListenerError::Bind {
        address: binding.to_string(),
        source: io::Error::new(io::ErrorKind::AddrNotAvailable, "interface did not resolve"),
    };

    if binding.domain_socket {
        return Err(ListenerError::Unsupported(format!(
            "{binding} is a domain socket"
        )));
    }

    let mut addrs = tokio::net::lookup_host(tcp_target(binding)?)
        .await
        .map_err(|source| ListenerError::Bind {
            address: binding.to_string(),
            source,
        })?;
    addrs.next().ok_or_else(not_found)
}

fn tcp_target(binding: &Binding) -> Result<(String, u16), ListenerError> {
    let port = binding.port.ok_or_else(|| {
        ListenerError::Unsupported(format!("{binding} has no port"))
    })?;

    let host = if binding.interface == ALL_INTERFACES {
        "0.0.0.0"
    } else {
        binding.interface.trim_start_matches('[').trim_end_matches(']')
    };
    Ok((host.to_string(), port))
}

#[cfg(unix)]
fn bind_unix(binding: &Binding) -> io::Result<BoundSocket> {
    use std::os::unix::fs::FileTypeExt;

    let path = std::path::Path::new(&binding.interface);
    if let Ok(meta) = std::fs::symlink_metadata(path) {
        if meta.file_type().is_socket() {
            tracing::debug!(path = %path.display(), "Removing stale socket file");
            std::fs::remove_file(path)?;
        }
    }

    let listener = UnixListener::bind(path)?;
    tracing::info!(binding = %binding, "Listener bound");
    Ok(BoundSocket::Unix(listener))
}

#[cfg(not(unix))]
fn bind_unix(_binding: &Binding) -> io::Result<BoundSocket> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "domain sockets are not supported on this platform",
    ))
}
