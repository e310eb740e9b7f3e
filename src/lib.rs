//! Virtual-host HTTP request router.
//!
//! Mount many applications on many listeners, keyed by the request's hostname
//! and protocol, with hostname aliases and TLS enforcement.
//!
//! # Architecture Overview
//!
//! ```text
//!   VirtualHosts::add / ::redirect           (configuration phase)
//!        │  parse address → Binding → one Router per interface:port
//!        ▼
//!   Router ── WildcardTrie<RouteEntry> ── per-protocol slots
//!        │                                   app | alias | force TLS
//!        ▼
//!   VirtualHosts::listeners() → Listener { binding, handler }
//!        │  listen() / listen_tls()
//!        ▼
//!   Client ──▶ net ──▶ http::service ──▶ routing ──▶ redirect | 404 | app
//! ```
//!
//! # Example
//!
//! ```no_run
//! use axum::http::StatusCode;
//! use vhost_router::http::{Application, MountOptions, VirtualHosts};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut hosts = VirtualHosts::new();
//! hosts.add(
//!     Application::from_fn(|_req| async { StatusCode::NO_CONTENT }),
//!     "http://localhost:8000",
//!     MountOptions::hostnames(["example.com"]),
//! )?;
//!
//! for listener in hosts.listeners() {
//!     let handle = listener.listen().await?;
//!     println!("listening on {:?}", handle.local_addr());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::VhostConfig;
pub use http::{Application, Listener, MountOptions, RedirectOptions, VirtualHosts};
pub use lifecycle::Shutdown;
pub use routing::{RedirectCode, RouteError, Router};
pub use security::TrustProxy;
