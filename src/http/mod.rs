//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS/UNIX connection
//!     → server.rs (Listener: axum serve, TraceLayer, TLS marker)
//!     → service.rs (RouterService)
//!         → request.rs (protocol, forwarded host, path + query)
//!         → [routing layer decides outcome]
//!         → response.rs (redirect | error responder)
//!         → application.rs (mounted app, e.g. upstream.rs)
//!     → Send to client
//! ```

pub mod application;
pub mod request;
pub mod response;
pub mod server;
pub mod service;
pub mod upstream;

pub use application::Application;
pub use request::{RequestInfo, TlsConnection};
pub use response::ErrorResponder;
pub use server::{Aliases, Listener, ListenerHandle, MountOptions, RedirectOptions, VirtualHosts};
pub use service::RouterService;
pub use upstream::Upstream;
