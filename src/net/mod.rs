//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! address string ("https://*:8443", "http://unix:/run/app.sock")
//!     → address.rs (parse into Binding; listener identity = interface:port)
//!     → listener.rs (bind TCP or UNIX socket when a listener starts)
//!     → tls.rs (optional rustls config for TLS-terminating listeners)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Protocol is not part of listener identity
//! - Bind failures surface as `ListenerError`, never panics

pub mod address;
pub mod listener;
pub mod tls;

pub use address::{parse_address, Authority, Binding, ListenerId};
pub use listener::{BoundSocket, ListenerError};
