//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (peer address, forwarded headers)
//!     → proxy.rs (is the peer a trusted proxy?)
//!     → yes: X-Forwarded-Host / X-Forwarded-Proto decide host and protocol
//!     → no:  Host header and the listener's own TLS state decide
//! ```
//!
//! # Design Decisions
//! - No trust in client input by default

pub mod proxy;

pub use proxy::TrustProxy;
