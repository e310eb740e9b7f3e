//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing / http / lifecycle produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (dispatch counters, latency histogram)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
