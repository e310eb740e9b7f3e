//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before any listener serves):
//!     hostname pattern
//!     → hostname.rs (tokenize: reversed labels, optional port)
//!     → trie.rs (locate/create exact node)
//!     → router.rs (fill protocol slot: app | alias | TLS enforcement)
//!
//! Incoming Request (protocol, host, path)
//!     → hostname.rs (tokenize request hostname)
//!     → trie.rs (literal tokens, else wildcard child at the first miss)
//!     → router.rs (pick slot for protocol)
//!     → Return: Outcome (Forward | Redirect | SecureRedirect | NotFound)
//! ```
//!
//! # Design Decisions
//! - Tables are built once and immutable at runtime
//! - Lookup is bounded by hostname depth, no regex
//! - Exact labels beat wildcards at every level

pub mod error;
pub mod hostname;
pub mod protocol;
pub mod router;
pub mod trie;

pub use error::{DispatchError, RouteError, RouteResult};
pub use protocol::Protocol;
pub use router::{Outcome, RedirectCode, RouteOptions, Router};
pub use trie::WildcardTrie;
