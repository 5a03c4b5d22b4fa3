//! HTTP entry subsystem: the dispatcher and its forwarding client.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (dispatcher: extract identity, strip it from the path)
//!     → extract.rs (pluggable (name, version) extraction strategy)
//!     → upgrade request?  → tunnel subsystem
//!     → ordinary HTTP     → sentinel.rs (identity encoded into the authority)
//!                         → pooled hyper client
//!                         → connector.rs (sentinel decoded, balancer dials)
//! ```

pub mod connector;
pub mod extract;
pub mod sentinel;
pub mod server;

pub use extract::{ExtractError, IdentityExtractor, PathExtractor};
pub use server::{AppState, Decorator, ProxyServer, ResponseFuture};
