//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / tunnel / connector
//!     → Balancer::select(identity, registry)
//!     → registry.lookup (fresh endpoint snapshot, no cross-request memory)
//!     → random.rs (random pick, dial with timeout, failover on error)
//!     → Return live TcpStream or error
//! ```
//!
//! # Design Decisions
//! - Selection is stateless: every call re-reads the registry, so mutations
//!   are visible to the very next request
//! - Dial failures shrink a request-local candidate list only; the registry
//!   is never mutated by the balancer, it is merely notified via `failure`
//! - The returned stream is exclusively owned by the caller

pub mod random;

pub use random::RandomBalancer;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;

use crate::registry::{Registry, ServiceIdentity};

/// Errors produced while resolving a service identity to a connection.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// The registry has no live entry for the identity.
    #[error("service {0} not found")]
    ServiceNotFound(ServiceIdentity),

    /// An entry exists but every endpoint failed to connect.
    #[error("no endpoint available for {0}")]
    NoEndpointAvailable(ServiceIdentity),
}

/// Strategy turning a service identity into one live backend connection.
///
/// Injected into the dispatcher; swap the implementation for custom
/// selection logic without touching the dispatcher itself.
#[async_trait]
pub trait Balancer: Send + Sync {
    async fn select(
        &self,
        identity: &ServiceIdentity,
        registry: &dyn Registry,
    ) -> Result<TcpStream, BalanceError>;
}
