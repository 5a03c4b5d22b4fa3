//! Service registry subsystem.
//!
//! # Data Flow
//! ```text
//! Control plane (admin API / library calls)
//!     → Registry trait (add / delete mutations)
//!     → memory.rs (RwLock-guarded name → version → endpoints map)
//!
//! Balancer
//!     → Registry::lookup (shared lock, snapshot of current endpoints)
//!     → Registry::failure (advisory, on dial errors)
//! ```
//!
//! # Design Decisions
//! - The registry is an injected trait object, never process-global state
//! - One coarse read/write lock per instance; mutation is rare next to lookup
//! - Duplicate endpoints are allowed; delete removes every occurrence
//! - `failure` only logs by default; eviction policy belongs to overriders

pub mod memory;

pub use memory::MemoryRegistry;

use std::fmt;
use thiserror::Error;

/// The (name, version) pair identifying a logical service revision.
///
/// Immutable once extracted from a request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
}

impl ServiceIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// Errors surfaced by registry lookups.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry for the requested (name, version), or the entry is empty.
    #[error("service name/version not found")]
    ServiceNotFound,
}

/// Lookup and mutation surface for the endpoint registry.
///
/// Implementations must be safe to share across request tasks; lookups must
/// never observe a partially applied mutation.
pub trait Registry: Send + Sync {
    /// Return the current endpoint list for (name, version).
    ///
    /// An absent entry and an empty entry are indistinguishable: both fail
    /// with [`RegistryError::ServiceNotFound`].
    fn lookup(&self, name: &str, version: &str) -> Result<Vec<String>, RegistryError>;

    /// Append `endpoint` to the (name, version) entry, creating it if absent.
    /// Duplicates are allowed. Never fails.
    fn add(&self, name: &str, version: &str, endpoint: &str);

    /// Remove every occurrence of `endpoint` from the entry. No-op if absent.
    fn delete_endpoint(&self, name: &str, version: &str, endpoint: &str);

    /// Remove the entire version entry.
    fn delete_version(&self, name: &str, version: &str);

    /// Remove all versions of the service.
    fn delete_service(&self, name: &str);

    /// Advisory hook invoked by the balancer when a dial to `endpoint` fails.
    ///
    /// The default only logs; it does not mutate registry state, so a dead
    /// endpoint keeps being offered until an operator removes it or an
    /// implementation overrides this with an eviction policy.
    fn failure(&self, name: &str, version: &str, endpoint: &str, error: &std::io::Error) {
        tracing::warn!(
            service = %name,
            version = %version,
            endpoint = %endpoint,
            error = %error,
            "endpoint dial failed"
        );
    }
}
