//! In-memory registry, the default [`Registry`] implementation.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{Registry, RegistryError};

type VersionMap = HashMap<String, Vec<String>>;

/// Registry backed by an instance-private read/write lock.
///
/// Layout mirrors the lookup key: `name → version → [endpoint, ...]`.
/// Lookups take the shared lock, every mutation takes the exclusive lock, so
/// a lookup always sees a fully applied mutation or none of it.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    services: RwLock<HashMap<String, VersionMap>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-seeded with (name, version, endpoints) entries,
    /// typically from the `[[services]]` config sections.
    pub fn with_services<I, S>(seed: I) -> Self
    where
        I: IntoIterator<Item = (S, S, Vec<S>)>,
        S: Into<String>,
    {
        let registry = Self::new();
        for (name, version, endpoints) in seed {
            let name = name.into();
            let version = version.into();
            for endpoint in endpoints {
                registry.add(&name, &version, &endpoint.into());
            }
        }
        registry
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, VersionMap>> {
        self.services.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, VersionMap>> {
        self.services.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Registry for MemoryRegistry {
    fn lookup(&self, name: &str, version: &str) -> Result<Vec<String>, RegistryError> {
        let services = self.read();
        match services.get(name).and_then(|versions| versions.get(version)) {
            Some(endpoints) if !endpoints.is_empty() => Ok(endpoints.clone()),
            _ => Err(RegistryError::ServiceNotFound),
        }
    }

    fn add(&self, name: &str, version: &str, endpoint: &str) {
        let mut services = self.write();
        services
            .entry(name.to_string())
            .or_default()
            .entry(version.to_string())
            .or_default()
            .push(endpoint.to_string());
    }

    fn delete_endpoint(&self, name: &str, version: &str, endpoint: &str) {
        let mut services = self.write();
        if let Some(versions) = services.get_mut(name) {
            if let Some(endpoints) = versions.get_mut(version) {
                endpoints.retain(|e| e != endpoint);
                // An empty list already fails lookups; drop the entry too.
                if endpoints.is_empty() {
                    versions.remove(version);
                }
            }
        }
    }

    fn delete_version(&self, name: &str, version: &str) {
        let mut services = self.write();
        if let Some(versions) = services.get_mut(name) {
            versions.remove(version);
            if versions.is_empty() {
                services.remove(name);
            }
        }
    }

    fn delete_service(&self, name: &str) {
        self.write().remove(name);
    }
}
