//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the service proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend dialing and client pooling knobs.
    pub upstream: UpstreamConfig,

    /// Admin (registry control plane) API settings.
    pub admin: AdminConfig,

    /// Services pre-seeded into the registry at startup.
    pub services: Vec<ServiceConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Knobs for dialing backends and pooling forwarded connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Connection establishment timeout in milliseconds.
    pub dial_timeout_ms: u64,

    /// TCP keep-alive interval on backend connections, in seconds.
    pub keepalive_secs: u64,

    /// Maximum idle pooled connections per service identity.
    pub max_idle_per_host: usize,

    /// How long to wait for a backend's response head, in seconds.
    pub response_header_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    pub fn response_header_timeout(&self) -> Duration {
        Duration::from_secs(self.response_header_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            dial_timeout_ms: 2_000,
            keepalive_secs: 10,
            max_idle_per_host: 50,
            response_header_timeout_secs: 10,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the registry mutation API.
    pub enabled: bool,

    /// Bind address for the admin listener, kept off the proxy port so
    /// service names can never collide with admin routes.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A service entry seeded into the registry at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Service name, the first path segment of inbound requests.
    pub name: String,

    /// Service version, the second path segment.
    pub version: String,

    /// Endpoint addresses ("host:port") serving this identity.
    #[serde(default)]
    pub endpoints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recommended_knobs() {
        let config = ProxyConfig::default();
        assert_eq!(config.upstream.dial_timeout(), Duration::from_secs(2));
        assert_eq!(config.upstream.keepalive(), Duration::from_secs(10));
        assert_eq!(config.upstream.max_idle_per_host, 50);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn minimal_config_parses() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.services.is_empty());
    }

    #[test]
    fn full_config_parses() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8088"

            [upstream]
            dial_timeout_ms = 500
            keepalive_secs = 30

            [admin]
            enabled = true
            bind_address = "127.0.0.1:9099"

            [[services]]
            name = "svc"
            version = "v1"
            endpoints = ["127.0.0.1:3000", "127.0.0.1:3001"]
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8088");
        assert_eq!(config.upstream.dial_timeout_ms, 500);
        assert!(config.admin.enabled);
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.services[0].endpoints.len(), 2);
    }
}
