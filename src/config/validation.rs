//! Configuration validation.
//!
//! Semantic checks on top of serde's syntactic ones. Pure function over the
//! config; collects every violation instead of stopping at the first.

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic violation in the configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address must not be empty")]
    EmptyBindAddress,

    #[error("admin.bind_address must not be empty when admin is enabled")]
    EmptyAdminAddress,

    #[error("upstream.dial_timeout_ms must be greater than zero")]
    ZeroDialTimeout,

    #[error("upstream.response_header_timeout_secs must be greater than zero")]
    ZeroResponseHeaderTimeout,

    #[error("services[{0}] has an empty name or version")]
    InvalidServiceKey(usize),

    #[error("services[{index}] endpoint '{endpoint}' is not host:port")]
    InvalidEndpoint { index: usize, endpoint: String },
}

/// Validate the whole config, returning every violation found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }
    if config.admin.enabled && config.admin.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyAdminAddress);
    }
    if config.upstream.dial_timeout_ms == 0 {
        errors.push(ValidationError::ZeroDialTimeout);
    }
    if config.upstream.response_header_timeout_secs == 0 {
        errors.push(ValidationError::ZeroResponseHeaderTimeout);
    }

    for (index, service) in config.services.iter().enumerate() {
        if service.name.trim().is_empty() || service.version.trim().is_empty() {
            errors.push(ValidationError::InvalidServiceKey(index));
        }
        for endpoint in &service.endpoints {
            if !is_host_port(endpoint) {
                errors.push(ValidationError::InvalidEndpoint {
                    index,
                    endpoint: endpoint.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_host_port(endpoint: &str) -> bool {
    match endpoint.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
