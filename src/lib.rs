//! Request-level load balancer and tunnel for versioned services.
//!
//! Inbound paths carry a service identity: `/<name>/<version>/<rest...>`.
//! The dispatcher resolves that identity, strips it from the path, and
//! forwards the request to one live endpoint registered for it — as plain
//! HTTP through a pooled client, or as a raw byte tunnel for protocol
//! upgrades.
//!
//! # Architecture Overview
//!
//! ```text
//! Client ──▶ http (dispatcher) ──▶ balancer ──▶ registry
//!                │                     │
//!                │ ordinary HTTP       └──▶ TcpStream to one endpoint
//!                ├──▶ pooled hyper client (sentinel authority → connector)
//!                │
//!                │ Connection: Upgrade
//!                └──▶ tunnel (handshake replay + bidirectional splice)
//!
//! Control plane ──▶ admin API ──▶ registry mutations
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod registry;

// Traffic management
pub mod balancer;
pub mod tunnel;

// Control plane
pub mod admin;

pub use config::ProxyConfig;
pub use http::ProxyServer;
pub use registry::{MemoryRegistry, Registry, ServiceIdentity};
