//! service-proxy binary: config load, registry seeding, server startup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use service_proxy::config::{load_config, ProxyConfig};
use service_proxy::http::ProxyServer;
use service_proxy::registry::{MemoryRegistry, Registry};
use service_proxy::admin;

#[derive(Parser, Debug)]
#[command(name = "service-proxy", version, about = "Versioned service proxy")]
struct Args {
    /// Path to the TOML configuration file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "service_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        seeded_services = config.services.len(),
        admin_enabled = config.admin.enabled,
        "configuration loaded"
    );

    let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::with_services(
        config
            .services
            .iter()
            .map(|s| (s.name.clone(), s.version.clone(), s.endpoints.clone())),
    ));

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let admin_registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(err) = admin::run_admin(admin_registry, admin_listener).await {
                tracing::error!(error = %err, "admin API stopped");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = ProxyServer::new(config, registry);
    server.run(listener).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
