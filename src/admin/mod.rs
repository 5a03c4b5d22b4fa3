//! Registry control-plane API.
//!
//! Mutations arrive from an external operator over HTTP on a dedicated
//! listener, kept off the proxy port so service names can never shadow
//! admin routes. Every handler is a thin wrapper over one Registry call.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, put},
    Router,
};

use crate::registry::Registry;

pub fn admin_router(registry: Arc<dyn Registry>) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route(
            "/services/{name}/{version}",
            get(handlers::get_endpoints).delete(handlers::delete_version),
        )
        .route(
            "/services/{name}/{version}/endpoints",
            put(handlers::add_endpoint),
        )
        .route(
            "/services/{name}/{version}/endpoints/{endpoint}",
            delete(handlers::delete_endpoint),
        )
        .route("/services/{name}", delete(handlers::delete_service))
        .with_state(registry)
}

/// Serve the admin API on its own listener.
pub async fn run_admin(
    registry: Arc<dyn Registry>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "admin API listening");
    axum::serve(listener, admin_router(registry)).await
}
