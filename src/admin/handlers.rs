//! Admin API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::registry::Registry;

type AdminState = State<Arc<dyn Registry>>;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct EndpointList {
    pub endpoints: Vec<String>,
}

#[derive(Deserialize)]
pub struct AddEndpoint {
    pub endpoint: String,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_endpoints(
    State(registry): AdminState,
    Path((name, version)): Path<(String, String)>,
) -> Response {
    match registry.lookup(&name, &version) {
        Ok(endpoints) => Json(EndpointList { endpoints }).into_response(),
        Err(err) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

pub async fn add_endpoint(
    State(registry): AdminState,
    Path((name, version)): Path<(String, String)>,
    Json(body): Json<AddEndpoint>,
) -> StatusCode {
    registry.add(&name, &version, &body.endpoint);
    tracing::info!(service = %name, version = %version, endpoint = %body.endpoint, "endpoint added");
    StatusCode::NO_CONTENT
}

pub async fn delete_endpoint(
    State(registry): AdminState,
    Path((name, version, endpoint)): Path<(String, String, String)>,
) -> StatusCode {
    registry.delete_endpoint(&name, &version, &endpoint);
    tracing::info!(service = %name, version = %version, endpoint = %endpoint, "endpoint removed");
    StatusCode::NO_CONTENT
}

pub async fn delete_version(
    State(registry): AdminState,
    Path((name, version)): Path<(String, String)>,
) -> StatusCode {
    registry.delete_version(&name, &version);
    tracing::info!(service = %name, version = %version, "version removed");
    StatusCode::NO_CONTENT
}

pub async fn delete_service(
    State(registry): AdminState,
    Path(name): Path<String>,
) -> StatusCode {
    registry.delete_service(&name);
    tracing::info!(service = %name, "service removed");
    StatusCode::NO_CONTENT
}
