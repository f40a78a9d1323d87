//! Health routes on the JSON gateway
//!
//! - `GET /health` - plain liveness check
//! - `POST /grpc.health.v1.Health/Check` - per-service check; an empty or
//!   missing body asks about the whole server

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::adapter::ADAPTER_SERVICE;
use super::errors::{RpcError, RpcResult};

/// Fully qualified name of the health service
pub const HEALTH_SERVICE: &str = "grpc.health.v1.Health";

const SERVING: &str = "SERVING";

/// Health check request; an empty service name asks about the whole server
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HealthCheckRequest {
    pub service: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/grpc.health.v1.Health/Check", post(check_handler))
}

fn serving() -> HealthResponse {
    HealthResponse {
        status: SERVING.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serving()))
}

async fn check_handler(
    req: Option<Json<HealthCheckRequest>>,
) -> RpcResult<Json<HealthResponse>> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    match req.service.as_str() {
        "" | ADAPTER_SERVICE | HEALTH_SERVICE => Ok(Json(serving())),
        other => Err(RpcError::UnknownService(other.to_string())),
    }
}
