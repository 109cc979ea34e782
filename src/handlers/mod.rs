// handlers/mod.rs - HTTP handlers
//
// Public:  /, /health
// Caller identity via front-door header: /api/checkAdminStatus
// Unauthenticated writes: /api/saveConfiguration

pub mod admin_status;
pub mod configuration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

pub use admin_status::check_admin_status;
pub use configuration::{method_not_supported, save_configuration};

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Tenant Admin API",
        "version": version,
        "endpoints": {
            "health": "/health (public)",
            "check_admin_status": "/api/checkAdminStatus (x-ms-client-principal header)",
            "save_configuration": "/api/saveConfiguration (POST)",
        }
    }))
}

pub async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "timestamp": now,
        })),
    )
}
