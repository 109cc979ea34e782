// handlers/admin_status.rs - GET|POST /api/checkAdminStatus

use axum::{extract::State, http::HeaderMap, Json};

use crate::admin::AdminDecision;
use crate::app::AppState;
use crate::error::ApiError;
use crate::principal::CLIENT_PRINCIPAL_HEADER;
use crate::services::AdminStatusError;

/// Report whether the caller holds an administrative directory role.
///
/// Success: `200 {"isAdmin": bool}`. Failure: `{"message": ...}` with 401 when
/// no principal header is present and 500 for everything else.
pub async fn check_admin_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminDecision>, ApiError> {
    tracing::info!("Processing checkAdminStatus request");

    // A non-visible-ASCII header value cannot be a base64 assertion
    let header = headers
        .get(CLIENT_PRINCIPAL_HEADER)
        .map(|value| value.to_str().unwrap_or("!").to_string());

    // Resolved on its own task so a panic in a collaborator maps to a 500
    // instead of tearing down the connection.
    let service = state.admin_status.clone();
    let decision = tokio::spawn(async move { service.resolve(header.as_deref()).await })
        .await
        .map_err(|e| AdminStatusError::Unknown(e.to_string()))??;

    Ok(Json(decision))
}
