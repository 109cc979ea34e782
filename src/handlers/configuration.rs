// handlers/configuration.rs - POST /api/saveConfiguration

use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::{messages, ApiError, ConfigurationApiError};

/// Validate and persist a tenant's SharePoint site list.
///
/// Expected Input:
/// ```json
/// {
///   "tenantId": "string",
///   "sharepointUrls": ["https://contoso.sharepoint.com/sites/hr"],
///   "userDisplayName": "string (optional)",
///   "userIdentifier": "string (optional)"
/// }
/// ```
pub async fn save_configuration(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ConfigurationApiError> {
    tracing::info!("Processing saveConfiguration request");

    let record = state.configuration.save(&body).await?;
    tracing::debug!(
        "Stored {} site(s) for tenant {}",
        record.sharepoint_sites.len(),
        record.tenant_id
    );

    Ok(Json(json!({ "message": "Configuration saved successfully" })))
}

/// Any method other than POST on the configuration route
pub async fn method_not_supported() -> ConfigurationApiError {
    tracing::error!("Invalid HTTP method. Only POST is supported.");
    ConfigurationApiError(ApiError::bad_request(messages::METHOD_NOT_SUPPORTED))
}
