pub mod graph;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::credential::AccessToken;

pub use graph::GraphRoleDirectory;

/// A directory role the user is a (possibly transitive) member of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRole {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub role_template_id: Option<String>,
}

// Only `roleTemplateId` drives the admin match; a null or oddly typed field
// on one role must not fail the whole page.
fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_str).map(str::to_string))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_text(deserializer)?.unwrap_or_default())
}

/// Failed directory query. Carries upstream diagnostics for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "directory query failed (status: {}, code: {}, request id: {}): {message}",
    display_opt(.status),
    display_opt(.code),
    display_opt(.request_id)
)]
pub struct GraphQueryError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
}

impl GraphQueryError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: Some("NetworkError".to_string()),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn page_limit_exceeded(max_pages: usize) -> Self {
        Self {
            status: None,
            code: Some("PageLimitExceeded".to_string()),
            message: format!("role enumeration did not finish within {} pages", max_pages),
            request_id: None,
        }
    }

    pub fn untrusted_next_link(link: &str) -> Self {
        Self {
            status: None,
            code: Some("UntrustedNextLink".to_string()),
            message: format!("next page link points outside the Graph endpoint: {}", link),
            request_id: None,
        }
    }

    pub fn invalid_response(message: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            status: None,
            code: Some("InvalidResponse".to_string()),
            message: message.into(),
            request_id,
        }
    }
}

fn display_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Backend able to list a user's transitive directory roles
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn list_roles(
        &self,
        user_id: &str,
        tenant_id: &str,
        token: &AccessToken,
    ) -> Result<Vec<DirectoryRole>, GraphQueryError>;
}
