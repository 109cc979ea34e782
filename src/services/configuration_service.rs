use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

use crate::config::StorageConfig;
use crate::credential::{CredentialError, TokenProvider};

const BLOB_API_VERSION: &str = "2021-08-06";
const SHAREPOINT_HOST_MARKER: &str = ".sharepoint.com/";

/// Persisted site configuration for one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfiguration {
    pub tenant_id: String,
    pub sharepoint_sites: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub updated_by: String,
    pub updated_by_display_name: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("storage credential failed: {0}")]
    Credential(#[from] CredentialError),

    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("storage rejected {operation} ({status}, code: {code:?})")]
    Rejected {
        operation: &'static str,
        status: u16,
        code: Option<String>,
    },

    #[error("invalid storage location: {0}")]
    InvalidLocation(String),

    #[error("failed to serialize configuration: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Request body is missing.")]
    MissingBody,

    // Parser detail is kept for logs only
    #[error("Request body is not valid JSON.")]
    InvalidJson(String),

    #[error("Invalid or missing tenantId in request body.")]
    InvalidTenantId,

    #[error("Invalid or missing sharepointUrls in request body. Must be an array.")]
    InvalidSiteList,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persists one configuration record per tenant, replacing any earlier one
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn save(&self, record: &TenantConfiguration) -> Result<(), StoreError>;
}

/// Validates save requests and hands the resulting record to a store
#[derive(Clone)]
pub struct ConfigurationService {
    store: Arc<dyn ConfigurationStore>,
}

impl ConfigurationService {
    pub fn new(store: Arc<dyn ConfigurationStore>) -> Self {
        Self { store }
    }

    /// Validate a raw request body and persist it
    pub async fn save(&self, body: &[u8]) -> Result<TenantConfiguration, ConfigurationError> {
        let record = parse_request(body, Utc::now())?;
        self.store.save(&record).await?;
        tracing::info!("Configuration for tenant {} saved successfully", record.tenant_id);
        Ok(record)
    }
}

fn parse_request(body: &[u8], now: DateTime<Utc>) -> Result<TenantConfiguration, ConfigurationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ConfigurationError::MissingBody);
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| ConfigurationError::InvalidJson(e.to_string()))?;
    if value.is_null() {
        return Err(ConfigurationError::MissingBody);
    }

    let tenant_id = value
        .get("tenantId")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or(ConfigurationError::InvalidTenantId)?;

    let urls = value
        .get("sharepointUrls")
        .and_then(Value::as_array)
        .ok_or(ConfigurationError::InvalidSiteList)?;

    let updated_by = sanitize_user_identifier(value.get("userIdentifier").and_then(Value::as_str));
    let updated_by_display_name = value
        .get("userDisplayName")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or("Unknown User")
        .to_string();

    Ok(TenantConfiguration {
        tenant_id: tenant_id.to_string(),
        sharepoint_sites: valid_sharepoint_urls(urls),
        timestamp: now,
        updated_by,
        updated_by_display_name,
    })
}

/// Keep only absolute URLs pointing into a SharePoint Online host
pub fn valid_sharepoint_urls(urls: &[Value]) -> Vec<String> {
    urls.iter()
        .filter_map(|candidate| {
            let Some(text) = candidate.as_str() else {
                tracing::warn!("Invalid SharePoint URL detected: {}", candidate);
                return None;
            };

            match Url::parse(text) {
                Ok(_) if text.contains(SHAREPOINT_HOST_MARKER) => Some(text.to_string()),
                Ok(_) => None,
                Err(_) => {
                    tracing::warn!("Invalid SharePoint URL detected: {}", text);
                    None
                }
            }
        })
        .collect()
}

/// Strip everything but word characters, whitespace, `@`, `.` and `-`
pub fn sanitize_user_identifier(identifier: Option<&str>) -> String {
    let cleaned: String = identifier
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '@' | '.' | '-'))
        .collect();

    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// In-process store, used for local development and tests
#[derive(Default)]
pub struct MemoryConfigurationStore {
    records: RwLock<HashMap<String, TenantConfiguration>>,
}

impl MemoryConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, tenant_id: &str) -> Option<TenantConfiguration> {
        self.records.read().await.get(tenant_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ConfigurationStore for MemoryConfigurationStore {
    async fn save(&self, record: &TenantConfiguration) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.tenant_id.clone(), record.clone());
        Ok(())
    }
}

/// Azure Blob Storage store writing `{tenantId}.json` into one container
pub struct BlobConfigurationStore {
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    config: StorageConfig,
}

impl BlobConfigurationStore {
    pub fn new(client: reqwest::Client, tokens: Arc<dyn TokenProvider>, config: StorageConfig) -> Self {
        Self { client, tokens, config }
    }

    fn container_url(&self) -> Result<Url, StoreError> {
        let endpoint = match (&self.config.blob_endpoint, &self.config.account_name) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(account)) => format!("https://{}.blob.core.windows.net", account),
            (None, None) => {
                return Err(StoreError::NotConfigured(
                    "Storage account name environment variable is not configured.",
                ))
            }
        };

        let container = self.config.container_name.as_deref().ok_or(StoreError::NotConfigured(
            "Storage container name environment variable is not configured.",
        ))?;

        let mut url = Url::parse(&endpoint).map_err(|e| StoreError::InvalidLocation(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidLocation(endpoint.clone()))?
            .pop_if_empty()
            .push(container);
        Ok(url)
    }

    fn request(&self, url: Url, token: &str) -> reqwest::RequestBuilder {
        self.client
            .put(url)
            .bearer_auth(token)
            .header("x-ms-version", BLOB_API_VERSION)
            .header("x-ms-date", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }

    async fn ensure_container(&self, container: &Url, token: &str) -> Result<(), StoreError> {
        let mut url = container.clone();
        url.query_pairs_mut().append_pair("restype", "container");

        let response = self.request(url, token).body(Vec::new()).send().await?;
        let status = response.status();

        if status.is_success() || status == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }

        Err(StoreError::Rejected {
            operation: "container creation",
            status: status.as_u16(),
            code: error_code(&response),
        })
    }
}

fn error_code(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ConfigurationStore for BlobConfigurationStore {
    async fn save(&self, record: &TenantConfiguration) -> Result<(), StoreError> {
        let container = self.container_url()?;
        let token = self.tokens.acquire(&self.config.scope).await?;

        self.ensure_container(&container, token.secret()).await?;

        let mut blob = container.clone();
        blob.path_segments_mut()
            .map_err(|_| StoreError::InvalidLocation(container.to_string()))?
            .push(&format!("{}.json", record.tenant_id));

        let data = serde_json::to_vec(record)?;
        let response = self
            .request(blob, token.secret())
            .header("x-ms-blob-type", "BlockBlob")
            .header("Content-Type", "application/json")
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Rejected {
                operation: "blob upload",
                status: status.as_u16(),
                code: error_code(&response),
            });
        }

        tracing::debug!("Uploaded configuration blob for tenant {}", record.tenant_id);
        Ok(())
    }
}
