use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::{scope_to_resource, AccessToken, CredentialError, TokenProvider};

const APP_SERVICE_API_VERSION: &str = "2019-08-01";
const IMDS_API_VERSION: &str = "2018-02-01";
const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Where the hosting environment exposes its managed identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// App Service / Functions: `IDENTITY_ENDPOINT` + `IDENTITY_HEADER`
    AppService { endpoint: String, header: String },
    /// Instance metadata service on VMs and container hosts
    Imds { endpoint: String },
    /// Environment advertises an identity endpoint but is incomplete
    Misconfigured(String),
}

impl IdentitySource {
    /// Discover the identity source from process environment
    pub fn from_env() -> Self {
        let endpoint = env::var("IDENTITY_ENDPOINT").ok().filter(|v| !v.is_empty());
        let header = env::var("IDENTITY_HEADER").ok().filter(|v| !v.is_empty());

        match (endpoint, header) {
            (Some(endpoint), Some(header)) => IdentitySource::AppService { endpoint, header },
            (Some(_), None) => IdentitySource::Misconfigured(
                "IDENTITY_ENDPOINT is set but IDENTITY_HEADER is missing".to_string(),
            ),
            _ => IdentitySource::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            IdentitySource::AppService { .. } => "app-service",
            IdentitySource::Imds { .. } => "imds",
            IdentitySource::Misconfigured(_) => "misconfigured",
        }
    }
}

/// Token provider backed by the host's managed identity. No secret or
/// client id is configured; the host supplies the identity.
pub struct ManagedIdentityCredential {
    client: reqwest::Client,
    source: IdentitySource,
}

impl ManagedIdentityCredential {
    pub fn new(client: reqwest::Client, source: IdentitySource) -> Self {
        Self { client, source }
    }

    pub fn from_env(client: reqwest::Client) -> Self {
        Self::new(client, IdentitySource::from_env())
    }

    pub fn source(&self) -> &IdentitySource {
        &self.source
    }

    fn build_request(&self, resource: &str) -> Result<reqwest::RequestBuilder, CredentialError> {
        match &self.source {
            IdentitySource::AppService { endpoint, header } => Ok(self
                .client
                .get(endpoint)
                .query(&[("api-version", APP_SERVICE_API_VERSION), ("resource", resource)])
                .header("X-IDENTITY-HEADER", header)),
            IdentitySource::Imds { endpoint } => Ok(self
                .client
                .get(endpoint)
                .query(&[("api-version", IMDS_API_VERSION), ("resource", resource)])
                .header("Metadata", "true")),
            IdentitySource::Misconfigured(reason) => {
                Err(CredentialError::IdentityUnavailable(reason.clone()))
            }
        }
    }
}

#[async_trait]
impl TokenProvider for ManagedIdentityCredential {
    async fn acquire(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let resource = scope_to_resource(scope);
        tracing::debug!(
            "Requesting token for resource '{}' via {} identity",
            resource,
            self.source.describe()
        );

        let response = self.build_request(resource)?.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CredentialError::InvalidResponse(format!("invalid json: {}", e)))?;

        let token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CredentialError::InvalidResponse("missing access_token".to_string()))?;

        let expires_on = parsed
            .expires_on
            .as_ref()
            .and_then(ExpiryValue::as_timestamp)
            .or_else(|| {
                parsed
                    .expires_in
                    .as_ref()
                    .and_then(ExpiryValue::as_seconds)
                    .map(|secs| Utc::now() + Duration::seconds(secs))
            })
            .ok_or_else(|| CredentialError::InvalidResponse("missing token expiry".to_string()))?;

        tracing::debug!("Token acquired for '{}', expires at {}", resource, expires_on);
        Ok(AccessToken::new(token, expires_on))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_on: Option<ExpiryValue>,
    expires_in: Option<ExpiryValue>,
}

/// Expiry fields arrive as numbers or numeric strings depending on the host
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpiryValue {
    Number(i64),
    Text(String),
}

impl ExpiryValue {
    fn as_seconds(&self) -> Option<i64> {
        match self {
            ExpiryValue::Number(n) => Some(*n),
            ExpiryValue::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.as_seconds()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

fn rejection_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed
            .error_description
            .or(parsed.message)
            .or(parsed.error)
            .unwrap_or_else(|| "no error detail".to_string()),
        Err(_) => body.chars().take(200).collect(),
    }
}
