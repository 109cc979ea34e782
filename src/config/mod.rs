use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::admin::DEFAULT_ADMIN_ROLE_TEMPLATE_IDS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub directory: DirectoryConfig,
    pub admin: AdminConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Graph API root, without trailing slash
    pub graph_base_url: String,
    /// Scope requested from the token endpoint for Graph calls
    pub graph_scope: String,
    /// Upper bound on `@odata.nextLink` pages followed per query
    pub max_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub role_template_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub account_name: Option<String>,
    pub container_name: Option<String>,
    /// Overrides `https://{account}.blob.core.windows.net`
    pub blob_endpoint: Option<String>,
    pub scope: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub http_timeout_secs: u64,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("TENANT_ADMIN_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("BIND_ADDRESS") {
            self.server.bind_address = v;
        }

        // Directory overrides
        if let Ok(v) = env::var("GRAPH_BASE_URL") {
            self.directory.graph_base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("GRAPH_SCOPE") {
            self.directory.graph_scope = v;
        }
        if let Ok(v) = env::var("GRAPH_MAX_PAGES") {
            self.directory.max_pages = v.parse().unwrap_or(self.directory.max_pages);
        }

        // Admin role overrides
        if let Ok(v) = env::var("ADMIN_ROLE_TEMPLATE_IDS") {
            let ids = split_list(&v);
            if !ids.is_empty() {
                self.admin.role_template_ids = ids;
            }
        }

        // Storage overrides
        if let Ok(v) = env::var("AZURE_STORAGE_ACCOUNT_NAME") {
            self.storage.account_name = non_empty(v);
        }
        if let Ok(v) = env::var("AZURE_STORAGE_CONTAINER_NAME") {
            self.storage.container_name = non_empty(v);
        }
        if let Ok(v) = env::var("AZURE_STORAGE_BLOB_ENDPOINT") {
            self.storage.blob_endpoint = non_empty(v.trim_end_matches('/').to_string());
        }

        // API overrides
        if let Ok(v) = env::var("HTTP_TIMEOUT_SECS") {
            self.api.http_timeout_secs = v.parse().unwrap_or(self.api.http_timeout_secs);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 7071,
            },
            directory: DirectoryConfig {
                graph_base_url: "https://graph.microsoft.com/v1.0".to_string(),
                graph_scope: "https://graph.microsoft.com/.default".to_string(),
                max_pages: 10,
            },
            admin: AdminConfig {
                role_template_ids: DEFAULT_ADMIN_ROLE_TEMPLATE_IDS
                    .iter()
                    .map(|id| id.to_string())
                    .collect(),
            },
            storage: StorageConfig {
                account_name: None,
                container_name: None,
                blob_endpoint: None,
                scope: "https://storage.azure.com/.default".to_string(),
            },
            api: ApiConfig {
                http_timeout_secs: 30,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: Vec::new(),
            },
        }
    }

    pub fn development() -> Self {
        let mut config = Self::base(Environment::Development);
        config.security.cors_origins = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(),
        ];
        config
    }

    pub fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.api.http_timeout_secs = 15;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config
    }

    pub fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.api.http_timeout_secs = 10;
        config.api.enable_request_logging = false;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
