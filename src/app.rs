use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::admin::AdminRoleRegistry;
use crate::config::{AppConfig, SecurityConfig};
use crate::credential::{ManagedIdentityCredential, TokenProvider};
use crate::directory::GraphRoleDirectory;
use crate::handlers;
use crate::services::{AdminStatusService, BlobConfigurationStore, ConfigurationService};

/// Shared, immutable per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub admin_status: AdminStatusService,
    pub configuration: ConfigurationService,
}

impl AppState {
    pub fn new(admin_status: AdminStatusService, configuration: ConfigurationService) -> Self {
        Self {
            admin_status,
            configuration,
        }
    }

    /// Wire the production collaborators: managed identity, Graph, blob storage
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.http_timeout_secs))
            .build()?;

        let credential = ManagedIdentityCredential::from_env(client.clone());
        tracing::info!("Managed identity source: {:?}", credential.source());
        let tokens: Arc<dyn TokenProvider> = Arc::new(credential);

        let registry = AdminRoleRegistry::new(&config.admin.role_template_ids);
        if registry.is_empty() {
            anyhow::bail!("admin role registry is empty; check ADMIN_ROLE_TEMPLATE_IDS");
        }
        tracing::info!("Admin role registry loaded with {} template ids", registry.len());

        let directory = GraphRoleDirectory::new(
            client.clone(),
            config.directory.graph_base_url.clone(),
            config.directory.max_pages,
        );

        let admin_status = AdminStatusService::new(
            tokens.clone(),
            Arc::new(directory),
            Arc::new(registry),
            config.directory.graph_scope.clone(),
        );

        if config.storage.account_name.is_none() && config.storage.blob_endpoint.is_none() {
            tracing::warn!("AZURE_STORAGE_ACCOUNT_NAME is not set; saveConfiguration will fail");
        }
        let store = BlobConfigurationStore::new(client, tokens, config.storage.clone());

        Ok(Self::new(admin_status, ConfigurationService::new(Arc::new(store))))
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Identity taken from the front-door principal header
        .route(
            "/api/checkAdminStatus",
            get(handlers::check_admin_status).post(handlers::check_admin_status),
        )
        .route(
            "/api/saveConfiguration",
            post(handlers::save_configuration).fallback(handlers::method_not_supported),
        )
        .with_state(state);

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
