#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use tenant_admin_api::admin::AdminRoleRegistry;
use tenant_admin_api::config::AppConfig;
use tenant_admin_api::credential::{AccessToken, CredentialError, TokenProvider};
use tenant_admin_api::directory::{DirectoryRole, GraphQueryError, RoleDirectory};
use tenant_admin_api::services::{
    AdminStatusService, ConfigurationService, MemoryConfigurationStore,
};
use tenant_admin_api::{app, AppState};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tenant-admin-api"));
        cmd.env("TENANT_ADMIN_PORT", port.to_string())
            .env("BIND_ADDRESS", "127.0.0.1")
            .env("APP_ENV", "development")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Base64 principal header built from arbitrary JSON
pub fn principal(value: Value) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.to_string())
}

pub fn role(template_id: Option<&str>) -> DirectoryRole {
    DirectoryRole {
        id: "role-instance".to_string(),
        display_name: "Role".to_string(),
        role_template_id: template_id.map(str::to_string),
    }
}

#[derive(Clone, Default)]
pub struct StubTokens {
    pub fail: bool,
    pub calls: Arc<Mutex<usize>>,
}

#[async_trait]
impl TokenProvider for StubTokens {
    async fn acquire(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(CredentialError::Rejected {
                status: 400,
                message: "ManagedIdentityCredential: no identity endpoint (token-endpoint-detail)"
                    .to_string(),
            });
        }
        Ok(AccessToken::new(
            "super-secret-token",
            Utc::now() + chrono::Duration::hours(1),
        ))
    }
}

#[derive(Clone)]
pub struct StubDirectory {
    pub result: Result<Vec<DirectoryRole>, GraphQueryError>,
}

#[async_trait]
impl RoleDirectory for StubDirectory {
    async fn list_roles(
        &self,
        _user_id: &str,
        _tenant_id: &str,
        _token: &AccessToken,
    ) -> Result<Vec<DirectoryRole>, GraphQueryError> {
        self.result.clone()
    }
}

pub struct TestApp {
    pub router: Router,
    pub tokens: StubTokens,
    pub store: Arc<MemoryConfigurationStore>,
}

pub fn test_app(tokens: StubTokens, directory: StubDirectory) -> TestApp {
    let store = Arc::new(MemoryConfigurationStore::new());
    let admin_status = AdminStatusService::new(
        Arc::new(tokens.clone()),
        Arc::new(directory),
        Arc::new(AdminRoleRegistry::default()),
        "https://graph.microsoft.com/.default",
    );
    let state = AppState::new(admin_status, ConfigurationService::new(store.clone()));

    TestApp {
        router: app(state, &AppConfig::development()),
        tokens,
        store,
    }
}

pub fn app_with_roles(roles: Vec<DirectoryRole>) -> TestApp {
    test_app(StubTokens::default(), StubDirectory { result: Ok(roles) })
}

/// Send one request through the router and return status, raw body and parsed JSON
pub async fn send(router: &Router, request: Request<Body>) -> Result<(StatusCode, String, Value)> {
    let response = router.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let text = String::from_utf8(bytes.to_vec())?;
    let json = serde_json::from_str(&text).unwrap_or(Value::Null);
    Ok((status, text, json))
}
