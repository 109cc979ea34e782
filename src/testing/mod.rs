use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::credential::{AccessToken, CredentialError, TokenProvider};
use crate::directory::{DirectoryRole, GraphQueryError, RoleDirectory};
use crate::principal::{encode_assertion, ClaimSpelling};

/// Principal header in the short (`typ`/`val`) claim spelling
pub fn principal_header(user_id: &str, tenant_id: &str) -> String {
    encode_assertion(user_id, tenant_id, ClaimSpelling::Short)
}

pub fn admin_role(template_id: &str) -> DirectoryRole {
    DirectoryRole {
        id: format!("role-{}", template_id),
        display_name: "Administrator".to_string(),
        role_template_id: Some(template_id.to_string()),
    }
}

/// Token provider that either always succeeds or always fails, recording scopes
#[derive(Clone)]
pub struct FakeTokens {
    fail: bool,
    scopes: Arc<Mutex<Vec<String>>>,
}

impl FakeTokens {
    pub fn ok() -> Self {
        Self {
            fail: false,
            scopes: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            scopes: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.scopes.lock().unwrap().len()
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for FakeTokens {
    async fn acquire(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        self.scopes.lock().unwrap().push(scope.to_string());
        if self.fail {
            return Err(CredentialError::Rejected {
                status: 400,
                message: "Identity not found (secret-upstream-detail)".to_string(),
            });
        }
        Ok(AccessToken::new("fake-token", Utc::now() + Duration::hours(1)))
    }
}

/// Role directory returning a canned result, recording (user, tenant) calls
#[derive(Clone)]
pub struct FakeDirectory {
    result: Result<Vec<DirectoryRole>, GraphQueryError>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeDirectory {
    pub fn with_roles(roles: Vec<DirectoryRole>) -> Self {
        Self {
            result: Ok(roles),
            calls: Arc::default(),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            result: Err(GraphQueryError {
                status: Some(status),
                code: Some("Authorization_RequestDenied".to_string()),
                message: "Insufficient privileges".to_string(),
                request_id: Some("graph-request-id".to_string()),
            }),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoleDirectory for FakeDirectory {
    async fn list_roles(
        &self,
        user_id: &str,
        tenant_id: &str,
        token: &AccessToken,
    ) -> Result<Vec<DirectoryRole>, GraphQueryError> {
        assert_eq!(token.secret(), "fake-token");
        self.calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), tenant_id.to_string()));
        self.result.clone()
    }
}
