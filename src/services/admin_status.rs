use std::sync::Arc;

use thiserror::Error;
use tracing::Instrument;

use crate::admin::{AdminDecision, AdminRoleRegistry};
use crate::credential::{CredentialError, TokenProvider};
use crate::directory::{GraphQueryError, RoleDirectory};
use crate::principal::{self, PrincipalError, PrincipalIdentity};

#[derive(Debug, Error)]
pub enum AdminStatusError {
    #[error("identity assertion is missing")]
    MissingPrincipal,

    #[error("identity assertion is malformed: {0}")]
    MalformedPrincipal(String),

    #[error("userId not found in client principal")]
    MissingUserId,

    #[error("tenant id not found in client principal claims")]
    MissingTenantId,

    #[error("credential acquisition failed: {0}")]
    CredentialAcquisition(#[from] CredentialError),

    #[error("{0}")]
    GraphQuery(#[from] GraphQueryError),

    #[error("unexpected failure: {0}")]
    Unknown(String),
}

impl From<PrincipalError> for AdminStatusError {
    fn from(err: PrincipalError) -> Self {
        match err {
            PrincipalError::Missing => AdminStatusError::MissingPrincipal,
            PrincipalError::Malformed(detail) => AdminStatusError::MalformedPrincipal(detail),
            PrincipalError::MissingUserId => AdminStatusError::MissingUserId,
            PrincipalError::MissingTenantId => AdminStatusError::MissingTenantId,
        }
    }
}

/// Resolves whether the caller behind a principal header is a directory admin.
///
/// Stages run in order and the first failure ends the resolution:
/// principal → token → directory roles → registry match.
#[derive(Clone)]
pub struct AdminStatusService {
    tokens: Arc<dyn TokenProvider>,
    directory: Arc<dyn RoleDirectory>,
    registry: Arc<AdminRoleRegistry>,
    scope: String,
}

impl AdminStatusService {
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        directory: Arc<dyn RoleDirectory>,
        registry: Arc<AdminRoleRegistry>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            directory,
            registry,
            scope: scope.into(),
        }
    }

    pub async fn resolve(&self, principal_header: Option<&str>) -> Result<AdminDecision, AdminStatusError> {
        let identity = principal::extract_identity(principal_header)?;

        let span = tracing::info_span!(
            "check_admin_status",
            user_id = %identity.user_id,
            tenant_id = %identity.tenant_id
        );

        self.decide(&identity).instrument(span).await
    }

    async fn decide(&self, identity: &PrincipalIdentity) -> Result<AdminDecision, AdminStatusError> {
        tracing::debug!("Acquiring directory token for scope '{}'", self.scope);
        let token = self.tokens.acquire(&self.scope).await?;

        let roles = self
            .directory
            .list_roles(&identity.user_id, &identity.tenant_id, &token)
            .await?;

        let is_admin = if roles.is_empty() {
            tracing::info!("User does not belong to any directory roles");
            false
        } else {
            tracing::info!(
                "User belongs to {} directory roles, checking against {} admin templates",
                roles.len(),
                self.registry.len()
            );
            self.registry.matches_any(&roles)
        };

        tracing::info!("Admin status determined: {}", is_admin);
        Ok(AdminDecision { is_admin })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_role, principal_header, FakeDirectory, FakeTokens};

    fn service(tokens: FakeTokens, directory: FakeDirectory) -> AdminStatusService {
        AdminStatusService::new(
            Arc::new(tokens),
            Arc::new(directory),
            Arc::new(AdminRoleRegistry::default()),
            "https://graph.microsoft.com/.default",
        )
    }

    #[tokio::test]
    async fn test_admin_role_yields_true() {
        let directory = FakeDirectory::with_roles(vec![admin_role("FE930BE7-5E62-47DB-91AF-98C3A49A38B1")]);
        let svc = service(FakeTokens::ok(), directory.clone());

        let decision = svc.resolve(Some(&principal_header("u1", "t1"))).await.unwrap();
        assert!(decision.is_admin);
        assert_eq!(directory.calls(), vec![("u1".to_string(), "t1".to_string())]);
    }

    #[tokio::test]
    async fn test_no_roles_yields_false() {
        let svc = service(FakeTokens::ok(), FakeDirectory::with_roles(vec![]));
        let decision = svc.resolve(Some(&principal_header("u1", "t1"))).await.unwrap();
        assert!(!decision.is_admin);
    }

    #[tokio::test]
    async fn test_principal_errors_stop_before_token() {
        let tokens = FakeTokens::ok();
        let svc = service(tokens.clone(), FakeDirectory::with_roles(vec![]));

        let err = svc.resolve(None).await.unwrap_err();
        assert!(matches!(err, AdminStatusError::MissingPrincipal));

        let err = svc.resolve(Some("!!!")).await.unwrap_err();
        assert!(matches!(err, AdminStatusError::MalformedPrincipal(_)));

        assert_eq!(tokens.calls(), 0);
    }

    #[tokio::test]
    async fn test_token_failure_skips_directory() {
        let directory = FakeDirectory::with_roles(vec![admin_role("62e90394-69f5-4237-9190-012177145e10")]);
        let svc = service(FakeTokens::failing(), directory.clone());

        let err = svc.resolve(Some(&principal_header("u1", "t1"))).await.unwrap_err();
        assert!(matches!(err, AdminStatusError::CredentialAcquisition(_)));
        assert!(directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_is_never_admin() {
        let svc = service(FakeTokens::ok(), FakeDirectory::failing(403));
        let err = svc.resolve(Some(&principal_header("u1", "t1"))).await.unwrap_err();
        match err {
            AdminStatusError::GraphQuery(e) => assert_eq!(e.status, Some(403)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scope_is_passed_to_provider() {
        let tokens = FakeTokens::ok();
        let svc = service(tokens.clone(), FakeDirectory::with_roles(vec![]));
        svc.resolve(Some(&principal_header("u1", "t1"))).await.unwrap();
        assert_eq!(tokens.scopes(), vec!["https://graph.microsoft.com/.default".to_string()]);
    }
}
