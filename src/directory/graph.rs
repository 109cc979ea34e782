use async_trait::async_trait;
use serde::Deserialize;
use url::{Origin, Url};
use uuid::Uuid;

use super::{DirectoryRole, GraphQueryError, RoleDirectory};
use crate::credential::AccessToken;

const ROLE_SELECT: &str = "id,displayName,roleTemplateId";

/// Microsoft Graph backed role directory
pub struct GraphRoleDirectory {
    client: reqwest::Client,
    base_url: String,
    max_pages: usize,
}

#[derive(Debug, Deserialize)]
struct RolePage {
    #[serde(default)]
    value: Vec<DirectoryRole>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: Option<GraphErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphErrorDetail {
    code: Option<String>,
    message: Option<String>,
    inner_error: Option<GraphInnerError>,
}

#[derive(Debug, Deserialize)]
struct GraphInnerError {
    #[serde(rename = "request-id")]
    request_id: Option<String>,
}

impl GraphRoleDirectory {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, max_pages: usize) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            max_pages: max_pages.max(1),
        }
    }

    /// Absolute URL of the transitive directory-role query for one user
    pub fn roles_url(&self, user_id: &str) -> Result<Url, GraphQueryError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            GraphQueryError::invalid_response(format!("invalid Graph base URL: {}", e), None)
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                GraphQueryError::invalid_response("Graph base URL cannot carry a path", None)
            })?
            .pop_if_empty()
            .push("users")
            .push(user_id)
            .push("transitiveMemberOf")
            .push("microsoft.graph.directoryRole");

        url.query_pairs_mut().append_pair("$select", ROLE_SELECT);
        Ok(url)
    }

    async fn fetch_page(&self, url: &str, token: &AccessToken) -> Result<RolePage, GraphQueryError> {
        let client_request_id = Uuid::new_v4().to_string();

        let response = self
            .client
            .get(url)
            .bearer_auth(token.secret())
            .header("ConsistencyLevel", "eventual")
            .header("client-request-id", &client_request_id)
            .send()
            .await
            .map_err(|e| GraphQueryError {
                request_id: Some(client_request_id.clone()),
                ..GraphQueryError::transport(e.to_string())
            })?;

        let status = response.status();
        let header_request_id = response
            .headers()
            .get("request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| GraphQueryError {
            status: Some(status.as_u16()),
            request_id: header_request_id.clone(),
            ..GraphQueryError::transport(e.to_string())
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<GraphErrorBody>(&body)
                .ok()
                .and_then(|b| b.error);

            let (code, message, inner_request_id) = match detail {
                Some(detail) => (
                    detail.code,
                    detail.message.unwrap_or_default(),
                    detail.inner_error.and_then(|inner| inner.request_id),
                ),
                None => (None, body.chars().take(200).collect(), None),
            };

            return Err(GraphQueryError {
                status: Some(status.as_u16()),
                code,
                message,
                request_id: header_request_id.or(inner_request_id),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            GraphQueryError::invalid_response(format!("invalid role page: {}", e), header_request_id)
        })
    }
}

#[async_trait]
impl RoleDirectory for GraphRoleDirectory {
    async fn list_roles(
        &self,
        user_id: &str,
        tenant_id: &str,
        token: &AccessToken,
    ) -> Result<Vec<DirectoryRole>, GraphQueryError> {
        let url = self.roles_url(user_id)?;
        tracing::info!("Querying directory roles: {} (tenant {})", url, tenant_id);

        let origin = url.origin();
        let mut roles = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;

        while let Some(page_url) = next.take() {
            // A partial membership list could hide an admin role
            if pages == self.max_pages {
                tracing::warn!(
                    "Role enumeration for user {} still had pages after {}",
                    user_id,
                    pages
                );
                return Err(GraphQueryError::page_limit_exceeded(self.max_pages));
            }

            let page = self.fetch_page(page_url.as_str(), token).await?;
            pages += 1;
            roles.extend(page.value);
            next = page
                .next_link
                .map(|link| next_page_url(&link, &origin))
                .transpose()?;
        }

        tracing::debug!("User {} belongs to {} directory roles", user_id, roles.len());
        Ok(roles)
    }
}

/// The bearer token only ever goes back to the origin the query started on
fn next_page_url(link: &str, origin: &Origin) -> Result<Url, GraphQueryError> {
    let url = Url::parse(link).map_err(|e| {
        GraphQueryError::invalid_response(format!("invalid next page link: {}", e), None)
    })?;

    if url.origin() != *origin {
        return Err(GraphQueryError::untrusted_next_link(link));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROLES_PATH: &str = "/v1.0/users/u1/transitiveMemberOf/microsoft.graph.directoryRole";

    fn token() -> AccessToken {
        AccessToken::new("graph-token", Utc::now() + Duration::hours(1))
    }

    fn directory(server: &MockServer) -> GraphRoleDirectory {
        GraphRoleDirectory::new(reqwest::Client::new(), format!("{}/v1.0", server.uri()), 5)
    }

    #[test]
    fn test_roles_url() {
        let directory =
            GraphRoleDirectory::new(reqwest::Client::new(), "https://graph.microsoft.com/v1.0", 5);
        let url = directory.roles_url("u1").unwrap();
        assert_eq!(url.path(), ROLES_PATH);
        assert_eq!(
            url.query_pairs().find(|(k, _)| k == "$select").map(|(_, v)| v.into_owned()),
            Some(ROLE_SELECT.to_string())
        );

        let url = directory.roles_url("a/b c").unwrap();
        assert!(url.path().contains("/users/a%2Fb%20c/"));
    }

    #[tokio::test]
    async fn test_lists_roles_with_required_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ROLES_PATH))
            .and(query_param("$select", ROLE_SELECT))
            .and(header("Authorization", "Bearer graph-token"))
            .and(header("ConsistencyLevel", "eventual"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {
                        "id": "r1",
                        "displayName": "Global Administrator",
                        "roleTemplateId": "62e90394-69f5-4237-9190-012177145e10"
                    },
                    { "id": "r2", "displayName": "Directory Readers" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let roles = directory(&server).list_roles("u1", "t1", &token()).await.unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].display_name, "Global Administrator");
        assert_eq!(roles[1].role_template_id, None);
    }

    #[tokio::test]
    async fn test_empty_membership_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ROLES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .mount(&server)
            .await;

        let roles = directory(&server).list_roles("u1", "t1", &token()).await.unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_follows_next_link() {
        let server = MockServer::start().await;
        let next = format!("{}/v1.0/page-2", server.uri());

        Mock::given(method("GET"))
            .and(path(ROLES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "r1", "displayName": "A", "roleTemplateId": "a" }],
                "@odata.nextLink": next
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/page-2"))
            .and(header("ConsistencyLevel", "eventual"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "r2", "displayName": "B", "roleTemplateId": "b" }]
            })))
            .mount(&server)
            .await;

        let roles = directory(&server).list_roles("u1", "t1", &token()).await.unwrap();
        let ids: Vec<_> = roles.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[tokio::test]
    async fn test_upstream_error_carries_diagnostics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ROLES_PATH))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("request-id", "graph-req-42")
                    .set_body_json(json!({
                        "error": {
                            "code": "Authorization_RequestDenied",
                            "message": "Insufficient privileges to complete the operation.",
                            "innerError": { "request-id": "inner-req" }
                        }
                    })),
            )
            .mount(&server)
            .await;

        let err = directory(&server).list_roles("u1", "t1", &token()).await.unwrap_err();
        assert_eq!(err.status, Some(403));
        assert_eq!(err.code.as_deref(), Some("Authorization_RequestDenied"));
        assert_eq!(err.request_id.as_deref(), Some("graph-req-42"));
    }

    #[tokio::test]
    async fn test_inner_request_id_used_when_header_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "code": "TooManyRequests",
                    "message": "Throttled",
                    "innerError": { "request-id": "inner-req" }
                }
            })))
            .mount(&server)
            .await;

        let err = directory(&server).list_roles("u1", "t1", &token()).await.unwrap_err();
        assert_eq!(err.status, Some(429));
        assert_eq!(err.request_id.as_deref(), Some("inner-req"));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = directory(&server).list_roles("u1", "t1", &token()).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("InvalidResponse"));
    }

    #[tokio::test]
    async fn test_page_limit_with_pages_left_is_an_error() {
        let server = MockServer::start().await;
        let next = format!("{}/v1.0/page-2", server.uri());

        Mock::given(method("GET"))
            .and(path(ROLES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "r1", "displayName": "Directory Readers", "roleTemplateId": "88d8e3e3-8f55-4a1e-953a-9b9898b8876b" }],
                "@odata.nextLink": next
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1.0/page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "r2", "displayName": "Global Administrator", "roleTemplateId": "62e90394-69f5-4237-9190-012177145e10" }]
            })))
            .expect(0)
            .mount(&server)
            .await;

        let directory =
            GraphRoleDirectory::new(reqwest::Client::new(), format!("{}/v1.0", server.uri()), 1);
        let err = directory.list_roles("u1", "t1", &token()).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("PageLimitExceeded"));
    }

    #[tokio::test]
    async fn test_last_page_within_limit_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ROLES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "id": "r1", "displayName": null, "roleTemplateId": "62e90394-69f5-4237-9190-012177145e10" }]
            })))
            .mount(&server)
            .await;

        let directory =
            GraphRoleDirectory::new(reqwest::Client::new(), format!("{}/v1.0", server.uri()), 1);
        let roles = directory.list_roles("u1", "t1", &token()).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].display_name, "");
    }

    #[tokio::test]
    async fn test_next_link_to_another_origin_is_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ROLES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [],
                "@odata.nextLink": "https://collector.example.com/v1.0/page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = directory(&server).list_roles("u1", "t1", &token()).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("UntrustedNextLink"));
    }

    #[test]
    fn test_next_page_url_requires_same_origin() {
        let origin = Url::parse("https://graph.microsoft.com/v1.0").unwrap().origin();

        assert!(next_page_url("https://graph.microsoft.com/v1.0/users?$skiptoken=x", &origin).is_ok());
        for link in [
            "http://graph.microsoft.com/v1.0/next",
            "https://graph.microsoft.com:8443/v1.0/next",
            "https://graph.microsoft.com.evil.test/v1.0/next",
        ] {
            let err = next_page_url(link, &origin).unwrap_err();
            assert_eq!(err.code.as_deref(), Some("UntrustedNextLink"), "{link}");
        }
        let err = next_page_url("not a url", &origin).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("InvalidResponse"));
    }
}
