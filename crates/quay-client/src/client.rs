//! HTTP implementation of [`RegistryApi`] against the Quay REST API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::api::RegistryApi;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::{
    ApiResponse, DelegateRequest, NamespaceType, Permission, PermissionRequest, Prototype,
    PrototypeRequest, PrototypesResponse, RepositoriesResponse, Repository, RepositoryPermission,
    RobotAccount, RobotPermissionsResponse, Team,
};

/// Client for the Quay REST API.
#[derive(Debug, Clone)]
pub struct QuayClient {
    /// Configuration for the client.
    config: Arc<ClientConfig>,
    /// Shared HTTP client; owns the connection pool.
    http_client: reqwest::Client,
}

impl QuayClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Create a client from `QUAY_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment does not describe a valid config.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.config
            .url
            .join(path)
            .map_err(|e| Error::invalid_path(path, e.to_string()))
    }

    fn robot_path(namespace_type: NamespaceType, namespace: &str, robot: &str) -> String {
        format!("/api/v1/{namespace_type}/{namespace}/robots/{robot}")
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(method = %method, path = url.path(), "Sending registry request");

        let request = self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/json");

        if self.config.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.config.token)
        }
    }

    /// Send a request and decode a JSON body on success.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<ApiResponse<T>> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let path = response.url().path().to_string();
        let bytes = response.bytes().await?;

        debug!(status, path, "Registry responded");

        if (200..300).contains(&status) {
            let body = serde_json::from_slice(&bytes)?;
            Ok(ApiResponse::success(status, body))
        } else {
            Ok(ApiResponse::failure(
                status,
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        }
    }

    /// Send a request whose success body is irrelevant.
    async fn send_empty(&self, request: RequestBuilder) -> Result<ApiResponse<()>> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let path = response.url().path().to_string();
        let text = response.text().await?;

        debug!(status, path, "Registry responded");

        if (200..300).contains(&status) {
            Ok(ApiResponse::success(status, ()))
        } else {
            Ok(ApiResponse::failure(status, text))
        }
    }
}

#[async_trait]
impl RegistryApi for QuayClient {
    async fn get_robot_account(
        &self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Result<ApiResponse<RobotAccount>> {
        let url = self.endpoint(&Self::robot_path(namespace_type, namespace, robot))?;
        self.send(self.request(Method::GET, url)).await
    }

    async fn create_robot_account(
        &self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Result<ApiResponse<RobotAccount>> {
        let url = self.endpoint(&Self::robot_path(namespace_type, namespace, robot))?;
        self.send(self.request(Method::PUT, url)).await
    }

    async fn delete_robot_account(
        &self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Result<ApiResponse<()>> {
        let url = self.endpoint(&Self::robot_path(namespace_type, namespace, robot))?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    async fn regenerate_robot_account_password(
        &self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Result<ApiResponse<RobotAccount>> {
        let path = format!(
            "{}/regenerate",
            Self::robot_path(namespace_type, namespace, robot)
        );
        let url = self.endpoint(&path)?;
        self.send(self.request(Method::POST, url)).await
    }

    async fn create_team(&self, organization: &str, team: &Team) -> Result<ApiResponse<Team>> {
        let url = self.endpoint(&format!(
            "/api/v1/organization/{organization}/team/{}",
            team.name
        ))?;
        self.send(self.request(Method::PUT, url).json(team)).await
    }

    async fn add_team_member(
        &self,
        organization: &str,
        team: &str,
        member: &str,
    ) -> Result<ApiResponse<()>> {
        let url = self.endpoint(&format!(
            "/api/v1/organization/{organization}/team/{team}/members/{member}"
        ))?;
        self.send_empty(self.request(Method::PUT, url)).await
    }

    async fn get_prototypes_by_organization(
        &self,
        organization: &str,
    ) -> Result<ApiResponse<Vec<Prototype>>> {
        let url = self.endpoint(&format!("/api/v1/organization/{organization}/prototypes"))?;
        let response: ApiResponse<PrototypesResponse> =
            self.send(self.request(Method::GET, url)).await?;
        Ok(response.map(|r| r.prototypes))
    }

    async fn create_robot_permission_for_organization(
        &self,
        organization: &str,
        robot_account: &str,
        role: Permission,
    ) -> Result<ApiResponse<Prototype>> {
        let url = self.endpoint(&format!("/api/v1/organization/{organization}/prototypes"))?;
        let body = PrototypeRequest {
            role,
            delegate: DelegateRequest {
                kind: "user",
                name: robot_account,
            },
        };
        self.send(self.request(Method::POST, url).json(&body)).await
    }

    async fn get_robot_permissions(
        &self,
        organization: &str,
        robot: &str,
    ) -> Result<ApiResponse<Vec<RepositoryPermission>>> {
        let url = self.endpoint(&format!(
            "/api/v1/organization/{organization}/robots/{robot}/permissions"
        ))?;
        let response: ApiResponse<RobotPermissionsResponse> =
            self.send(self.request(Method::GET, url)).await?;
        Ok(response.map(|r| r.permissions))
    }

    async fn get_repositories_for_namespace(
        &self,
        namespace: &str,
    ) -> Result<ApiResponse<Vec<Repository>>> {
        let mut url = self.endpoint("/api/v1/repository")?;
        url.query_pairs_mut().append_pair("namespace", namespace);
        let response: ApiResponse<RepositoriesResponse> =
            self.send(self.request(Method::GET, url)).await?;
        Ok(response.map(|r| r.repositories))
    }

    async fn update_repository_user_permission(
        &self,
        namespace: &str,
        repository: &str,
        robot: &str,
        role: Permission,
    ) -> Result<ApiResponse<RepositoryPermission>> {
        let url = self.endpoint(&format!(
            "/api/v1/repository/{namespace}/{repository}/permissions/user/{namespace}+{robot}"
        ))?;
        let body = PermissionRequest { role };
        let response: ApiResponse<serde_json::Value> =
            self.send(self.request(Method::PUT, url).json(&body)).await?;
        Ok(response.map(|_| RepositoryPermission::new(repository, role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TeamRole;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn client_for(
        server: &MockServer,
    ) -> std::result::Result<QuayClient, Box<dyn std::error::Error>> {
        let config = ClientConfig::new(server.uri().parse::<Url>()?).token("test-token");
        Ok(QuayClient::new(config)?)
    }

    #[tokio::test]
    async fn test_get_robot_account_found() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/organization/acme/robots/deployer"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "acme+deployer",
                "description": "",
                "created": "Mon, 01 Jan 2024 00:00:00 -0000",
                "last_accessed": null,
                "token": "TOKEN"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let response = client
            .get_robot_account(NamespaceType::Organization, "acme", "deployer")
            .await?;

        assert!(response.is_success());
        assert_eq!(
            response.body().map(|a| a.name.as_str()),
            Some("acme+deployer")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_get_robot_account_missing_keeps_status_and_body() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/user/jdoe/robots/ci"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"message": "Could not find robot"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let response = client
            .get_robot_account(NamespaceType::User, "jdoe", "ci")
            .await?;

        assert_eq!(response.status(), 400);
        assert!(response.body().is_none());
        assert!(response.raw_body().contains("Could not find robot"));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_an_error() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/organization/acme/robots/deployer"))
            .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let result = client
            .create_robot_account(NamespaceType::Organization, "acme", "deployer")
            .await;

        assert!(matches!(result, Err(Error::Json(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_regenerate_posts_to_regenerate_endpoint() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/organization/acme/robots/deployer/regenerate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "acme+deployer",
                "token": "NEW"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let response = client
            .regenerate_robot_account_password(NamespaceType::Organization, "acme", "deployer")
            .await?;

        assert_eq!(response.into_body().map(|a| a.token), Some("NEW".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/v1/organization/acme/robots/deployer"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let response = client
            .delete_robot_account(NamespaceType::Organization, "acme", "deployer")
            .await?;

        assert!(response.is_success());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_team_sends_team_body() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/organization/acme/team/devs"))
            .and(body_json(serde_json::json!({"name": "devs", "role": "member"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"name": "devs", "role": "member"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let response = client
            .create_team("acme", &Team::new("devs", TeamRole::Member))
            .await?;

        assert!(response.is_success());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_prototype_delegates_to_robot() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/organization/acme/prototypes"))
            .and(body_json(serde_json::json!({
                "role": "write",
                "delegate": {"kind": "user", "name": "acme+deployer"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "p1",
                "role": "write",
                "delegate": {"kind": "user", "name": "acme+deployer", "is_robot": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let response = client
            .create_robot_permission_for_organization("acme", "acme+deployer", Permission::Write)
            .await?;

        assert_eq!(response.body().map(|p| p.delegate.robot), Some(true));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_repositories_uses_namespace_query() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/repository"))
            .and(query_param("namespace", "acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "repositories": [
                    {"namespace": "acme", "name": "web", "is_public": false},
                    {"namespace": "acme", "name": "api", "is_public": true}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let repositories = client
            .get_repositories_for_namespace("acme")
            .await?
            .into_body()
            .unwrap_or_default();

        let names: Vec<&str> = repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["web", "api"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_robot_permissions_unwrap_envelope() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/organization/acme/robots/deployer/permissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "permissions": [
                    {"repository": {"name": "web", "is_public": false}, "role": "read"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let permissions = client
            .get_robot_permissions("acme", "deployer")
            .await?
            .into_body()
            .unwrap_or_default();

        assert_eq!(permissions, vec![RepositoryPermission::new("web", Permission::Read)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_permission_targets_qualified_robot() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/repository/acme/web/permissions/user/acme+deployer"))
            .and(body_json(serde_json::json!({"role": "admin"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "role": "admin",
                "name": "acme+deployer",
                "is_robot": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let response = client
            .update_repository_user_permission("acme", "web", "deployer", Permission::Admin)
            .await?;

        assert_eq!(
            response.into_body(),
            Some(RepositoryPermission::new("web", Permission::Admin))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_is_not_a_transport_error() -> TestResult {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/organization/acme/prototypes"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let client = client_for(&server)?;
        let response = client.get_prototypes_by_organization("acme").await?;

        assert_eq!(response.status(), 500);
        assert_eq!(response.raw_body(), "Internal Server Error");
        Ok(())
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() -> TestResult {
        let config = ClientConfig::new("http://127.0.0.1:1".parse::<Url>()?);
        let client = QuayClient::new(config)?;

        let result = client.get_prototypes_by_organization("acme").await;

        assert!(matches!(result, Err(Error::Http(_))));
        Ok(())
    }
}
