//! Reconciliation over HTTP against a mocked Quay API.

#![forbid(clippy::unwrap_used)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

use std::sync::Arc;

use quay_client::{ClientConfig, Permission, QuayClient, TeamRole};
use quay_reconciler::{Reconciler, Role};
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn reconciler_for(server: &MockServer) -> Result<Reconciler, Box<dyn std::error::Error>> {
    let config = ClientConfig::new(server.uri().parse::<Url>()?).token("admin-token");
    Ok(Reconciler::new(Arc::new(QuayClient::new(config)?)))
}

#[tokio::test]
async fn test_organization_pass_over_http() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organization/acme/robots/deployer"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"message": "Could not find robot"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/organization/acme/robots/deployer"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "name": "acme+deployer",
            "description": "",
            "created": "Mon, 01 Jan 2024 00:00:00 -0000",
            "last_accessed": null,
            "token": "SECRET"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/organization/acme/team/vault-creator"))
        .and(body_json(serde_json::json!({"name": "vault-creator", "role": "creator"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"name": "vault-creator", "role": "creator"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(
            "/api/v1/organization/acme/team/vault-creator/members/acme+deployer",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organization/acme/prototypes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"prototypes": []})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/organization/acme/prototypes"))
        .and(body_json(serde_json::json!({
            "role": "read",
            "delegate": {"kind": "user", "name": "acme+deployer"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "p1",
            "role": "read",
            "delegate": {"kind": "user", "name": "acme+deployer", "is_robot": true}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organization/acme/robots/deployer/permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "permissions": [
                {"repository": {"name": "web", "is_public": false}, "role": "read"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/repository"))
        .and(query_param("namespace", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "repositories": [
                {"namespace": "acme", "name": "web"},
                {"namespace": "acme", "name": "vault"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // "web" already holds read; only "vault" needs its admin override.
    Mock::given(method("PUT"))
        .and(path("/api/v1/repository/acme/vault/permissions/user/acme+deployer"))
        .and(body_json(serde_json::json!({"role": "admin"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "role": "admin",
            "name": "acme+deployer",
            "is_robot": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/repository/acme/web/permissions/user/acme+deployer"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let reconciler = reconciler_for(&server)?;
    let role = Role::organization("acme")
        .with_default_permission(Permission::Read)
        .with_repository("vault", Permission::Admin)
        .allow_repository_creation();

    let account = reconciler.create_robot("deployer", &role).await?;

    assert_eq!(account.name, "acme+deployer");
    assert_eq!(account.token, "SECRET");
    Ok(())
}

#[tokio::test]
async fn test_team_upsert_failure_surfaces_status() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/organization/acme/robots/deployer"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"name": "acme+deployer", "token": "T"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/organization/acme/team/devs"))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            serde_json::json!({"message": "Unauthorized"}),
        ))
        .mount(&server)
        .await;

    let reconciler = reconciler_for(&server)?;
    let role = Role::organization("acme").with_team("devs", TeamRole::Member);

    let result = reconciler.create_robot("deployer", &role).await;

    let err = result.err();
    assert_eq!(err.as_ref().and_then(quay_reconciler::Error::status), Some(403));
    let message = err.map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("create_team"));
    assert!(message.contains("Unauthorized"));
    Ok(())
}

#[tokio::test]
async fn test_user_namespace_rotation_over_http() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/user/jdoe/robots/ci/regenerate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"name": "jdoe+ci", "token": "ROTATED"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reconciler = reconciler_for(&server)?;

    let account = reconciler
        .regenerate_robot_password("ci", &Role::user("jdoe"))
        .await?;

    assert_eq!(account.token, "ROTATED");
    Ok(())
}
