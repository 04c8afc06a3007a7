//! Integration tests for the identity and user-management REST surface.
//!
//! Drives the full router (middleware included) with in-memory requests
//! against a temporary SQLite store, covering the login / RBAC / user
//! lifecycle contract end to end.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::util::ServiceExt;
use zonelink_backend::auth::{
    api::{router, AuthState},
    AuthService, JwtHandler, SqliteUserStore,
};

const TEST_SECRET: &str = "integration-test-secret-key";

struct TestApp {
    app: Router,
    jwt: Arc<JwtHandler>,
    _temp: NamedTempFile,
}

async fn spawn_app() -> TestApp {
    let temp = NamedTempFile::new().unwrap();
    let store = Arc::new(SqliteUserStore::new(temp.path().to_str().unwrap()).unwrap());
    let jwt = Arc::new(JwtHandler::new(TEST_SECRET.to_string()));
    let service = Arc::new(AuthService::new(store, jwt.clone()));

    service.ensure_default_admin("bootpw").await.unwrap();

    TestApp {
        app: router(AuthState::new(service, jwt.clone())),
        jwt,
        _temp: temp,
    }
}

impl TestApp {
    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self.login("admin", "bootpw").await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_check_is_public() {
    let app = spawn_app().await;
    let (status, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_login_bad_body_is_400() {
    let app = spawn_app().await;
    let (status, _) = app
        .request("POST", "/api/auth/login", None, Some(json!({ "nope": 1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_full_user_lifecycle() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;

    // Create admin operator alice with one zone
    let (status, alice) = app
        .request(
            "POST",
            "/api/users",
            Some(&admin_token),
            Some(json!({
                "username": "alice",
                "password": "pw1",
                "role": "admin",
                "zones": ["z1"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(alice.get("password_hash").is_none());
    let alice_id = alice["id"].as_str().unwrap().to_string();

    // Login returns the token plus zones and role from the record
    let (status, body) = app.login("alice", "pw1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "admin");
    assert_eq!(body["zones"], json!(["z1"]));

    // The issued token decodes back to alice's identity and role
    let claims = app.jwt.validate_token(body["token"].as_str().unwrap()).unwrap();
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.role.as_str(), "admin");

    // Wrong password fails authentication
    let (status, _) = app.login("alice", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Replace alice's zones wholesale
    let (status, updated) = app
        .request(
            "PUT",
            &format!("/api/users/{}", alice_id),
            Some(&admin_token),
            Some(json!({ "zones": ["z2", "z3"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["zones"], json!(["z2", "z3"]));

    // Delete alice, then her credentials no longer authenticate
    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/users/{}", alice_id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.login("alice", "pw1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let body = json!({ "username": "alice", "password": "pw1", "role": "admin" });

    let (status, _) = app
        .request("POST", "/api/users", Some(&token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request("POST", "/api/users", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_without_zones_yields_empty_set() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (status, created) = app
        .request(
            "POST",
            "/api/users",
            Some(&token),
            Some(json!({ "username": "bob", "password": "pw", "role": "zone_admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["zones"], json!([]));

    let (status, listed) = app.request("GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let bob = listed["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "bob")
        .unwrap();
    assert_eq!(bob["zones"], json!([]));
}

#[tokio::test]
async fn test_invalid_role_is_400() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (status, _) = app
        .request(
            "POST",
            "/api/users",
            Some(&token),
            Some(json!({ "username": "eve", "password": "pw", "role": "superuser" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_users_shape_and_redaction() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (status, body) = app.request("GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalResults"], 1);

    let admin = &body["results"][0];
    assert_eq!(admin["username"], "admin");
    assert!(admin.get("password_hash").is_none());
}

#[tokio::test]
async fn test_admin_routes_refuse_uniformly() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;

    // A zone_admin token is not enough for user management
    let (status, _) = app
        .request(
            "POST",
            "/api/users",
            Some(&admin_token),
            Some(json!({ "username": "bob", "password": "pw", "role": "zone_admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = app.login("bob", "pw").await;
    let bob_token = body["token"].as_str().unwrap().to_string();

    let (wrong_role_status, wrong_role_body) =
        app.request("GET", "/api/users", Some(&bob_token), None).await;
    let (no_cred_status, no_cred_body) = app.request("GET", "/api/users", None, None).await;
    let (bad_token_status, bad_token_body) = app
        .request("GET", "/api/users", Some("garbage.token.here"), None)
        .await;

    // Wrong role, missing credential, and malformed token are
    // indistinguishable to the caller
    assert_eq!(wrong_role_status, StatusCode::UNAUTHORIZED);
    assert_eq!(no_cred_status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad_token_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_role_body, no_cred_body);
    assert_eq!(wrong_role_body, bad_token_body);
}

#[tokio::test]
async fn test_update_and_delete_unknown_id_are_400() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let unknown = uuid::Uuid::new_v4();

    let (status, _) = app
        .request(
            "PUT",
            &format!("/api/users/{}", unknown),
            Some(&token),
            Some(json!({ "zones": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "DELETE",
            &format!("/api/users/{}", unknown),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A non-UUID id is treated the same as an unknown one
    let (status, _) = app
        .request("DELETE", "/api/users/not-a-uuid", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_token_refused() {
    let app = spawn_app().await;

    // Token minted with the right secret but already expired
    let expired_jwt = JwtHandler::with_expiration(TEST_SECRET.to_string(), -2);
    let user = {
        let (_, body) = app.login("admin", "bootpw").await;
        let claims = app.jwt.validate_token(body["token"].as_str().unwrap()).unwrap();
        zonelink_backend::auth::models::User {
            id: uuid::Uuid::parse_str(&claims.sub).unwrap(),
            username: claims.username,
            password_hash: String::new(),
            role: claims.role,
            zones: vec![],
            created_at: String::new(),
        }
    };
    let stale = expired_jwt.generate_token(&user).unwrap();

    let (status, _) = app.request("GET", "/api/users", Some(&stale), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
