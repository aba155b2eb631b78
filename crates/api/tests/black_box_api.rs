use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use opsconsole_api::{ApiConfig, app::build_app};
use opsconsole_auth::JwtClaims;
use opsconsole_core::UserId;
use opsconsole_infra::Services;

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "root@ops.test";
const ADMIN_PASSWORD: &str = "Sup3r-Secret!";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over in-memory services, bound to an ephemeral port.
    async fn spawn() -> Self {
        let services = Arc::new(Services::in_memory(JWT_SECRET.as_bytes()));
        services
            .bootstrap_super_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("failed to seed super_admin");

        let config = ApiConfig {
            jwt_secret: JWT_SECRET.to_string(),
            ..Default::default()
        };
        let app = build_app(services, &config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login_body(&self, email: &str, password: &str) -> Value {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "login failed for {email}");
        res.json().await.unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let body = self.login_body(email, password).await;
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn post_json(&self, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        let body = res.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get_json(&self, token: &str, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = res.status();
        let body = res.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn create_department(&self, token: &str, code: &str) -> String {
        let (status, body) = self
            .post_json(
                token,
                "/departments",
                json!({ "code": code, "name": format!("{code} department") }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_user(&self, token: &str, email: &str, role: &str, department_id: &str) -> String {
        let (status, body) = self
            .post_json(
                token,
                "/admin/users",
                json!({
                    "email": email,
                    "password": ADMIN_PASSWORD,
                    "full_name": "Test User",
                    "role": role,
                    "department_id": department_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, claims: &JwtClaims) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_must_name_a_live_account_and_be_current() {
    let srv = TestServer::spawn().await;

    let ghost = JwtClaims::new(UserId::new(), "ghost@ops.test", Utc::now(), ChronoDuration::minutes(10));
    let (status, _) = srv.get_json(&mint_jwt(JWT_SECRET, &ghost), "/whoami").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = JwtClaims::new(
        UserId::new(),
        "late@ops.test",
        Utc::now() - ChronoDuration::hours(2),
        ChronoDuration::minutes(10),
    );
    let (status, _) = srv.get_json(&mint_jwt(JWT_SECRET, &expired), "/whoami").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = JwtClaims::new(UserId::new(), "x@ops.test", Utc::now(), ChronoDuration::minutes(10));
    let (status, _) = srv.get_json(&mint_jwt("other-secret", &forged), "/whoami").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_resolves_principal_from_directory() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let (status, body) = srv.get_json(&token, "/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert_eq!(body["highest_role"], "super_admin");
    assert!(body["permissions"].as_array().unwrap().iter().any(|p| p == "*"));
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let srv = TestServer::spawn().await;

    let wrong_password = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "Wrong-Pass1!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let a: Value = wrong_password.json().await.unwrap();

    let unknown_user = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "nobody@ops.test", "password": "Wrong-Pass1!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let b: Value = unknown_user.json().await.unwrap();

    assert_eq!(a, b);
}

#[tokio::test]
async fn fleet_lifecycle_and_error_statuses() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;
    let dept = srv.create_department(&token, "OPS").await;

    let (status, fleet) = srv
        .post_json(
            &token,
            "/fleet/vehicles",
            json!({ "department_id": dept, "fleet_number": "EX-01", "machine_type": "Excavator" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{fleet}");
    let id = fleet["id"].as_str().unwrap();
    assert_eq!(fleet["status"], "operational");

    let (status, body) = srv.get_json(&token, &format!("/fleet/vehicles/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fleet_number"], "EX-01");

    let (status, body) = srv
        .post_json(
            &token,
            "/fleet/vehicles",
            json!({ "department_id": dept, "fleet_number": "ex-01", "machine_type": "Loader" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = srv.get_json(&token, "/fleet/vehicles/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, _) = srv
        .get_json(&token, &format!("/fleet/vehicles/{}", uuid::Uuid::now_v7()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv.get_json(&token, &format!("/fleet/vehicles?department_id={dept}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn staff_cannot_manage_departments() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let dept = srv.create_department(&admin, "WH").await;
    srv.create_user(&admin, "staff@ops.test", "staff", &dept).await;

    let staff = srv.login("staff@ops.test", ADMIN_PASSWORD).await;
    let (status, body) = srv
        .post_json(&staff, "/departments", json!({ "code": "NEW", "name": "New" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // Reading the department list is open to everyone.
    let (status, body) = srv.get_json(&staff, "/departments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stock_cannot_go_negative() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;
    let dept = srv.create_department(&token, "STORE").await;

    let (status, item) = srv
        .post_json(
            &token,
            "/warehouse/items",
            json!({
                "department_id": dept,
                "item_number": "GL-1",
                "item_name": "Gloves",
                "quantity": 5,
                "min_quantity": 2,
                "location": "Shelf A",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{item}");
    let id = item["id"].as_str().unwrap();

    let (status, body) = srv
        .post_json(
            &token,
            &format!("/warehouse/items/{id}/movements"),
            json!({ "transaction_type": "out", "quantity": 10, "reason": "issued" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");

    let (status, tx) = srv
        .post_json(
            &token,
            &format!("/warehouse/items/{id}/movements"),
            json!({ "transaction_type": "out", "quantity": 4, "reason": "issued" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{tx}");
    assert_eq!(tx["previous_quantity"], 5);
    assert_eq!(tx["new_quantity"], 1);

    let (_, item) = srv.get_json(&token, &format!("/warehouse/items/{id}")).await;
    assert_eq!(item["quantity"], 1);
}

#[tokio::test]
async fn uploads_are_served_publicly() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;
    let bytes = b"\x89PNG fake image".to_vec();

    let res = srv
        .client
        .post(srv.url("/storage/item-images/gl-1/photo.png"))
        .bearer_auth(&token)
        .body(bytes.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    let url = body["url"].as_str().unwrap().to_string();
    assert_eq!(url, "/storage/item-images/gl-1/photo.png");

    let res = srv.client.get(srv.url(&url)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.bytes().await.unwrap().to_vec(), bytes);

    let res = srv
        .client
        .get(srv.url("/storage/unknown-bucket/x.png"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_initiated_password_reset_round_trip() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let dept = srv.create_department(&admin, "HR").await;
    let user_id = srv.create_user(&admin, "reset@ops.test", "staff", &dept).await;

    let (status, issued) = srv
        .post_json(&admin, "/admin/password-resets", json!({ "user_id": user_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{issued}");
    assert!(issued.get("token").is_none());

    let login = srv.login_body("reset@ops.test", ADMIN_PASSWORD).await;
    assert_eq!(login["password_reset_required"], true);
    let reset_token = login["reset_token"].as_str().unwrap().to_string();

    let res = srv
        .client
        .post(srv.url("/auth/password-resets/complete"))
        .json(&json!({ "token": reset_token, "new_password": "N3w-Secret!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let login = srv.login_body("reset@ops.test", "N3w-Secret!").await;
    assert_eq!(login["password_reset_required"], false);

    // A redeemed token cannot be used twice.
    let res = srv
        .client
        .post(srv.url("/auth/password-resets/complete"))
        .json(&json!({ "token": reset_token, "new_password": "An0ther-Secret!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn password_reset_revokes_outstanding_tokens() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let dept = srv.create_department(&admin, "OPS").await;
    let user_id = srv.create_user(&admin, "leaver@ops.test", "staff", &dept).await;

    let stolen = srv.login("leaver@ops.test", ADMIN_PASSWORD).await;
    let (status, _) = srv.get_json(&stolen, "/whoami").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv
        .post_json(&admin, "/admin/password-resets", json!({ "user_id": user_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv.get_json(&stolen, "/whoami").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

    let fresh = srv.login("leaver@ops.test", ADMIN_PASSWORD).await;
    let (status, _) = srv.get_json(&fresh, "/whoami").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn item_import_is_all_or_nothing() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;
    let dept = srv.create_department(&token, "STORE").await;

    let (status, body) = srv
        .post_json(
            &token,
            "/warehouse/items/import",
            json!({
                "department_id": dept,
                "rows": [
                    { "item_name": "Cable ties", "quantity": 100, "min_quantity": 10 },
                    { "item_name": "", "quantity": 1 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["message"].as_str().unwrap_or_default().contains("row 2"), "{body}");

    let (_, listed) = srv
        .get_json(&token, &format!("/warehouse/items?department_id={dept}"))
        .await;
    assert_eq!(listed["items"].as_array().unwrap().len(), 0);

    let (status, body) = srv
        .post_json(
            &token,
            "/warehouse/items/import",
            json!({
                "department_id": dept,
                "rows": [
                    { "item_name": "Cable ties", "quantity": 100, "min_quantity": 10 },
                    { "item_number": "DR-1", "item_name": "Drill", "quantity": 2 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let imported = body.as_array().unwrap();
    assert_eq!(imported.len(), 2);
    assert!(imported[0]["item_number"].as_str().unwrap().starts_with("IT-"));
    assert_eq!(imported[1]["item_number"], "DR-1");
}

#[tokio::test]
async fn shared_uploads_are_not_overwritten() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;
    let upload = |bytes: &'static [u8]| {
        srv.client
            .post(srv.url("/storage/field-photos/site-7/front.jpg"))
            .bearer_auth(&token)
            .body(bytes)
            .send()
    };

    assert_eq!(upload(b"first").await.unwrap().status(), StatusCode::CREATED);
    assert_eq!(upload(b"second").await.unwrap().status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .get(srv.url("/storage/field-photos/site-7/front.jpg"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.bytes().await.unwrap().to_vec(), b"first".to_vec());
}

#[tokio::test]
async fn change_stream_opens_for_authenticated_users() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let res = srv
        .client
        .get(srv.url("/stream?tables=fleets"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let content_type = res.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));
}
