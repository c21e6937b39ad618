//! Dispatcher tests against a wiremock backend.
//!
//! Covers credential attachment rules, the fallback table, status
//! normalization, and the full login/logout scenario.

use std::sync::Arc;
use std::time::Duration;

use artha_core::client::{ApiClient, ApiPayload};
use artha_core::config::ApiConfig;
use artha_core::credentials::{ActiveRole, CredentialSlot, CredentialStore};
use artha_core::error::ApiError;
use artha_core::session::{self, LoginCredentials, LoginRole};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_setup(server: &MockServer) -> (ApiClient, Arc<CredentialStore>, TempDir) {
    let dir = TempDir::new().expect("create temp credential home");
    let store = Arc::new(CredentialStore::open(dir.path().join("credentials.json")));
    let config = ApiConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    };
    let client = ApiClient::new(&config, Arc::clone(&store)).expect("build client");
    (client, store, dir)
}

fn json_ok(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Authorization header of the only request the server received.
async fn sole_request_auth(server: &MockServer) -> Option<String> {
    let requests = server.received_requests().await.expect("requests recorded");
    assert_eq!(requests.len(), 1);
    requests[0]
        .headers
        .get("authorization")
        .map(|v| v.to_str().expect("ascii header").to_string())
}

#[tokio::test]
async fn test_public_endpoint_never_authenticated() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);

    // Every slot populated; the public path still goes out bare.
    for slot in CredentialSlot::ALL {
        store.set(slot, "some-token").unwrap();
    }

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(json_ok(json!({"token": "fresh"})))
        .mount(&server)
        .await;

    client
        .post("/api/auth/login", json!({"email": "a@b.c", "password": "pw"}))
        .await
        .unwrap();

    assert_eq!(sole_request_auth(&server).await, None);
}

#[tokio::test]
async fn test_role_slot_attaches_exactly_its_token() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);

    store.set(CredentialSlot::School, "school-tok").unwrap();
    store.set(CredentialSlot::Student, "student-tok").unwrap();
    store.set(CredentialSlot::Generic, "generic-tok").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/school/profile"))
        .and(header("authorization", "Bearer school-tok"))
        .respond_with(json_ok(json!({"name": "Vidya School"})))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client.get("/api/school/profile").await.unwrap();
    assert_eq!(payload.as_json().unwrap()["name"], "Vidya School");
}

#[tokio::test]
async fn test_student_and_admin_fall_back_to_generic() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);

    store.set(CredentialSlot::Generic, "generic-tok").unwrap();

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer generic-tok"))
        .respond_with(json_ok(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    client.get("/api/students/profile").await.unwrap();
    client.get("/api/admin/users").await.unwrap();
}

#[tokio::test]
async fn test_school_and_parent_never_fall_back() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);

    // Only the generic slot holds a token; school/parent must go out bare.
    store.set(CredentialSlot::Generic, "generic-tok").unwrap();

    Mock::given(method("GET"))
        .respond_with(json_ok(json!({})))
        .mount(&server)
        .await;

    client.get("/api/school/profile").await.unwrap();
    client.get("/api/parent/children").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests {
        assert!(
            request.headers.get("authorization").is_none(),
            "unexpected Authorization on {}",
            request.url.path()
        );
    }
}

#[tokio::test]
async fn test_role_slot_wins_over_generic() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);

    store.set(CredentialSlot::Student, "student-tok").unwrap();
    store.set(CredentialSlot::Generic, "generic-tok").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/students/results"))
        .and(header("authorization", "Bearer student-tok"))
        .respond_with(json_ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client.get("/api/students/results").await.unwrap();
}

#[tokio::test]
async fn test_missing_credential_proceeds_unauthenticated() {
    let server = MockServer::start().await;
    let (client, _store, _dir) = test_setup(&server);

    Mock::given(method("GET"))
        .and(path("/api/students/profile"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({"message": "login required"})),
        )
        .mount(&server)
        .await;

    // The client does not pre-empt the server's authorization decision.
    let err = client.get("/api/students/profile").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::AuthorizationExpired {
            status: 401,
            message: "login required".to_string(),
        }
    );
    assert_eq!(sole_request_auth(&server).await, None);
}

#[tokio::test]
async fn test_401_json_message_extracted() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);
    store.set(CredentialSlot::Student, "stale").unwrap();

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({"message": "expired"})),
        )
        .mount(&server)
        .await;

    let err = client.get("/api/students/profile").await.unwrap_err();
    assert!(err.is_authorization_expired());
    assert_eq!(
        err,
        ApiError::AuthorizationExpired {
            status: 401,
            message: "expired".to_string(),
        }
    );
}

#[tokio::test]
async fn test_403_without_json_body_uses_status_text() {
    let server = MockServer::start().await;
    let (client, _store, _dir) = test_setup(&server);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<html>denied</html>"))
        .mount(&server)
        .await;

    let err = client.get("/api/students/profile").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::AuthorizationExpired {
            status: 403,
            message: "Forbidden".to_string(),
        }
    );
}

#[tokio::test]
async fn test_500_without_json_body_is_request_failed() {
    let server = MockServer::start().await;
    let (client, _store, _dir) = test_setup(&server);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.get("/api/courses").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::RequestFailed {
            status: 500,
            message: "Internal Server Error".to_string(),
        }
    );
}

#[tokio::test]
async fn test_204_is_explicit_no_content() {
    let server = MockServer::start().await;
    let (client, _store, _dir) = test_setup(&server);

    Mock::given(method("DELETE"))
        .and(path("/api/students/notifications/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let payload = client.delete("/api/students/notifications/7").await.unwrap();
    assert_eq!(payload, ApiPayload::NoContent);
    assert_ne!(payload, ApiPayload::Json(json!({})));
}

#[tokio::test]
async fn test_non_json_content_type_returns_raw_text() {
    let server = MockServer::start().await;
    let (client, _store, _dir) = test_setup(&server);

    // The body parses as JSON but the content type does not declare it.
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string(r#"{"looks":"like json"}"#),
        )
        .mount(&server)
        .await;

    let payload = client.get("/api/webpages/about").await.unwrap();
    assert_eq!(payload, ApiPayload::Text(r#"{"looks":"like json"}"#.to_string()));
}

#[tokio::test]
async fn test_default_content_type_and_caller_header_precedence() {
    let server = MockServer::start().await;
    let (client, _store, _dir) = test_setup(&server);

    Mock::given(method("POST"))
        .respond_with(json_ok(json!({})))
        .mount(&server)
        .await;

    client.post("/api/feedback", json!({"text": "hi"})).await.unwrap();

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/xml"),
    );
    client
        .send(
            reqwest::Method::POST,
            "/api/feedback",
            Some(artha_core::client::RequestBody::Json(json!({"text": "hi"}))),
            Some(headers),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/json"
    );
    // Caller-supplied header wins over the JSON default.
    assert_eq!(
        requests[1].headers.get("content-type").unwrap(),
        "application/xml"
    );
}

#[tokio::test]
async fn test_connection_refused_is_network_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(CredentialStore::open(dir.path().join("credentials.json")));
    let config = ApiConfig {
        // Reserved port nothing listens on.
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
    };
    let client = ApiClient::new(&config, store).unwrap();

    let err = client.get("/api/courses").await.unwrap_err();
    assert!(matches!(err, ApiError::NetworkUnavailable { .. }));
}

#[tokio::test]
async fn test_timeout_is_network_unavailable_timeout_variant() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = Arc::new(CredentialStore::open(dir.path().join("credentials.json")));
    let config = ApiConfig {
        base_url: server.uri(),
        timeout_secs: 1,
    };
    let client = ApiClient::new(&config, store).unwrap();

    Mock::given(method("GET"))
        .respond_with(json_ok(json!({})).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let err = client.get("/api/courses").await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::NetworkUnavailable { timed_out: true, .. }
    ));
}

#[tokio::test]
async fn test_school_login_then_request_then_logout() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);

    Mock::given(method("POST"))
        .and(path("/api/school/auth/login"))
        .and(body_json(json!({"emailOrMobile": "staff@school.in", "password": "pw"})))
        .respond_with(json_ok(json!({"token": "abc", "userType": "teacher"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/school/profile"))
        .respond_with(json_ok(json!({"name": "Vidya School"})))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = session::login(
        &client,
        &store,
        LoginRole::School,
        &LoginCredentials {
            identifier: "staff@school.in".to_string(),
            password: "pw".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.token, "abc");
    assert_eq!(outcome.role, ActiveRole::School);
    assert_eq!(outcome.staff_kind.as_deref(), Some("teacher"));
    assert_eq!(store.active_role(), Some(ActiveRole::School));
    // The staff kind is persisted, not just returned.
    assert_eq!(store.staff_kind().as_deref(), Some("teacher"));

    client.get("/api/school/profile").await.unwrap();

    session::logout(&store).unwrap();
    assert!(store.tokens().is_empty());
    assert_eq!(store.active_role(), None);
    assert_eq!(store.staff_kind(), None);

    client.get("/api/school/profile").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    // Logged in: exactly Bearer abc. Logged out: no header at all.
    assert_eq!(
        requests[1].headers.get("authorization").unwrap(),
        "Bearer abc"
    );
    assert!(requests[2].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_student_login_populates_generic_slot() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);

    // Stale school session from a previous login must be wiped.
    store.set(CredentialSlot::School, "stale-school").unwrap();
    store.set_active_role(ActiveRole::School).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(json_ok(json!({"data": {"token": "stu-1"}})))
        .mount(&server)
        .await;

    session::login(
        &client,
        &store,
        LoginRole::Student,
        &LoginCredentials {
            identifier: "kid@school.in".to_string(),
            password: "pw".to_string(),
        },
    )
    .await
    .unwrap();

    assert_eq!(store.get(CredentialSlot::Student), Some("stu-1".to_string()));
    assert_eq!(store.get(CredentialSlot::Generic), Some("stu-1".to_string()));
    assert_eq!(store.get(CredentialSlot::School), None);
    assert_eq!(store.active_role(), Some(ActiveRole::Student));
}

#[tokio::test]
async fn test_login_response_without_token_is_request_failed() {
    let server = MockServer::start().await;
    let (client, store, _dir) = test_setup(&server);

    Mock::given(method("POST"))
        .and(path("/api/parent/auth/login"))
        .respond_with(json_ok(json!({"user": {"name": "A Parent"}})))
        .mount(&server)
        .await;

    let err = session::login(
        &client,
        &store,
        LoginRole::Parent,
        &LoginCredentials {
            identifier: "p@x.in".to_string(),
            password: "pw".to_string(),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::RequestFailed { .. }));
    assert_eq!(store.active_role(), None);
    assert!(store.tokens().is_empty());
}
