//! Black-box HTTP tests: the same router as prod, bound to an ephemeral
//! port, exercised with a real client.

use chrono::Duration as ChronoDuration;
use reqwest::StatusCode;
use serde_json::{Value, json};

use clavis_api::config::Config;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = Config {
            port: 0,
            jwt_secret: "black-box-secret".to_string(),
            jwt_issuer: "clavis".to_string(),
            access_ttl: ChronoDuration::minutes(15),
            refresh_prefix: "cv_".to_string(),
            refresh_ttl: ChronoDuration::days(7),
            id_namespace: "clavis".to_string(),
        };

        let (app, _worker) = clavis_api::app::build_app(&config).expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn register(client: &reqwest::Client, base_url: &str, username: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{base_url}/api/register"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap()
}

/// Login is eventual-consistent with registration (projection lag); poll
/// briefly until the read model catches up.
async fn login_eventually(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Value {
    for _ in 0..100 {
        let res = client
            .post(format!("{base_url}/api/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();

        if res.status() == StatusCode::OK {
            return res.json().await.unwrap();
        }

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    panic!("user never became loginable within timeout");
}

#[tokio::test]
async fn register_login_validate_round_trip() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &server.base_url, "alice", "correct-horse").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["version"], 1);

    let tokens = login_eventually(&client, &server.base_url, "alice", "correct-horse").await;
    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();
    assert!(refresh.starts_with("cv_"));

    let res = client
        .get(format!("{}/api/validate", server.base_url))
        .bearer_auth(access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let validated: Value = res.json().await.unwrap();
    assert_eq!(validated["user_id"], body["user_id"]);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &server.base_url, "alice", "correct-horse").await;
    login_eventually(&client, &server.base_url, "alice", "correct-horse").await;

    let wrong_password = client
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": "alice", "password": "battery-staple" }))
        .send()
        .await
        .unwrap();
    let unknown_user = client
        .post(format!("{}/api/login", server.base_url))
        .json(&json!({ "username": "nobody", "password": "battery-staple" }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_user.json().await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let first = register(&client, &server.base_url, "alice", "correct-horse").await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = register(&client, &server.base_url, "alice", "other-password").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn short_password_is_a_validation_error() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &server.base_url, "alice", "short").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_rotates_and_logout_revokes() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &server.base_url, "alice", "correct-horse").await;
    let tokens = login_eventually(&client, &server.base_url, "alice", "correct-horse").await;
    let old_refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    // Rotate.
    let res = client
        .post(format!("{}/api/refresh", server.base_url))
        .json(&json!({ "refresh_token": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rotated: Value = res.json().await.unwrap();
    let new_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, old_refresh);

    // The predecessor is dead.
    let res = client
        .post(format!("{}/api/refresh", server.base_url))
        .json(&json!({ "refresh_token": old_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Logout, then the successor is dead too.
    let res = client
        .post(format!("{}/api/logout", server.base_url))
        .json(&json!({ "refresh_token": new_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .post(format!("{}/api/refresh", server.base_url))
        .json(&json!({ "refresh_token": new_refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tampered_access_token_is_rejected() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &server.base_url, "alice", "correct-horse").await;
    let tokens = login_eventually(&client, &server.base_url, "alice", "correct-horse").await;
    let access = tokens["access_token"].as_str().unwrap();

    let mut tampered = access.to_string();
    tampered.pop();
    tampered.push('x');

    let res = client
        .get(format!("{}/api/validate", server.base_url))
        .bearer_auth(tampered)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoint_is_open() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/healthz", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
