use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Extension, Router,
};
use club_hub::{auth::Keys, connect_to_db};
use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

/// The router with a pool that never connects; every request here is
/// rejected before a connection is checked out.
fn router() -> Router {
    let pool = connect_to_db("postgres://nobody@127.0.0.1:1/club_hub").unwrap();
    club_hub::app()
        .layer(Extension(pool))
        .layer(Extension(Arc::new(Keys::new(SECRET, "authenticated").unwrap())))
}

#[derive(Serialize)]
struct TestClaims {
    sub: Uuid,
    aud: &'static str,
    exp: u64,
}

fn token(secret: &str) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &TestClaims {
            sub: Uuid::new_v4(),
            aud: "authenticated",
            exp: jsonwebtoken::get_current_timestamp() + 3600,
        },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn send(method: Method, uri: &str, authorization: Option<String>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        req = req.header(header::AUTHORIZATION, value);
    }

    let resp = router()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = hyper::body::to_bytes(resp.into_body()).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn assert_unauthorized((status, body): (StatusCode, Value), message: &str) {
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert_eq!(body["message"], message);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    assert_unauthorized(
        send(Method::GET, "/api/club/list", None).await,
        "missing bearer token",
    );
}

#[tokio::test]
async fn session_lookup_needs_a_token() {
    assert_unauthorized(
        send(Method::GET, "/api/session", None).await,
        "missing bearer token",
    );
}

#[tokio::test]
async fn basic_auth_is_not_a_session() {
    assert_unauthorized(
        send(
            Method::GET,
            "/api/notification/list",
            Some("Basic c3R1ZGVudDpodW50ZXIy".to_string()),
        )
        .await,
        "missing bearer token",
    );
}

#[tokio::test]
async fn malformed_token_is_unauthorized() {
    assert_unauthorized(
        send(
            Method::GET,
            "/api/admin/clubs",
            Some("Bearer not-a-jwt".to_string()),
        )
        .await,
        "invalid or expired session",
    );
}

#[tokio::test]
async fn token_from_another_issuer_is_unauthorized() {
    let forged = token("some-other-projects-secret-with-32-chars");
    assert_unauthorized(
        send(
            Method::POST,
            &format!("/api/membership/approve/{}", Uuid::new_v4()),
            Some(format!("Bearer {forged}")),
        )
        .await,
        "invalid or expired session",
    );
}

#[tokio::test]
async fn transitions_check_the_token_first() {
    assert_unauthorized(
        send(
            Method::DELETE,
            &format!("/api/membership/remove/{}", Uuid::new_v4()),
            None,
        )
        .await,
        "missing bearer token",
    );
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (status, _) = send(Method::GET, "/api/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
