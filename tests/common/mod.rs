use std::{env, sync::Arc};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Extension, Router,
};
use club_hub::{auth::Keys, connect_to_db};
use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

/// A router backed by `TEST_DATABASE_URL`, which must already have the
/// `migrations/` applied. `None` when the variable is unset.
pub fn setup() -> Option<TestApp> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL is not set, skipping");
        return None;
    };

    let pool = connect_to_db(&database_url).expect("Failed to build test pool");
    let keys = Keys::new(SECRET, "authenticated").expect("Failed to build keys");
    let router = club_hub::app()
        .layer(Extension(pool))
        .layer(Extension(Arc::new(keys)));
    Some(TestApp { router })
}

#[derive(Serialize)]
struct TestClaims {
    sub: Uuid,
    aud: &'static str,
    exp: u64,
}

pub fn token(user_id: Uuid) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &TestClaims {
            sub: user_id,
            aud: "authenticated",
            exp: jsonwebtoken::get_current_timestamp() + 3600,
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

pub struct TestApp {
    router: Router,
}

#[allow(dead_code)]
impl TestApp {
    /// Sends one request as `user` and returns the status and JSON body
    /// (`Null` when the body is empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Uuid,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .expect("Failed to build request");

        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Router failed");
        let status = resp.status();
        let bytes = hyper::body::to_bytes(resp.into_body())
            .await
            .expect("Failed to read body");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn student(&self, name: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        let (status, body) = self
            .call(
                Method::POST,
                "/api/session/profile",
                user_id,
                Some(json!({ "fullName": name, "email": format!("{user_id}@school.edu") })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "profile registration: {body}");
        user_id
    }

    pub async fn admin(&self) -> Uuid {
        let user_id = Uuid::new_v4();
        let (status, body) = self
            .call(
                Method::POST,
                "/api/session/admin",
                user_id,
                Some(json!({
                    "fullName": "Test Admin",
                    "schoolName": "Test High",
                    "email": format!("{user_id}@staff.school.edu"),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "admin registration: {body}");
        user_id
    }

    pub async fn club(&self, admin: Uuid, name: &str) -> Uuid {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/admin/clubs",
                admin,
                Some(json!({ "name": name, "description": "A test club" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "club creation: {body}");
        parse_id(&body["id"])
    }

    pub async fn assign_president(&self, admin: Uuid, club: Uuid, user: Uuid) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/admin/president/{club}"),
                admin,
                Some(json!({ "userId": user })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "president assignment: {body}");
        body
    }

    /// A fresh admin, a club of theirs and a president for it.
    pub async fn presided_club(&self, name: &str) -> (Uuid, Uuid, Uuid) {
        let admin = self.admin().await;
        let club = self.club(admin, name).await;
        let president = self.student("Pat President").await;
        self.assign_president(admin, club, president).await;
        (admin, club, president)
    }

    pub async fn join(&self, user: Uuid, club: Uuid) -> (StatusCode, Value) {
        self.call(Method::POST, &format!("/api/membership/join/{club}"), user, None)
            .await
    }

    /// The caller's memberships in one club.
    pub async fn memberships(&self, user: Uuid, club: Uuid) -> Vec<Value> {
        let (status, body) = self.call(Method::GET, "/api/membership/mine", user, None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .expect("membership list")
            .iter()
            .filter(|m| m["clubId"] == club.to_string())
            .cloned()
            .collect()
    }

    pub async fn member_count(&self, user: Uuid, club: Uuid) -> i64 {
        let (status, body) = self
            .call(Method::GET, &format!("/api/club/info/{club}"), user, None)
            .await;
        assert_eq!(status, StatusCode::OK, "club info: {body}");
        body["memberCount"].as_i64().expect("memberCount")
    }
}

pub fn parse_id(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("a uuid")
}
