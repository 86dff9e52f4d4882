mod common;

use axum::http::{Method, StatusCode};
use common::*;

#[tokio::test]
async fn new_club_needs_a_president() {
    let Some(app) = setup() else { return };
    let admin = app.admin().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/admin/clubs",
            admin,
            Some(serde_json::json!({ "name": "Chess Club", "description": "Weekly games" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "needs_president");
    assert_eq!(body["memberCount"], 0);
    assert_eq!(body["category"], "General");
}

#[tokio::test]
async fn pending_requester_is_promoted_when_made_president() {
    let Some(app) = setup() else { return };
    let admin = app.admin().await;
    let club = app.club(admin, "Debate").await;
    let student = app.student("Xavier Student").await;

    let (status, _) = app.join(student, club).await;
    assert_eq!(status, StatusCode::CREATED);

    let summary = app.assign_president(admin, club, student).await;
    assert_eq!(summary["status"], "active");
    assert_eq!(summary["memberCount"], 1);
    assert_eq!(summary["president"]["id"], student.to_string());

    let rows = app.memberships(student, club).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "accepted");

    let (_, users) = app.call(Method::GET, "/api/admin/users", admin, None).await;
    let entry = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["id"] == student.to_string())
        .cloned()
        .unwrap();
    assert_eq!(entry["classification"], "President");
}

#[tokio::test]
async fn president_without_a_request_gets_one_membership() {
    let Some(app) = setup() else { return };
    let admin = app.admin().await;
    let club = app.club(admin, "Art").await;
    let student = app.student("Yara Student").await;

    let summary = app.assign_president(admin, club, student).await;
    assert_eq!(summary["memberCount"], 1);

    let rows = app.memberships(student, club).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "accepted");

    let (_, notes) = app.call(Method::GET, "/api/notification/list", student, None).await;
    assert!(notes
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["clubId"] == club.to_string() && n["type"] == "info"));
}

#[tokio::test]
async fn deleted_club_is_gone() {
    let Some(app) = setup() else { return };
    let admin = app.admin().await;
    let club = app.club(admin, "Film").await;

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/admin/club/{club}"), admin, None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, clubs) = app.call(Method::GET, "/api/admin/clubs", admin, None).await;
    assert!(!clubs
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["id"] == club.to_string()));

    let (status, body) = app
        .call(Method::GET, &format!("/api/club/info/{club}"), admin, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn other_admins_cannot_touch_a_club() {
    let Some(app) = setup() else { return };
    let owner = app.admin().await;
    let other = app.admin().await;
    let club = app.club(owner, "Chorus").await;

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/admin/club/{club}"), other, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
