mod common;

use axum::http::{Method, StatusCode};
use common::*;

#[tokio::test]
async fn approving_a_request_admits_the_member_once() {
    let Some(app) = setup() else { return };
    let (_, club, president) = app.presided_club("Chess Club").await;
    let student = app.student("Sam Student").await;

    let (status, body) = app.join(student, club).await;
    assert_eq!(status, StatusCode::CREATED, "join: {body}");
    let membership = parse_id(&body["id"]);

    let (status, pending) = app
        .call(Method::GET, &format!("/api/president/requests/{club}"), president, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(pending
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["id"] == membership.to_string()));

    let approve = format!("/api/membership/approve/{membership}");
    let (status, body) = app.call(Method::POST, &approve, president, None).await;
    assert_eq!(status, StatusCode::OK, "approve: {body}");
    assert_eq!(body["status"], "accepted");

    let (status, _) = app.call(Method::POST, &approve, president, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, pending) = app
        .call(Method::GET, &format!("/api/president/requests/{club}"), president, None)
        .await;
    assert!(pending.as_array().unwrap().is_empty());

    let (status, roster) = app
        .call(Method::GET, &format!("/api/club/members/{club}"), student, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = roster
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["userId"] == student.to_string())
        .count();
    assert_eq!(listed, 1);

    // the president plus the new member
    assert_eq!(app.member_count(student, club).await, 2);
}

#[tokio::test]
async fn duplicate_join_is_a_conflict_until_rejected() {
    let Some(app) = setup() else { return };
    let (_, club, president) = app.presided_club("Robotics").await;
    let student = app.student("Riley Student").await;

    let (status, body) = app.join(student, club).await;
    assert_eq!(status, StatusCode::CREATED);
    let first = parse_id(&body["id"]);

    let (status, body) = app.join(student, club).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, body) = app
        .call(Method::POST, &format!("/api/membership/reject/{first}"), president, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "rejected");

    let (status, _) = app.join(student, club).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.memberships(student, club).await.len(), 2);
}

#[tokio::test]
async fn only_the_president_may_approve() {
    let Some(app) = setup() else { return };
    let (_, club, _) = app.presided_club("Drama").await;
    let student = app.student("Dana Student").await;
    let bystander = app.student("Bo Bystander").await;

    let (_, body) = app.join(student, club).await;
    let membership = parse_id(&body["id"]);

    let (status, _) = app
        .call(Method::POST, &format!("/api/membership/approve/{membership}"), bystander, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.memberships(student, club).await[0]["status"], "pending");
}
