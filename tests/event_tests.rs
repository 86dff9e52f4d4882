mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::{json, Value};
use uuid::Uuid;

async fn event_notes(app: &TestApp, user: Uuid, club: Uuid) -> usize {
    let (status, notes) = app.call(Method::GET, "/api/notification/list", user, None).await;
    assert_eq!(status, StatusCode::OK);
    notes
        .as_array()
        .unwrap()
        .iter()
        .filter(|n: &&Value| n["clubId"] == club.to_string() && n["type"] == "event")
        .count()
}

#[tokio::test]
async fn new_event_notifies_members_but_not_its_creator() {
    let Some(app) = setup() else { return };
    let (_, club, president) = app.presided_club("Astronomy").await;
    let member = app.student("Mia Member").await;
    let applicant = app.student("Alex Applicant").await;

    let (_, body) = app.join(member, club).await;
    let membership = parse_id(&body["id"]);
    let (status, _) = app
        .call(Method::POST, &format!("/api/membership/approve/{membership}"), president, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    app.join(applicant, club).await;

    let (status, event) = app
        .call(
            Method::POST,
            &format!("/api/president/events/{club}"),
            president,
            Some(json!({
                "title": "Star Party",
                "eventDate": "2099-03-07",
                "eventTime": "20:30:00",
                "location": "Roof",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "event: {event}");

    assert_eq!(event_notes(&app, member, club).await, 1);
    assert_eq!(event_notes(&app, president, club).await, 0);
    assert_eq!(event_notes(&app, applicant, club).await, 0);

    let (_, upcoming) = app
        .call(Method::GET, &format!("/api/club/events/{club}"), member, None)
        .await;
    assert!(upcoming
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["id"] == event["id"]));
}

#[tokio::test]
async fn cleared_description_is_null() {
    let Some(app) = setup() else { return };
    let (_, club, president) = app.presided_club("Gardening").await;

    let (_, event) = app
        .call(
            Method::POST,
            &format!("/api/president/events/{club}"),
            president,
            Some(json!({
                "title": "Planting",
                "description": "Bring gloves",
                "eventDate": "2099-04-01",
                "eventTime": "10:00:00",
                "location": "Greenhouse",
            })),
        )
        .await;
    let id = parse_id(&event["id"]);

    let (status, edited) = app
        .call(
            Method::PUT,
            &format!("/api/president/event/{id}"),
            president,
            Some(json!({ "description": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["description"], Value::Null);
    assert_eq!(edited["title"], "Planting");
}
