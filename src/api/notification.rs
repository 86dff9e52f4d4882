use crate::{
    auth::ProfileOnly,
    error::{AppError, AppResult},
    models::{Notification, NotificationType},
    schema::*,
    DbPool,
};
use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::{prelude::*, update};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use uuid::Uuid;

const LATEST: i64 = 20;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationResponse {
    id: Uuid,
    #[serde(rename = "type")]
    kind: NotificationType,
    title: String,
    message: String,
    read: bool,
    club_id: Option<Uuid>,
    club_name: Option<String>,
    created_at: DateTime<Utc>,
}

async fn list(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<Vec<NotificationResponse>>> {
    let conn = &mut pool.get().await?;

    let rows = notifications::table
        .left_join(clubs::table)
        .filter(notifications::user_id.eq(profile.id))
        .order(notifications::created_at.desc())
        .limit(LATEST)
        .select((notifications::all_columns, clubs::name.nullable()))
        .load::<(Notification, Option<String>)>(conn)
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(n, club_name)| NotificationResponse {
                id: n.id,
                kind: n.kind,
                title: n.title,
                message: n.message,
                read: n.read,
                club_id: n.club_id,
                club_name,
                created_at: n.created_at,
            })
            .collect(),
    ))
}

async fn mark_read(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;

    // someone else's notification looks the same as a missing one
    let updated = update(
        notifications::table
            .find(notification_id)
            .filter(notifications::user_id.eq(profile.id)),
    )
    .set(notifications::read.eq(true))
    .execute(conn)
    .await?;

    if updated == 0 {
        return Err(AppError::not_found("the notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct MarkAllResponse {
    updated: usize,
}

async fn mark_all_read(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<MarkAllResponse>> {
    let conn = &mut pool.get().await?;

    let updated = update(
        notifications::table
            .filter(notifications::user_id.eq(profile.id))
            .filter(notifications::read.eq(false)),
    )
    .set(notifications::read.eq(true))
    .execute(conn)
    .await?;

    Ok(Json(MarkAllResponse { updated }))
}

pub fn app() -> Router {
    Router::new()
        .route("/list", get(list))
        .route("/read/:notification_id", post(mark_read))
        .route("/read-all", post(mark_all_read))
}
