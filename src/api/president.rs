use super::{clearable, club::find_club, optional, required};
use crate::{
    auth::ProfileOnly,
    error::{AppError, AppResult},
    models::{Club, ClubRole, Event, MembershipStatus, Profile},
    notify,
    schema::*,
    views::{self, ClubSummary, EventResponse, PendingRequest},
    DbPool,
};
use axum::{
    extract::Path,
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::{insert_into, prelude::*, update};
use diesel_async::{
    scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The club, if `profile` is its president.
async fn presided_club(
    conn: &mut AsyncPgConnection,
    profile: &Profile,
    club_id: Uuid,
) -> AppResult<Club> {
    let club = find_club(conn, club_id).await?;
    if club.president_id != Some(profile.id) {
        return Err(AppError::forbidden("you are not the president of this club"));
    }
    Ok(club)
}

async fn clubs(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<Vec<ClubSummary>>> {
    let conn = &mut pool.get().await?;

    let clubs = clubs::table
        .filter(clubs::president_id.eq(profile.id))
        .order(clubs::name.asc())
        .load::<Club>(conn)
        .await?;

    Ok(Json(views::summarize(conn, clubs).await?))
}

async fn requests(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<Vec<PendingRequest>>> {
    let conn = &mut pool.get().await?;
    let club = presided_club(conn, &profile, club_id).await?;
    Ok(Json(views::load_pending(conn, &[club]).await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleResponse {
    id: Uuid,
    club_id: Uuid,
    name: String,
    permissions: Vec<String>,
}

impl From<ClubRole> for RoleResponse {
    fn from(role: ClubRole) -> Self {
        RoleResponse {
            id: role.id,
            club_id: role.club_id,
            name: role.name,
            permissions: role.permissions.unwrap_or_default(),
        }
    }
}

async fn list_roles(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<Vec<RoleResponse>>> {
    let conn = &mut pool.get().await?;
    let club = presided_club(conn, &profile, club_id).await?;

    let roles = club_roles::table
        .filter(club_roles::club_id.eq(club.id))
        .order(club_roles::created_at.asc())
        .load::<ClubRole>(conn)
        .await?;

    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

#[derive(Deserialize)]
struct NewRoleRequest {
    name: String,
    #[serde(default)]
    permissions: Vec<String>,
}

async fn create_role(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
    Json(req): Json<NewRoleRequest>,
) -> AppResult<(StatusCode, Json<RoleResponse>)> {
    #[derive(Insertable)]
    #[diesel(table_name = club_roles)]
    struct NewRole {
        club_id: Uuid,
        name: String,
        permissions: Option<Vec<String>>,
    }

    let conn = &mut pool.get().await?;
    let club = presided_club(conn, &profile, club_id).await?;

    let role = insert_into(club_roles::table)
        .values(NewRole {
            club_id: club.id,
            name: required("name", req.name)?,
            permissions: Some(req.permissions),
        })
        .get_result::<ClubRole>(conn)
        .await?;

    Ok((StatusCode::CREATED, Json(role.into())))
}

async fn delete_role(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(role_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = pool.get().await?;

    conn.transaction::<_, AppError, _>(|conn| {
        async move {
            let role = club_roles::table
                .find(role_id)
                .first::<ClubRole>(conn)
                .await
                .optional()?
                .ok_or_else(|| AppError::not_found("the role"))?;
            presided_club(conn, &profile, role.club_id).await?;

            // holders fall back to plain members
            update(club_memberships::table.filter(club_memberships::role_id.eq(role.id)))
                .set(club_memberships::role_id.eq(None::<Uuid>))
                .execute(conn)
                .await?;
            diesel::delete(club_roles::table.find(role.id))
                .execute(conn)
                .await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewEventRequest {
    title: String,
    description: Option<String>,
    event_date: NaiveDate,
    event_time: NaiveTime,
    location: String,
}

async fn create_event(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
    Json(req): Json<NewEventRequest>,
) -> AppResult<(StatusCode, Json<EventResponse>)> {
    #[derive(Insertable)]
    #[diesel(table_name = events)]
    struct NewEvent {
        club_id: Uuid,
        title: String,
        description: Option<String>,
        event_date: NaiveDate,
        event_time: NaiveTime,
        location: String,
        created_by: Uuid,
    }

    let title = required("title", req.title)?;
    let location = required("location", req.location)?;
    let description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let mut conn = pool.get().await?;

    let event = conn
        .transaction::<_, AppError, _>(|conn| {
            async move {
                let club = presided_club(conn, &profile, club_id).await?;

                let event = insert_into(events::table)
                    .values(NewEvent {
                        club_id: club.id,
                        title,
                        description,
                        event_date: req.event_date,
                        event_time: req.event_time,
                        location,
                        created_by: profile.id,
                    })
                    .get_result::<Event>(conn)
                    .await?;

                let members = club_memberships::table
                    .filter(club_memberships::club_id.eq(club.id))
                    .filter(club_memberships::status.eq(MembershipStatus::Accepted))
                    .select(club_memberships::user_id)
                    .load::<Uuid>(conn)
                    .await?;
                let notes = notify::event_fan_out(&club, &event, &members);
                let sent = notify::deliver(conn, notes).await?;

                tracing::info!(
                    event = %event.id,
                    club = %club.id,
                    notified = sent,
                    "event created"
                );
                Ok(event)
            }
            .scope_boxed()
        })
        .await?;

    Ok((StatusCode::CREATED, Json(EventResponse::new(event, None))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventEditRequest {
    title: Option<String>,
    description: Option<String>,
    event_date: Option<NaiveDate>,
    event_time: Option<NaiveTime>,
    location: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = events)]
struct EventEdit {
    title: Option<String>,
    description: Option<Option<String>>,
    event_date: Option<NaiveDate>,
    event_time: Option<NaiveTime>,
    location: Option<String>,
    updated_at: DateTime<Utc>,
}

async fn find_event(conn: &mut AsyncPgConnection, event_id: Uuid) -> AppResult<Event> {
    events::table
        .find(event_id)
        .first::<Event>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("the event"))
}

async fn edit_event(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<EventEditRequest>,
) -> AppResult<Json<EventResponse>> {
    let edit = EventEdit {
        title: optional("title", req.title)?,
        description: clearable(req.description),
        event_date: req.event_date,
        event_time: req.event_time,
        location: optional("location", req.location)?,
        updated_at: Utc::now(),
    };

    let conn = &mut pool.get().await?;
    let event = find_event(conn, event_id).await?;
    presided_club(conn, &profile, event.club_id).await?;

    let event = update(events::table.find(event.id))
        .set(edit)
        .get_result::<Event>(conn)
        .await?;

    Ok(Json(EventResponse::new(event, None)))
}

async fn delete_event(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(event_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;
    let event = find_event(conn, event_id).await?;
    presided_club(conn, &profile, event.club_id).await?;

    diesel::delete(events::table.find(event.id))
        .execute(conn)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub fn app() -> Router {
    Router::new()
        .route("/clubs", get(clubs))
        .route("/requests/:club_id", get(requests))
        .route("/roles/:club_id", get(list_roles).post(create_role))
        .route("/role/:role_id", delete(delete_role))
        .route("/events/:club_id", post(create_event))
        .route("/event/:event_id", delete(delete_event).put(edit_event))
}
