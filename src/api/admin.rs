use std::collections::HashSet;

use super::{club::SearchQuery, optional, required};
use crate::{
    auth::AdminOnly,
    error::{AppError, AppResult},
    membership,
    models::{Admin, Club, Profile},
    notify::{self, NewNotification},
    schema::*,
    views::{self, search_pattern, ClubSummary, PendingRequest, UserEntry},
    DbPool,
};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::{insert_into, prelude::*, update};
use diesel_async::{
    scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use serde::Deserialize;
use uuid::Uuid;

/// The club, if `admin` created it.
async fn owned_club(
    conn: &mut AsyncPgConnection,
    admin: &Admin,
    club_id: Uuid,
) -> AppResult<Club> {
    let club = super::club::find_club(conn, club_id).await?;
    if club.created_by != admin.id {
        return Err(AppError::forbidden("this club belongs to another administrator"));
    }
    Ok(club)
}

async fn list_clubs(
    AdminOnly(admin): AdminOnly,
    Extension(pool): Extension<DbPool>,
    Query(search): Query<SearchQuery>,
) -> AppResult<Json<Vec<ClubSummary>>> {
    let conn = &mut pool.get().await?;

    let mut query = clubs::table
        .filter(clubs::created_by.eq(admin.id))
        .order(clubs::created_at.desc())
        .into_boxed();
    if let Some(pattern) = search_pattern(&search.q) {
        query = query.filter(clubs::name.ilike(pattern));
    }
    let clubs = query.load::<Club>(conn).await?;

    Ok(Json(views::summarize(conn, clubs).await?))
}

#[derive(Deserialize)]
struct ClubCreateRequest {
    name: String,
    description: String,
    category: Option<String>,
}

async fn create_club(
    AdminOnly(admin): AdminOnly,
    Extension(pool): Extension<DbPool>,
    Json(req): Json<ClubCreateRequest>,
) -> AppResult<(StatusCode, Json<ClubSummary>)> {
    #[derive(Insertable)]
    #[diesel(table_name = clubs)]
    struct NewClub {
        name: String,
        description: String,
        category: String,
        created_by: Uuid,
    }

    let new_club = NewClub {
        name: required("name", req.name)?,
        description: required("description", req.description)?,
        category: optional("category", req.category)?.unwrap_or_else(|| "General".to_string()),
        created_by: admin.id,
    };

    let conn = &mut pool.get().await?;
    let club = insert_into(clubs::table)
        .values(new_club)
        .get_result::<Club>(conn)
        .await?;

    tracing::info!(club = %club.id, admin = %admin.id, "club created");
    Ok((StatusCode::CREATED, Json(ClubSummary::new(club, None, 0))))
}

#[derive(Deserialize)]
struct ClubEditRequest {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = clubs)]
struct ClubEdit {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    updated_at: DateTime<Utc>,
}

async fn edit_club(
    AdminOnly(admin): AdminOnly,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
    Json(req): Json<ClubEditRequest>,
) -> AppResult<Json<ClubSummary>> {
    let edit = ClubEdit {
        name: optional("name", req.name)?,
        description: optional("description", req.description)?,
        category: optional("category", req.category)?,
        updated_at: Utc::now(),
    };

    let conn = &mut pool.get().await?;
    let club = owned_club(conn, &admin, club_id).await?;

    let club = update(clubs::table.find(club.id))
        .set(edit)
        .get_result::<Club>(conn)
        .await?;

    let mut summary = views::summarize(conn, vec![club]).await?;
    Ok(Json(summary.pop().ok_or_else(|| {
        anyhow::anyhow!("`summarize` should return one club")
    })?))
}

async fn delete_club(
    AdminOnly(admin): AdminOnly,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let conn = &mut pool.get().await?;
    let club = owned_club(conn, &admin, club_id).await?;

    diesel::delete(clubs::table.find(club.id))
        .execute(conn)
        .await?;

    tracing::info!(club = %club.id, name = %club.name, "club deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignPresidentRequest {
    user_id: Uuid,
}

/// Installs a president, makes them an accepted member and tells them,
/// all or nothing.
async fn assign_president(
    AdminOnly(admin): AdminOnly,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
    Json(req): Json<AssignPresidentRequest>,
) -> AppResult<Json<ClubSummary>> {
    let mut conn = pool.get().await?;

    let summary = conn
        .transaction::<_, AppError, _>(|conn| {
            async move {
                let club = owned_club(conn, &admin, club_id).await?;
                let president = profiles::table
                    .find(req.user_id)
                    .first::<Profile>(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("the user"))?;

                let club = update(clubs::table.find(club.id))
                    .set((
                        clubs::president_id.eq(Some(president.id)),
                        clubs::updated_at.eq(Utc::now()),
                    ))
                    .get_result::<Club>(conn)
                    .await?;

                let joined = membership::bootstrap_president(conn, &club, president.id).await?;
                let note = NewNotification::president_assigned(&club, president.id);
                notify::deliver(conn, vec![note]).await?;

                tracing::info!(
                    club = %club.id,
                    president = %president.id,
                    joined,
                    "president assigned"
                );

                let mut summary = views::summarize(conn, vec![club]).await?;
                summary.pop().ok_or_else(|| {
                    let err = anyhow::anyhow!("`summarize` should return one club");
                    AppError::InternalServerError(err)
                })
            }
            .scope_boxed()
        })
        .await?;

    Ok(Json(summary))
}

/// Pending requests of this administrator's clubs that have no president.
async fn requests(
    AdminOnly(admin): AdminOnly,
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<Vec<PendingRequest>>> {
    let conn = &mut pool.get().await?;

    let clubs = clubs::table
        .filter(clubs::created_by.eq(admin.id))
        .filter(clubs::president_id.is_null())
        .load::<Club>(conn)
        .await?;

    Ok(Json(views::load_pending(conn, &clubs).await?))
}

async fn users(
    AdminOnly(admin): AdminOnly,
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<Vec<UserEntry>>> {
    let conn = &mut pool.get().await?;

    let profiles = profiles::table
        .order(profiles::full_name.asc())
        .load::<Profile>(conn)
        .await?;

    let president_ids: HashSet<Uuid> = clubs::table
        .filter(clubs::created_by.eq(admin.id))
        .select(clubs::president_id)
        .load::<Option<Uuid>>(conn)
        .await?
        .into_iter()
        .flatten()
        .collect();

    let admin_user_ids: HashSet<Uuid> = admins::table
        .select(admins::user_id)
        .load::<Uuid>(conn)
        .await?
        .into_iter()
        .collect();

    Ok(Json(views::classify_users(
        profiles,
        &president_ids,
        &admin_user_ids,
    )))
}

pub fn app() -> Router {
    Router::new()
        .route("/clubs", get(list_clubs).post(create_club))
        .route("/club/:club_id", put(edit_club).delete(delete_club))
        .route("/president/:club_id", post(assign_president))
        .route("/requests", get(requests))
        .route("/users", get(users))
}
