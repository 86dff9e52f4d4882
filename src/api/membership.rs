use crate::{
    auth::{ExtractAuth, ProfileOnly},
    error::{AppError, AppResult},
    membership::{self, check_role_assignment, Action, Outcome, TransitionError},
    models::{ClubMembership, ClubRole, MembershipStatus},
    schema::*,
    views::{DEFAULT_ROLE, PRESIDENT_ROLE},
    DbPool,
};
use axum::{
    extract::Path,
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::{prelude::*, update};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MembershipResponse {
    id: Uuid,
    club_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    club_name: Option<String>,
    user_id: Uuid,
    role_id: Option<Uuid>,
    status: MembershipStatus,
    requested_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl MembershipResponse {
    fn new(m: ClubMembership, club_name: Option<String>) -> Self {
        MembershipResponse {
            id: m.id,
            club_id: m.club_id,
            club_name,
            user_id: m.user_id,
            role_id: m.role_id,
            status: m.status,
            requested_at: m.requested_at,
            responded_at: m.responded_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransitionResponse {
    membership_id: Uuid,
    club_id: Uuid,
    user_id: Uuid,
    /// `null` once the row is gone
    status: Option<MembershipStatus>,
}

impl TransitionResponse {
    fn new(outcome: Outcome, m: ClubMembership) -> Self {
        TransitionResponse {
            membership_id: m.id,
            club_id: m.club_id,
            user_id: m.user_id,
            status: match outcome {
                Outcome::Accept | Outcome::Reject => Some(m.status),
                Outcome::Delete | Outcome::Discard => None,
            },
        }
    }
}

async fn join(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<MembershipResponse>)> {
    let conn = &mut pool.get().await?;
    let m = membership::join(conn, club_id, profile.id).await?;
    tracing::info!(membership = %m.id, club = %club_id, "membership requested");
    Ok((StatusCode::CREATED, Json(MembershipResponse::new(m, None))))
}

async fn mine(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<Vec<MembershipResponse>>> {
    let conn = &mut pool.get().await?;

    let rows = club_memberships::table
        .inner_join(clubs::table)
        .filter(club_memberships::user_id.eq(profile.id))
        .order(club_memberships::requested_at.desc())
        .select((club_memberships::all_columns, clubs::name))
        .load::<(ClubMembership, String)>(conn)
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(m, name)| MembershipResponse::new(m, Some(name)))
            .collect(),
    ))
}

async fn run(
    pool: DbPool,
    auth: ExtractAuth,
    membership_id: Uuid,
    action: Action,
) -> AppResult<Json<TransitionResponse>> {
    let ExtractAuth(principal) = auth;
    let conn = &mut pool.get().await?;
    let (outcome, m) = membership::transition(conn, &principal, membership_id, action).await?;
    Ok(Json(TransitionResponse::new(outcome, m)))
}

async fn approve(
    auth: ExtractAuth,
    Extension(pool): Extension<DbPool>,
    Path(membership_id): Path<Uuid>,
) -> AppResult<Json<TransitionResponse>> {
    run(pool, auth, membership_id, Action::Approve).await
}

async fn reject(
    auth: ExtractAuth,
    Extension(pool): Extension<DbPool>,
    Path(membership_id): Path<Uuid>,
) -> AppResult<Json<TransitionResponse>> {
    run(pool, auth, membership_id, Action::Reject).await
}

async fn remove(
    auth: ExtractAuth,
    Extension(pool): Extension<DbPool>,
    Path(membership_id): Path<Uuid>,
) -> AppResult<Json<TransitionResponse>> {
    run(pool, auth, membership_id, Action::Remove).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignment {
    role_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignmentResponse {
    membership_id: Uuid,
    role_id: Option<Uuid>,
    role_name: String,
}

async fn assign_role(
    ExtractAuth(principal): ExtractAuth,
    Extension(pool): Extension<DbPool>,
    Path(membership_id): Path<Uuid>,
    Json(req): Json<RoleAssignment>,
) -> AppResult<Json<RoleAssignmentResponse>> {
    let conn = &mut pool.get().await?;
    let (m, club) = membership::load(conn, membership_id).await?;

    if !principal.presides_over(&club) {
        return Err(AppError::forbidden("only the club president can assign roles"));
    }

    let role = match req.role_id {
        Some(role_id) => Some(
            club_roles::table
                .find(role_id)
                .first::<ClubRole>(conn)
                .await
                .optional()?
                .ok_or_else(|| AppError::not_found("the role"))?,
        ),
        None => None,
    };
    check_role_assignment(&m, role.as_ref()).map_err(TransitionError::rejected)?;

    update(club_memberships::table.find(m.id))
        .set(club_memberships::role_id.eq(req.role_id))
        .execute(conn)
        .await?;

    Ok(Json(RoleAssignmentResponse {
        membership_id: m.id,
        role_id: req.role_id,
        role_name: if club.president_id == Some(m.user_id) {
            PRESIDENT_ROLE.to_string()
        } else {
            role.map_or_else(|| DEFAULT_ROLE.to_string(), |r| r.name)
        },
    }))
}

pub fn app() -> Router {
    Router::new()
        .route("/join/:club_id", post(join))
        .route("/mine", get(mine))
        .route("/approve/:membership_id", post(approve))
        .route("/reject/:membership_id", post(reject))
        .route("/remove/:membership_id", delete(remove))
        .route("/role/:membership_id", put(assign_role))
}
