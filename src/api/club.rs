use crate::{
    auth::{ExtractAuth, ProfileOnly},
    error::{AppError, AppResult},
    models::{Club, Event, MembershipStatus},
    principal::Principal,
    schema::*,
    views::{self, search_pattern, ClubListing, EventResponse, RosterEntry},
    DbPool,
};
use axum::{
    extract::{Path, Query},
    routing::get,
    Extension, Json, Router,
};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub(super) struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

fn viewer(principal: &Principal) -> Option<Uuid> {
    match principal {
        Principal::Profile(p) => Some(p.id),
        Principal::Admin(_) => None,
    }
}

pub(super) async fn find_club(conn: &mut AsyncPgConnection, club_id: Uuid) -> AppResult<Club> {
    clubs::table
        .find(club_id)
        .first::<Club>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("the club"))
}

async fn list(
    ExtractAuth(principal): ExtractAuth,
    Extension(pool): Extension<DbPool>,
    Query(search): Query<SearchQuery>,
) -> AppResult<Json<Vec<ClubListing>>> {
    let conn = &mut pool.get().await?;

    let mut query = clubs::table.order(clubs::name.asc()).into_boxed();
    if let Some(pattern) = search_pattern(&search.q) {
        query = query.filter(
            clubs::name
                .ilike(pattern.clone())
                .or(clubs::description.ilike(pattern)),
        );
    }
    let clubs = query.load::<Club>(conn).await?;

    Ok(Json(views::list_clubs(conn, clubs, viewer(&principal)).await?))
}

async fn info(
    ExtractAuth(principal): ExtractAuth,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<ClubListing>> {
    let conn = &mut pool.get().await?;
    let club = find_club(conn, club_id).await?;

    Ok(Json(
        views::list_clubs(conn, vec![club], viewer(&principal))
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("`list_clubs` should return one club"))?,
    ))
}

async fn members(
    ExtractAuth(_): ExtractAuth,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<Vec<RosterEntry>>> {
    let conn = &mut pool.get().await?;
    let club = find_club(conn, club_id).await?;
    Ok(Json(views::load_roster(conn, &club).await?))
}

async fn events(
    ExtractAuth(_): ExtractAuth,
    Extension(pool): Extension<DbPool>,
    Path(club_id): Path<Uuid>,
) -> AppResult<Json<Vec<EventResponse>>> {
    let conn = &mut pool.get().await?;
    let club = find_club(conn, club_id).await?;

    let events = events::table
        .filter(events::club_id.eq(club.id))
        .filter(events::event_date.ge(views::today()))
        .order((events::event_date.asc(), events::event_time.asc()))
        .load::<Event>(conn)
        .await?;

    Ok(Json(
        events
            .into_iter()
            .map(|e| EventResponse::new(e, None))
            .collect(),
    ))
}

/// Upcoming events of every club the caller is an accepted member of.
async fn feed(
    ProfileOnly(profile): ProfileOnly,
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<Vec<EventResponse>>> {
    let conn = &mut pool.get().await?;

    let club_ids = club_memberships::table
        .filter(club_memberships::user_id.eq(profile.id))
        .filter(club_memberships::status.eq(MembershipStatus::Accepted))
        .select(club_memberships::club_id)
        .load::<Uuid>(conn)
        .await?;

    if club_ids.is_empty() {
        return Ok(Json(vec![]));
    }

    let events = events::table
        .inner_join(clubs::table)
        .filter(events::club_id.eq_any(club_ids))
        .filter(events::event_date.ge(views::today()))
        .order((events::event_date.asc(), events::event_time.asc()))
        .select((events::all_columns, clubs::name))
        .load::<(Event, String)>(conn)
        .await?;

    Ok(Json(
        events
            .into_iter()
            .map(|(e, club_name)| EventResponse::new(e, Some(club_name)))
            .collect(),
    ))
}

pub fn app() -> Router {
    Router::new()
        .route("/list", get(list))
        .route("/info/:club_id", get(info))
        .route("/members/:club_id", get(members))
        .route("/events/:club_id", get(events))
        .route("/feed", get(feed))
}
