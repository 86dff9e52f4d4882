//! Response shapes shared by the consoles, and the derived values behind
//! them (member counts, club status, role labels).

use crate::{
    models::{Club, ClubMembership, Event, MembershipStatus, Profile},
    schema::*,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::{dsl::count_star, prelude::*};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub const DEFAULT_ROLE: &str = "Member";
pub const PRESIDENT_ROLE: &str = "President";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClubStatus {
    Active,
    NeedsPresident,
}

impl ClubStatus {
    pub fn of(club: &Club) -> ClubStatus {
        match club.president_id {
            Some(_) => ClubStatus::Active,
            None => ClubStatus::NeedsPresident,
        }
    }
}

/// Accepted memberships per club, for the given clubs only.
pub async fn load_member_counts(
    conn: &mut AsyncPgConnection,
    club_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, i64>> {
    Ok(club_memberships::table
        .filter(club_memberships::club_id.eq_any(club_ids.to_vec()))
        .filter(club_memberships::status.eq(MembershipStatus::Accepted))
        .group_by(club_memberships::club_id)
        .select((club_memberships::club_id, count_star()))
        .load::<(Uuid, i64)>(conn)
        .await?
        .into_iter()
        .collect())
}

pub async fn load_profiles(
    conn: &mut AsyncPgConnection,
    ids: impl IntoIterator<Item = Uuid>,
) -> QueryResult<HashMap<Uuid, Profile>> {
    let ids: Vec<Uuid> = ids.into_iter().collect::<HashSet<_>>().into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(profiles::table
        .filter(profiles::id.eq_any(ids))
        .load::<Profile>(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

/// `ILIKE` pattern for a free-text search, or `None` when the query is blank.
pub fn search_pattern(query: &str) -> Option<String> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresidentSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub member_count: i64,
    pub president: Option<PresidentSummary>,
    pub status: ClubStatus,
}

impl ClubSummary {
    pub fn new(club: Club, president: Option<&Profile>, member_count: i64) -> ClubSummary {
        ClubSummary {
            status: ClubStatus::of(&club),
            id: club.id,
            name: club.name,
            description: club.description,
            category: club.category,
            member_count,
            president: president.map(|p| PresidentSummary {
                id: p.id,
                name: p.full_name.clone(),
                email: p.email.clone(),
            }),
        }
    }
}

pub async fn summarize(
    conn: &mut AsyncPgConnection,
    clubs: Vec<Club>,
) -> QueryResult<Vec<ClubSummary>> {
    let ids: Vec<Uuid> = clubs.iter().map(|c| c.id).collect();
    let counts = load_member_counts(conn, &ids).await?;
    let presidents = load_profiles(conn, clubs.iter().filter_map(|c| c.president_id)).await?;

    Ok(clubs
        .into_iter()
        .map(|club| {
            let president = club.president_id.and_then(|id| presidents.get(&id));
            let count = counts.get(&club.id).copied().unwrap_or(0);
            ClubSummary::new(club, president, count)
        })
        .collect())
}

/// The status a caller sees for a club when they hold several rows.
pub fn effective_status(
    statuses: impl IntoIterator<Item = MembershipStatus>,
) -> Option<MembershipStatus> {
    statuses.into_iter().max_by_key(|s| match s {
        MembershipStatus::Rejected => 0,
        MembershipStatus::Pending => 1,
        MembershipStatus::Accepted => 2,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubListing {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub president_id: Option<Uuid>,
    pub president_name: Option<String>,
    pub member_count: i64,
    pub status: ClubStatus,
    pub membership_status: Option<MembershipStatus>,
}

/// Directory rows. `viewer` is the calling profile, if any.
pub async fn list_clubs(
    conn: &mut AsyncPgConnection,
    clubs: Vec<Club>,
    viewer: Option<Uuid>,
) -> QueryResult<Vec<ClubListing>> {
    let ids: Vec<Uuid> = clubs.iter().map(|c| c.id).collect();
    let counts = load_member_counts(conn, &ids).await?;
    let presidents = load_profiles(conn, clubs.iter().filter_map(|c| c.president_id)).await?;

    let mine = match viewer {
        Some(user_id) => club_memberships::table
            .filter(club_memberships::user_id.eq(user_id))
            .filter(club_memberships::club_id.eq_any(ids))
            .load::<ClubMembership>(conn)
            .await?
            .grouped_by(&clubs),
        None => vec![Vec::new(); clubs.len()],
    };

    Ok(clubs
        .into_iter()
        .zip(mine)
        .map(|(club, mine)| ClubListing {
            status: ClubStatus::of(&club),
            president_name: club
                .president_id
                .and_then(|id| presidents.get(&id))
                .map(|p| p.full_name.clone()),
            member_count: counts.get(&club.id).copied().unwrap_or(0),
            membership_status: effective_status(mine.into_iter().map(|m| m.status)),
            id: club.id,
            name: club.name,
            description: club.description,
            category: club.category,
            president_id: club.president_id,
        })
        .collect())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user_id: Uuid,
    pub membership_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub role_id: Option<Uuid>,
    pub role_name: String,
    pub joined_at: Option<DateTime<Utc>>,
}

/// Accepted members with display roles. The president is labelled as such and
/// put first, even when they hold no membership row.
pub fn build_roster(
    rows: Vec<(ClubMembership, Profile, Option<String>)>,
    president: Option<&Profile>,
) -> Vec<RosterEntry> {
    let mut roster: Vec<RosterEntry> = rows
        .into_iter()
        .map(|(m, p, role)| RosterEntry {
            user_id: p.id,
            membership_id: Some(m.id),
            full_name: p.full_name,
            email: p.email,
            role_id: m.role_id,
            role_name: role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            joined_at: Some(m.responded_at.unwrap_or(m.requested_at)),
        })
        .collect();

    if let Some(president) = president {
        match roster.iter().position(|e| e.user_id == president.id) {
            Some(idx) => {
                let mut entry = roster.remove(idx);
                entry.role_name = PRESIDENT_ROLE.to_string();
                roster.insert(0, entry);
            }
            None => roster.insert(
                0,
                RosterEntry {
                    user_id: president.id,
                    membership_id: None,
                    full_name: president.full_name.clone(),
                    email: president.email.clone(),
                    role_id: None,
                    role_name: PRESIDENT_ROLE.to_string(),
                    joined_at: None,
                },
            ),
        }
    }
    roster
}

pub async fn load_roster(
    conn: &mut AsyncPgConnection,
    club: &Club,
) -> QueryResult<Vec<RosterEntry>> {
    let rows = club_memberships::table
        .inner_join(profiles::table)
        .left_join(club_roles::table)
        .filter(club_memberships::club_id.eq(club.id))
        .filter(club_memberships::status.eq(MembershipStatus::Accepted))
        .order(club_memberships::requested_at.asc())
        .select((
            club_memberships::all_columns,
            profiles::all_columns,
            club_roles::name.nullable(),
        ))
        .load::<(ClubMembership, Profile, Option<String>)>(conn)
        .await?;

    let president = match club.president_id {
        Some(id) => profiles::table.find(id).first::<Profile>(conn).await.optional()?,
        None => None,
    };
    Ok(build_roster(rows, president.as_ref()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub club_id: Uuid,
    pub club_name: String,
    pub requested_at: DateTime<Utc>,
}

pub async fn load_pending(
    conn: &mut AsyncPgConnection,
    clubs: &[Club],
) -> QueryResult<Vec<PendingRequest>> {
    let names: HashMap<Uuid, &str> = clubs.iter().map(|c| (c.id, c.name.as_str())).collect();
    let rows = club_memberships::table
        .inner_join(profiles::table)
        .filter(club_memberships::club_id.eq_any(names.keys().copied().collect::<Vec<_>>()))
        .filter(club_memberships::status.eq(MembershipStatus::Pending))
        .order(club_memberships::requested_at.asc())
        .select((club_memberships::all_columns, profiles::all_columns))
        .load::<(ClubMembership, Profile)>(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(m, p)| PendingRequest {
            id: m.id,
            user_id: p.id,
            full_name: p.full_name,
            email: p.email,
            club_id: m.club_id,
            club_name: names.get(&m.club_id).copied().unwrap_or_default().to_string(),
            requested_at: m.requested_at,
        })
        .collect())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: Uuid,
    pub club_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub location: String,
}

impl EventResponse {
    pub fn new(event: Event, club_name: Option<String>) -> EventResponse {
        EventResponse {
            id: event.id,
            club_id: event.club_id,
            club_name,
            title: event.title,
            description: event.description,
            event_date: event.event_date,
            event_time: event.event_time,
            location: event.location,
        }
    }
}

/// Events dated before this are no longer listed.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_president: bool,
    pub is_admin: bool,
    pub classification: &'static str,
}

pub fn classify_users(
    profiles: Vec<Profile>,
    president_ids: &HashSet<Uuid>,
    admin_user_ids: &HashSet<Uuid>,
) -> Vec<UserEntry> {
    profiles
        .into_iter()
        .map(|p| {
            let is_president = president_ids.contains(&p.id);
            let is_admin = admin_user_ids.contains(&p.id);
            UserEntry {
                classification: if is_president {
                    PRESIDENT_ROLE
                } else if is_admin {
                    "Admin"
                } else {
                    "Student"
                },
                id: p.id,
                name: p.full_name,
                email: p.email,
                is_president,
                is_admin,
            }
        })
        .collect()
}
