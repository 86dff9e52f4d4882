//! Membership state transitions.
//!
//! Every approve/reject/remove goes through [`authorize`] regardless of who
//! asks, and [`transition`] applies the outcome together with the member's
//! notification in one transaction.

use crate::{
    error::{AppError, AppResult},
    models::{Club, ClubMembership, ClubRole, MembershipStatus, NewMembership},
    notify::{self, NewNotification},
    principal::Principal,
    schema::*,
};
use axum::http::StatusCode;
use chrono::Utc;
use diesel::{delete, dsl::exists, insert_into, prelude::*, select, update};
use diesel_async::{
    scoped_futures::ScopedFutureExt, AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject,
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Remove => "remove",
        })
    }
}

/// What a permitted action does to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Reject,
    Delete,
    /// pending row of someone who is already an accepted member
    Discard,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("you may not {0} memberships of this club")]
    Forbidden(Action),
    #[error("cannot {action} a membership that is {status}")]
    InvalidState {
        action: Action,
        status: MembershipStatus,
    },
    #[error("the club president cannot be removed from the club")]
    PresidentRemoval,
    #[error("you already have a {0} membership for this club")]
    Duplicate(MembershipStatus),
    #[error("only accepted members can be given a role")]
    RoleForNonMember,
    #[error("the role belongs to a different club")]
    ForeignRole,
}

impl TransitionError {
    pub fn status(&self) -> StatusCode {
        match self {
            TransitionError::Forbidden(_) => StatusCode::FORBIDDEN,
            TransitionError::ForeignRole => StatusCode::BAD_REQUEST,
            _ => StatusCode::CONFLICT,
        }
    }

    /// Keeps the 4xx status; a bare `?` would turn this into a 500.
    pub fn rejected(self) -> AppError {
        AppError::from(self.status(), self.to_string())
    }
}

/// Approve and reject are open to the club president, and to the creating
/// admin while the club has no president. Remove is president-only.
pub fn authorize(
    principal: &Principal,
    club: &Club,
    membership: &ClubMembership,
    action: Action,
    already_member: bool,
) -> Result<Outcome, TransitionError> {
    let president = principal.presides_over(club);
    let steward = principal.created(club) && club.president_id.is_none();

    match action {
        Action::Approve | Action::Reject => {
            if !(president || steward) {
                return Err(TransitionError::Forbidden(action));
            }
            if membership.status != MembershipStatus::Pending {
                return Err(TransitionError::InvalidState {
                    action,
                    status: membership.status,
                });
            }
            Ok(match action {
                Action::Approve if already_member => Outcome::Discard,
                Action::Approve => Outcome::Accept,
                _ => Outcome::Reject,
            })
        }
        Action::Remove => {
            if !president {
                return Err(TransitionError::Forbidden(action));
            }
            if club.president_id == Some(membership.user_id) {
                return Err(TransitionError::PresidentRemoval);
            }
            if membership.status != MembershipStatus::Accepted {
                return Err(TransitionError::InvalidState {
                    action,
                    status: membership.status,
                });
            }
            Ok(Outcome::Delete)
        }
    }
}

/// A new request is refused while a pending or accepted row exists.
pub fn check_join(existing: &[MembershipStatus]) -> Result<(), TransitionError> {
    for status in [MembershipStatus::Accepted, MembershipStatus::Pending] {
        if existing.contains(&status) {
            return Err(TransitionError::Duplicate(status));
        }
    }
    Ok(())
}

pub fn check_role_assignment(
    membership: &ClubMembership,
    role: Option<&ClubRole>,
) -> Result<(), TransitionError> {
    if membership.status != MembershipStatus::Accepted {
        return Err(TransitionError::RoleForNonMember);
    }
    match role {
        Some(role) if role.club_id != membership.club_id => Err(TransitionError::ForeignRole),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    AlreadyMember,
    Promote(Uuid),
    Insert,
}

/// How a newly assigned president becomes a member. `rows` are the user's
/// memberships in the club, newest first.
pub fn bootstrap_plan(rows: &[ClubMembership]) -> Bootstrap {
    if rows.iter().any(|m| m.status == MembershipStatus::Accepted) {
        Bootstrap::AlreadyMember
    } else if let Some(newest) = rows.first() {
        Bootstrap::Promote(newest.id)
    } else {
        Bootstrap::Insert
    }
}

pub async fn load(
    conn: &mut AsyncPgConnection,
    membership_id: Uuid,
) -> AppResult<(ClubMembership, Club)> {
    let membership = club_memberships::table
        .find(membership_id)
        .first::<ClubMembership>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("the membership"))?;
    let club = clubs::table
        .find(membership.club_id)
        .first::<Club>(conn)
        .await?;
    Ok((membership, club))
}

pub async fn transition(
    conn: &mut AsyncPgConnection,
    principal: &Principal,
    membership_id: Uuid,
    action: Action,
) -> AppResult<(Outcome, ClubMembership)> {
    conn.transaction::<_, AppError, _>(|conn| {
        async move {
            let (membership, club) = load(conn, membership_id).await?;

            let already_member = action == Action::Approve
                && select(exists(
                    club_memberships::table
                        .filter(club_memberships::club_id.eq(membership.club_id))
                        .filter(club_memberships::user_id.eq(membership.user_id))
                        .filter(club_memberships::status.eq(MembershipStatus::Accepted))
                        .filter(club_memberships::id.ne(membership.id)),
                ))
                .get_result::<bool>(conn)
                .await?;

            let outcome = authorize(principal, &club, &membership, action, already_member)
                .map_err(TransitionError::rejected)?;
            let target = club_memberships::table.find(membership.id);

            let (membership, note) = match outcome {
                Outcome::Accept | Outcome::Reject => {
                    let user_id = membership.user_id;
                    let (status, note) = if outcome == Outcome::Accept {
                        (MembershipStatus::Accepted, NewNotification::accepted(&club, user_id))
                    } else {
                        (MembershipStatus::Rejected, NewNotification::rejected(&club, user_id))
                    };
                    let updated = update(target)
                        .set((
                            club_memberships::status.eq(status),
                            club_memberships::responded_at.eq(Some(Utc::now())),
                        ))
                        .get_result::<ClubMembership>(conn)
                        .await?;
                    (updated, Some(note))
                }
                Outcome::Delete => {
                    delete(target).execute(conn).await?;
                    let note = NewNotification::removed(&club, membership.user_id);
                    (membership, Some(note))
                }
                Outcome::Discard => {
                    delete(target).execute(conn).await?;
                    (membership, None)
                }
            };

            notify::deliver(conn, note.into_iter().collect()).await?;
            tracing::info!(
                membership = %membership.id,
                club = %club.id,
                %action,
                ?outcome,
                "membership transition"
            );
            Ok((outcome, membership))
        }
        .scope_boxed()
    })
    .await
}

pub async fn join(
    conn: &mut AsyncPgConnection,
    club_id: Uuid,
    user_id: Uuid,
) -> AppResult<ClubMembership> {
    conn.transaction::<_, AppError, _>(|conn| {
        async move {
            // concurrent joins for the same club queue up behind this lock
            clubs::table
                .find(club_id)
                .select(clubs::id)
                .for_update()
                .first::<Uuid>(conn)
                .await
                .optional()?
                .ok_or_else(|| AppError::not_found("the club"))?;

            let existing = club_memberships::table
                .filter(club_memberships::club_id.eq(club_id))
                .filter(club_memberships::user_id.eq(user_id))
                .select(club_memberships::status)
                .load::<MembershipStatus>(conn)
                .await?;
            check_join(&existing).map_err(TransitionError::rejected)?;

            Ok(insert_into(club_memberships::table)
                .values(NewMembership {
                    club_id,
                    user_id,
                    status: MembershipStatus::Pending,
                    responded_at: None,
                })
                .get_result::<ClubMembership>(conn)
                .await?)
        }
        .scope_boxed()
    })
    .await
}

/// Makes sure `user_id` holds an accepted membership of `club`.
/// Returns true when the member count grew.
pub async fn bootstrap_president(
    conn: &mut AsyncPgConnection,
    club: &Club,
    user_id: Uuid,
) -> AppResult<bool> {
    let rows = club_memberships::table
        .filter(club_memberships::club_id.eq(club.id))
        .filter(club_memberships::user_id.eq(user_id))
        .order(club_memberships::requested_at.desc())
        .load::<ClubMembership>(conn)
        .await?;

    match bootstrap_plan(&rows) {
        Bootstrap::AlreadyMember => Ok(false),
        Bootstrap::Promote(id) => {
            update(club_memberships::table.find(id))
                .set((
                    club_memberships::status.eq(MembershipStatus::Accepted),
                    club_memberships::responded_at.eq(Some(Utc::now())),
                ))
                .execute(conn)
                .await?;
            Ok(true)
        }
        Bootstrap::Insert => {
            insert_into(club_memberships::table)
                .values(NewMembership {
                    club_id: club.id,
                    user_id,
                    status: MembershipStatus::Accepted,
                    responded_at: Some(Utc::now()),
                })
                .execute(conn)
                .await?;
            Ok(true)
        }
    }
}
