use crate::{
    models::{Club, Event, NotificationType},
    schema::notifications,
};
use diesel::{insert_into, prelude::*};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub club_id: Option<Uuid>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
}

impl NewNotification {
    fn about(
        club: &Club,
        user_id: Uuid,
        kind: NotificationType,
        title: &str,
        message: String,
    ) -> Self {
        NewNotification {
            user_id,
            club_id: Some(club.id),
            kind,
            title: title.to_string(),
            message,
        }
    }

    pub fn accepted(club: &Club, user_id: Uuid) -> Self {
        Self::about(
            club,
            user_id,
            NotificationType::Accepted,
            "Request Approved",
            format!("You are now a member of {}.", club.name),
        )
    }

    pub fn rejected(club: &Club, user_id: Uuid) -> Self {
        Self::about(
            club,
            user_id,
            NotificationType::Rejected,
            "Request Declined",
            format!("Your request to join {} was declined.", club.name),
        )
    }

    pub fn removed(club: &Club, user_id: Uuid) -> Self {
        Self::about(
            club,
            user_id,
            NotificationType::Info,
            "Removed From Club",
            format!("You are no longer a member of {}.", club.name),
        )
    }

    pub fn president_assigned(club: &Club, user_id: Uuid) -> Self {
        Self::about(
            club,
            user_id,
            NotificationType::Info,
            "You Are President",
            format!("You have been made president of {}.", club.name),
        )
    }

    pub fn event_scheduled(club: &Club, event: &Event, user_id: Uuid) -> Self {
        Self::about(
            club,
            user_id,
            NotificationType::Event,
            "New Event",
            format!(
                "{} scheduled {} on {} at {} ({}).",
                club.name,
                event.title,
                event.event_date.format("%b %-d, %Y"),
                event.event_time.format("%H:%M"),
                event.location
            ),
        )
    }
}

/// One `event` notification per member, skipping whoever created the event.
pub fn event_fan_out(club: &Club, event: &Event, members: &[Uuid]) -> Vec<NewNotification> {
    members
        .iter()
        .filter(|&&id| id != event.created_by)
        .map(|&id| NewNotification::event_scheduled(club, event, id))
        .collect()
}

pub async fn deliver(
    conn: &mut AsyncPgConnection,
    notes: Vec<NewNotification>,
) -> QueryResult<usize> {
    if notes.is_empty() {
        return Ok(0);
    }
    insert_into(notifications::table)
        .values(notes)
        .execute(conn)
        .await
}
