use crate::schema::{sql_types, *};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};
use serde::{Deserialize, Serialize};
use std::{fmt, io::Write};
use uuid::Uuid;

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = admins)]
pub struct Admin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub school_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = clubs)]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub created_by: Uuid,
    pub president_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(Club))]
#[diesel(table_name = club_memberships)]
pub struct ClubMembership {
    pub id: Uuid,
    pub club_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Option<Uuid>,
    pub status: MembershipStatus,
    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = club_roles)]
pub struct ClubRole {
    pub id: Uuid,
    pub club_id: Uuid,
    pub name: String,
    pub permissions: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = events)]
pub struct Event {
    pub id: Uuid,
    pub club_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub location: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub club_id: Option<Uuid>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow, Serialize, Deserialize)]
#[diesel(sql_type = sql_types::MembershipStatus)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl MembershipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Accepted => "accepted",
            MembershipStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<sql_types::MembershipStatus, Pg> for MembershipStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<sql_types::MembershipStatus, Pg> for MembershipStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"pending" => Ok(MembershipStatus::Pending),
            b"accepted" => Ok(MembershipStatus::Accepted),
            b"rejected" => Ok(MembershipStatus::Rejected),
            _ => Err("unrecognized membership_status variant".into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsExpression, FromSqlRow, Serialize, Deserialize)]
#[diesel(sql_type = sql_types::NotificationType)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Accepted,
    Rejected,
    Event,
    Info,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Accepted => "accepted",
            NotificationType::Rejected => "rejected",
            NotificationType::Event => "event",
            NotificationType::Info => "info",
        }
    }
}

impl ToSql<sql_types::NotificationType, Pg> for NotificationType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<sql_types::NotificationType, Pg> for NotificationType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"accepted" => Ok(NotificationType::Accepted),
            b"rejected" => Ok(NotificationType::Rejected),
            b"event" => Ok(NotificationType::Event),
            b"info" => Ok(NotificationType::Info),
            _ => Err("unrecognized notification_type variant".into()),
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = club_memberships)]
pub struct NewMembership {
    pub club_id: Uuid,
    pub user_id: Uuid,
    pub status: MembershipStatus,
    pub responded_at: Option<DateTime<Utc>>,
}
