use super::required;
use crate::{
    auth::Session,
    error::{AppError, AppResult},
    models::{Admin, Profile},
    principal::Principal,
    schema::*,
    DbPool,
};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use diesel::{insert_into, prelude::*};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Identity {
    #[serde(rename_all = "camelCase")]
    Admin {
        id: Uuid,
        full_name: String,
        school_name: String,
        email: String,
    },
    #[serde(rename_all = "camelCase")]
    Profile {
        id: Uuid,
        full_name: String,
        email: String,
    },
}

impl From<Principal> for Identity {
    fn from(principal: Principal) -> Self {
        match principal {
            Principal::Admin(a) => Identity::Admin {
                id: a.id,
                full_name: a.full_name,
                school_name: a.school_name,
                email: a.email,
            },
            Principal::Profile(p) => Identity::Profile {
                id: p.id,
                full_name: p.full_name,
                email: p.email,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user_id: Uuid,
    email: Option<String>,
    identity: Option<Identity>,
}

async fn current(
    session: Session,
    Extension(pool): Extension<DbPool>,
) -> AppResult<Json<SessionResponse>> {
    let conn = &mut pool.get().await?;
    let principal = Principal::resolve(conn, session.user_id).await?;

    Ok(Json(SessionResponse {
        user_id: session.user_id,
        email: session.email,
        identity: principal.map(Identity::from),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminRegisterRequest {
    full_name: String,
    school_name: String,
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRegisterRequest {
    full_name: String,
    email: Option<String>,
}

fn email_for(session: &Session, given: Option<String>) -> AppResult<String> {
    given
        .or_else(|| session.email.clone())
        .map(|e| required("email", e))
        .transpose()?
        .ok_or_else(|| AppError::from(StatusCode::BAD_REQUEST, "an email address is required"))
}

async fn register_admin(
    session: Session,
    Extension(pool): Extension<DbPool>,
    Json(req): Json<AdminRegisterRequest>,
) -> AppResult<(StatusCode, Json<Identity>)> {
    #[derive(Insertable)]
    #[diesel(table_name = admins)]
    struct NewAdmin {
        user_id: Uuid,
        full_name: String,
        school_name: String,
        email: String,
    }

    let new_admin = NewAdmin {
        user_id: session.user_id,
        email: email_for(&session, req.email)?,
        full_name: required("fullName", req.full_name)?,
        school_name: required("schoolName", req.school_name)?,
    };

    let conn = &mut pool.get().await?;
    let admin = insert_into(admins::table)
        .values(new_admin)
        .on_conflict(admins::user_id)
        .do_nothing()
        .get_result::<Admin>(conn)
        .await
        .optional()?;

    let Some(admin) = admin else {
        return Err(AppError::from(
            StatusCode::CONFLICT,
            "this account is already registered as an administrator",
        ));
    };

    tracing::info!(admin = %admin.id, school = %admin.school_name, "administrator registered");
    Ok((StatusCode::CREATED, Json(Principal::Admin(admin).into())))
}

async fn register_profile(
    session: Session,
    Extension(pool): Extension<DbPool>,
    Json(req): Json<ProfileRegisterRequest>,
) -> AppResult<(StatusCode, Json<Identity>)> {
    #[derive(Insertable)]
    #[diesel(table_name = profiles)]
    struct NewProfile {
        id: Uuid,
        full_name: String,
        email: String,
    }

    let new_profile = NewProfile {
        id: session.user_id,
        email: email_for(&session, req.email)?,
        full_name: required("fullName", req.full_name)?,
    };

    let conn = &mut pool.get().await?;
    if Principal::resolve(conn, session.user_id).await?.is_some() {
        return Err(AppError::from(
            StatusCode::CONFLICT,
            "this account already has an identity",
        ));
    }

    let profile = insert_into(profiles::table)
        .values(new_profile)
        .on_conflict(profiles::id)
        .do_nothing()
        .get_result::<Profile>(conn)
        .await
        .optional()?
        .ok_or_else(|| {
            AppError::from(StatusCode::CONFLICT, "this account already has an identity")
        })?;

    Ok((StatusCode::CREATED, Json(Principal::Profile(profile).into())))
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(current))
        .route("/admin", post(register_admin))
        .route("/profile", post(register_profile))
}
