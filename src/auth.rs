use crate::{
    error::{AppError, AppResult},
    models::{Admin, Profile},
    principal::Principal,
    DbPool,
};
use axum::{
    async_trait,
    extract::{FromRequest, RequestParts},
    headers::{authorization::Bearer, Authorization},
    http::StatusCode,
    Extension, TypedHeader,
};
use jsonwebtoken::{errors::Result as JwtResult, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Verification keys for session tokens issued by the auth provider.
pub struct Keys {
    decoding: DecodingKey,
    validation: Validation,
}

impl Keys {
    pub fn new(secret: &str, audience: &str) -> anyhow::Result<Keys> {
        anyhow::ensure!(!secret.trim().is_empty(), "JWT_SECRET must not be empty");
        anyhow::ensure!(!audience.trim().is_empty(), "JWT_AUDIENCE must not be empty");

        let mut validation = Validation::default();
        validation.set_audience(&[audience]);
        Ok(Keys {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

pub type SharedKeys = Arc<Keys>;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: u64,
}

pub fn validate_jwt(keys: &Keys, token: &str) -> JwtResult<TokenData<Claims>> {
    jsonwebtoken::decode::<Claims>(token, &keys.decoding, &keys.validation)
}

/// The authenticated caller, before any admin/profile lookup.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[async_trait]
impl<B: Send> FromRequest<B> for Session {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request(req)
                .await
                .map_err(|_| AppError::from(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

        let Extension(keys) = Extension::<SharedKeys>::from_request(req)
            .await
            .map_err(|_| anyhow::anyhow!("auth keys are not configured"))?;

        let claims = validate_jwt(&keys, bearer.token())
            .map_err(|_| AppError::from(StatusCode::UNAUTHORIZED, "invalid or expired session"))?
            .claims;

        Ok(Session {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

async fn resolve_principal<B: Send>(req: &mut RequestParts<B>) -> AppResult<Principal> {
    let session = Session::from_request(req).await?;
    let Extension(pool) = Extension::<DbPool>::from_request(req)
        .await
        .map_err(|_| anyhow::anyhow!("database pool is not configured"))?;

    let conn = &mut pool.get().await?;
    Principal::resolve(conn, session.user_id)
        .await?
        .ok_or_else(|| AppError::forbidden("no admin or student profile exists for this account"))
}

/// Any caller with an admin or profile record.
pub struct ExtractAuth(pub Principal);

#[async_trait]
impl<B: Send> FromRequest<B> for ExtractAuth {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        resolve_principal(req).await.map(ExtractAuth)
    }
}

pub struct AdminOnly(pub Admin);

#[async_trait]
impl<B: Send> FromRequest<B> for AdminOnly {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match resolve_principal(req).await? {
            Principal::Admin(admin) => Ok(AdminOnly(admin)),
            Principal::Profile(_) => Err(AppError::forbidden("administrator access required")),
        }
    }
}

pub struct ProfileOnly(pub Profile);

#[async_trait]
impl<B: Send> FromRequest<B> for ProfileOnly {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        match resolve_principal(req).await? {
            Principal::Profile(profile) => Ok(ProfileOnly(profile)),
            Principal::Admin(_) => Err(AppError::forbidden("a student profile is required")),
        }
    }
}
