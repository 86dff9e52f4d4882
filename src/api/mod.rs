use crate::error::{AppError, AppResult};
use axum::{http::StatusCode, Router};

pub mod admin;
pub mod club;
pub mod membership;
pub mod notification;
pub mod president;
pub mod session;

pub fn app() -> Router {
    Router::new()
        .nest("/session", session::app())
        .nest("/club", club::app())
        .nest("/membership", membership::app())
        .nest("/president", president::app())
        .nest("/admin", admin::app())
        .nest("/notification", notification::app())
}

/// Trimmed, non-empty form field.
fn required(field: &'static str, value: String) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::from(
            StatusCode::BAD_REQUEST,
            format!("{field} must not be empty"),
        ));
    }
    Ok(value.to_string())
}

fn optional(field: &'static str, value: Option<String>) -> AppResult<Option<String>> {
    value.map(|v| required(field, v)).transpose()
}

/// Edit of a nullable text column: absent leaves it alone, blank clears it.
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| Some(v.trim().to_string()).filter(|v| !v.is_empty()))
}
