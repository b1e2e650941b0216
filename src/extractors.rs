use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::{get_cookie_value, session};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Extractor that requires authentication.
/// Anonymous requests are rejected with a redirect to the login page that
/// carries the requested path as `next`.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match session_user(parts, state)? {
            Some(user) => Ok(user),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                Err(AppError::LoginRequired { next })
            }
        }
    }
}

/// Optional user extractor; `None` for anonymous visitors.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(parts, state)?))
    }
}

fn session_user(parts: &Parts, state: &AppState) -> AppResult<Option<CurrentUser>> {
    let Some(token) = get_cookie_value(&parts.headers, &state.config.auth.cookie_name) else {
        return Ok(None);
    };
    let conn = state.db.get()?;
    Ok(session::lookup_session(&conn, token)?)
}
