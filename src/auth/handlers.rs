use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{clear_session_cookie, get_cookie_value, safe_next, session, session_cookie, LOGIN_PATH};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::forms::{FormErrors, SignupInput};
use crate::routes::{Html, Nav};
use crate::state::AppState;

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

// -- Templates --

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate {
    pub nav: Nav,
    pub form: SignupInput,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub username: String,
    pub next: String,
    /// Empty unless the last attempt failed
    pub error: String,
}

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

// -- Handlers --

pub async fn signup_page(MaybeUser(user): MaybeUser) -> Html<SignupTemplate> {
    Html(SignupTemplate {
        nav: Nav::for_user(user.as_ref()),
        form: SignupInput::default(),
        errors: FormErrors::default(),
    })
}

pub async fn signup_submit(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Form(mut form): Form<SignupInput>,
) -> AppResult<Response> {
    let taken = {
        let conn = state.db.get()?;
        users::username_taken(&conn, form.username.trim())?
    };

    let mut new_user = match form.validate(taken) {
        Ok(new_user) => new_user,
        Err(errors) => {
            form.password1.clear();
            form.password2.clear();
            return Ok(Html(SignupTemplate {
                nav: Nav::for_user(user.as_ref()),
                form,
                errors,
            })
            .into_response());
        }
    };

    let password = std::mem::take(&mut form.password1);
    new_user.password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;

    let user_id = {
        let conn = state.db.get()?;
        users::create_user(&conn, &new_user)?
    };
    tracing::info!("Registered user {} (id {})", new_user.username, user_id);

    Ok(Redirect::to(LOGIN_PATH).into_response())
}

pub async fn login_page(
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> Html<LoginTemplate> {
    Html(LoginTemplate {
        nav: Nav::for_user(user.as_ref()),
        username: String::new(),
        next: query.next.unwrap_or_default(),
        error: String::new(),
    })
}

pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let username = form.username.trim().to_string();
    let user = {
        let conn = state.db.get()?;
        users::find_by_username(&conn, &username)?
    };

    let verified = match user {
        Some(user) => {
            let password = form.password.clone();
            let hash = user.password_hash.clone();
            let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                .await
                .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?;
            ok.then_some(user)
        }
        None => None,
    };

    let Some(user) = verified else {
        tracing::info!("Failed login for {:?}", username);
        return Ok(Html(LoginTemplate {
            nav: Nav::anonymous(),
            username,
            next: form.next,
            error: BAD_CREDENTIALS.to_string(),
        })
        .into_response());
    };

    let token = {
        let conn = state.db.get()?;
        session::create_session(&conn, user.id, state.config.auth.session_hours)?
    };
    tracing::info!("User {} logged in", user.username);

    let target = safe_next(Some(form.next.as_str()).filter(|n| !n.is_empty()));
    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, target.to_string()),
            (
                header::SET_COOKIE,
                session_cookie(
                    &state.config.auth.cookie_name,
                    &token,
                    state.config.auth.session_hours,
                ),
            ),
        ],
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = get_cookie_value(&headers, &state.config.auth.cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (
                header::SET_COOKIE,
                clear_session_cookie(&state.config.auth.cookie_name),
            ),
        ],
    )
        .into_response())
}
