pub mod assets;
pub mod auth;
pub mod errors;
pub mod follow;
pub mod media;
pub mod posts;

use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::extractors::CurrentUser;
use crate::state::AppState;

/// Who the page header is rendered for
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub is_authenticated: bool,
    pub username: String,
}

impl Nav {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: Option<&CurrentUser>) -> Self {
        match user {
            Some(user) => Self {
                is_authenticated: true,
                username: user.username.clone(),
            },
            None => Self::anonymous(),
        }
    }
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        render_page(StatusCode::OK, self.0)
    }
}

/// Render `template` with the given status, falling back to a bare 500 on template errors
pub fn render_page<T: Template>(status: StatusCode, template: T) -> Response {
    match template.render() {
        Ok(body) => html_response(status, body),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

pub fn html_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Profile URL safe to put in a `Location` header
pub fn profile_url(username: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}/", encoded)
}

/// The full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(posts::router())
        .merge(follow::router())
        .merge(auth::router())
        .merge(media::router())
        .merge(assets::router())
        .fallback(errors::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
