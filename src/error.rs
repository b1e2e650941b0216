use askama::Template;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::login_url;
use crate::routes::{render_page, Nav};

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub nav: Nav,
    pub path: String,
}

#[derive(Template)]
#[template(path = "core/403.html")]
pub struct PermissionDeniedTemplate {
    pub nav: Nav,
}

#[derive(Template)]
#[template(path = "core/500.html")]
pub struct ServerErrorTemplate {
    pub nav: Nav,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    /// Anonymous visitor hit a gated route; `next` is where to return after login.
    #[error("Login required")]
    LoginRequired { next: String },

    /// Signed-in user tried to change a post they did not write.
    #[error("Not the author of post {post_id}")]
    NotAuthor { post_id: i64 },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Upload error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => render_page(
                StatusCode::NOT_FOUND,
                NotFoundTemplate {
                    nav: Nav::anonymous(),
                    path: String::new(),
                },
            ),
            AppError::LoginRequired { next } => Redirect::to(&login_url(&next)).into_response(),
            AppError::NotAuthor { post_id } => {
                tracing::debug!("Rejected edit of post {} by non-author", post_id);
                Redirect::to(&format!("/posts/{}/", post_id)).into_response()
            }
            AppError::PermissionDenied(reason) => {
                tracing::warn!("Permission denied: {}", reason);
                render_page(
                    StatusCode::FORBIDDEN,
                    PermissionDeniedTemplate {
                        nav: Nav::anonymous(),
                    },
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Multipart(e) => {
                tracing::warn!("Upload error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid upload").into_response()
            }
            other => {
                tracing::error!("{}", other);
                render_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ServerErrorTemplate {
                        nav: Nav::anonymous(),
                    },
                )
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn response_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    fn location(err: AppError) -> String {
        let response = err.into_response();
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn login_required_redirects_with_return_path() {
        let err = AppError::LoginRequired {
            next: "/create/".into(),
        };
        assert_eq!(location(err), "/auth/login/?next=/create/");
    }

    #[test]
    fn not_author_redirects_to_post_detail() {
        let err = AppError::NotAuthor { post_id: 7 };
        assert!(response_status(AppError::NotAuthor { post_id: 7 }).is_redirection());
        assert_eq!(location(err), "/posts/7/");
    }

    #[test]
    fn permission_denied_returns_403() {
        assert_eq!(
            response_status(AppError::PermissionDenied("nope".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            response_status(AppError::BadRequest("oops".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
