use axum::http::{StatusCode, Uri};
use axum::response::Response;

use crate::error::NotFoundTemplate;
use crate::extractors::MaybeUser;
use crate::routes::{render_page, Nav};

/// Fallback for every path no route claims
pub async fn not_found(MaybeUser(user): MaybeUser, uri: Uri) -> Response {
    tracing::debug!("No route for {}", uri.path());
    render_page(
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            nav: Nav::for_user(user.as_ref()),
            path: uri.path().to_string(),
        },
    )
}
