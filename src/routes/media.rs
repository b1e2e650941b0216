use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::media::resolve_media_path;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/media/{*path}", get(serve))
}

/// Uploaded files, read from disk on every request
async fn serve(State(state): State<AppState>, Path(path): Path<String>) -> AppResult<Response> {
    let file_path = resolve_media_path(state.config.uploads_path(), &path)?;
    match tokio::fs::metadata(&file_path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(AppError::NotFound),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    }
    let data = tokio::fs::read(&file_path).await?;
    let mime = mime_guess::from_path(&file_path).first_or_octet_stream();

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        data,
    )
        .into_response())
}
