use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;

use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::feed::{self, PostCard};
use crate::follow::{self, EdgeChange};
use crate::pagination::{Page, PageQuery};
use crate::routes::{profile_url, Html, Nav};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub nav: Nav,
    pub page: Page<PostCard>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow/", get(follow_index))
        .route(
            "/profile/{username}/follow/",
            get(profile_follow).post(profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(profile_unfollow).post(profile_unfollow),
        )
}

async fn follow_index(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<FollowTemplate>> {
    let conn = state.db.get()?;
    let page = feed::followed_feed(&conn, user.id, state.config.feed.page_size, query.requested())?;
    Ok(Html(FollowTemplate {
        nav: Nav::for_user(Some(&user)),
        page,
    }))
}

async fn profile_follow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Redirect> {
    change_edge(&state, &user, &username, follow::follow)
}

async fn profile_unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Redirect> {
    change_edge(&state, &user, &username, follow::unfollow)
}

fn change_edge(
    state: &AppState,
    user: &CurrentUser,
    username: &str,
    apply: fn(&rusqlite::Connection, i64, i64) -> rusqlite::Result<EdgeChange>,
) -> AppResult<Redirect> {
    let conn = state.db.get()?;
    let author = users::find_by_username(&conn, username)?.ok_or(AppError::NotFound)?;
    apply(&conn, user.id, author.id)?;
    Ok(Redirect::to(&profile_url(&author.username)))
}
