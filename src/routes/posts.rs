use askama::Template;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use rusqlite::Connection;

use crate::auth::ensure_author;
use crate::cache::PageCache;
use crate::db::comments::{self, CommentRow};
use crate::db::models::{Group, Post, User};
use crate::db::{groups, posts};
use crate::display::{parse_and_format_time, truncate_chars};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::feed::{self, PostCard};
use crate::forms::{CommentInput, FormErrors, PostInput};
use crate::media;
use crate::pagination::{Page, PageQuery};
use crate::routes::{html_response, profile_url, Html, Nav};
use crate::state::AppState;

/// Largest create/edit submission accepted, image included
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const DETAIL_TITLE_CHARS: usize = 30;

// --- View structs ---

pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub created: String,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        Self {
            created: parse_and_format_time(&row.created),
            author_username: row.author_username,
            text: row.text,
        }
    }
}

// --- Templates ---

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub nav: Nav,
    pub page: Page<PostCard>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupListTemplate {
    pub nav: Nav,
    pub group: Group,
    pub page: Page<PostCard>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub author: User,
    pub author_name: String,
    pub post_count: usize,
    pub follower_count: i64,
    pub following_count: i64,
    pub following: bool,
    pub can_follow: bool,
    pub page: Page<PostCard>,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub nav: Nav,
    pub title: String,
    pub post: PostCard,
    pub author_post_count: i64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    /// Rejected comment text, put back in the form
    pub comment_text: String,
    pub comment_errors: FormErrors,
}

impl PostDetailTemplate {
    fn load(conn: &Connection, post_id: i64, user: Option<&CurrentUser>) -> AppResult<Self> {
        let detail = feed::post_detail(conn, post_id)?;
        Ok(Self {
            nav: Nav::for_user(user),
            title: truncate_chars(&detail.post.text, DETAIL_TITLE_CHARS),
            can_edit: user.is_some_and(|u| u.id == detail.author_id),
            post: detail.post,
            author_post_count: detail.author_post_count,
            comments: detail.comments.into_iter().map(CommentView::from).collect(),
            comment_text: String::new(),
            comment_errors: FormErrors::default(),
        })
    }
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub nav: Nav,
    pub is_edit: bool,
    pub post_id: i64,
    pub text: String,
    /// Group id to preselect, 0 for none
    pub selected_group: i64,
    pub groups: Vec<Group>,
    pub errors: FormErrors,
    pub has_image: bool,
    pub image_url: String,
}

impl PostFormTemplate {
    fn blank(user: &CurrentUser, groups: Vec<Group>) -> Self {
        Self {
            nav: Nav::for_user(Some(user)),
            is_edit: false,
            post_id: 0,
            text: String::new(),
            selected_group: 0,
            groups,
            errors: FormErrors::default(),
            has_image: false,
            image_url: String::new(),
        }
    }

    fn for_post(user: &CurrentUser, post: &Post, groups: Vec<Group>) -> Self {
        Self {
            is_edit: true,
            post_id: post.id,
            text: post.text.clone(),
            selected_group: post.group_id.unwrap_or(0),
            has_image: post.image.is_some(),
            image_url: post
                .image
                .as_deref()
                .map(|path| format!("/media/{}", path))
                .unwrap_or_default(),
            ..Self::blank(user, groups)
        }
    }

    /// Redisplay a rejected submission
    fn with_input(mut self, input: &PostInput, errors: FormErrors) -> Self {
        self.text = input.text.clone();
        self.selected_group = input.selected_group();
        self.errors = errors;
        self
    }
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{post_id}/", get(post_detail))
        .route("/posts/{post_id}/comment/", post(add_comment))
        .route("/create/", get(post_create_form).post(post_create))
        .route("/posts/{post_id}/edit/", get(post_edit_form).post(post_edit))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Numeric ids only; anything else names no post
fn parse_post_id(raw: &str) -> AppResult<i64> {
    raw.parse().map_err(|_| AppError::NotFound)
}

// --- Listings ---

async fn index(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let key = PageCache::key(
        &uri.to_string(),
        user.as_ref().map(|u| u.username.as_str()),
    );
    let cached = state.page_cache.lock().await.get(&key);
    if let Some(body) = cached {
        return Ok(html_response(StatusCode::OK, body));
    }

    let page = {
        let conn = state.db.get()?;
        feed::global_feed(&conn, state.config.feed.page_size, query.requested())?
    };
    let body = IndexTemplate {
        nav: Nav::for_user(user.as_ref()),
        page,
    }
    .render()?;

    state.page_cache.lock().await.insert(key, body.clone());
    Ok(html_response(StatusCode::OK, body))
}

async fn group_posts(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<GroupListTemplate>> {
    let conn = state.db.get()?;
    let feed = feed::group_feed(&conn, &slug, state.config.feed.page_size, query.requested())?;

    Ok(Html(GroupListTemplate {
        nav: Nav::for_user(user.as_ref()),
        group: feed.group,
        page: feed.page,
    }))
}

async fn profile(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<ProfileTemplate>> {
    let conn = state.db.get()?;
    let viewer_id = user.as_ref().map(|u| u.id);
    let feed = feed::author_feed(
        &conn,
        &username,
        viewer_id,
        state.config.feed.page_size,
        query.requested(),
    )?;
    let follower_count = crate::follow::follower_count(&conn, feed.author.id)?;
    let following_count = crate::follow::following_count(&conn, feed.author.id)?;
    let can_follow = viewer_id.is_some_and(|id| id != feed.author.id);
    let author_name = match feed.author.full_name() {
        name if name.is_empty() => feed.author.username.clone(),
        name => name,
    };

    Ok(Html(ProfileTemplate {
        nav: Nav::for_user(user.as_ref()),
        author: feed.author,
        author_name,
        post_count: feed.post_count,
        follower_count,
        following_count,
        following: feed.following,
        can_follow,
        page: feed.page,
    }))
}

async fn post_detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(post_id): Path<String>,
) -> AppResult<Html<PostDetailTemplate>> {
    let post_id = parse_post_id(&post_id)?;
    let conn = state.db.get()?;
    Ok(Html(PostDetailTemplate::load(&conn, post_id, user.as_ref())?))
}

// --- Mutations ---

async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    Form(input): Form<CommentInput>,
) -> AppResult<Response> {
    let post_id = parse_post_id(&post_id)?;
    let conn = state.db.get()?;
    let post = posts::find_by_id(&conn, post_id)?.ok_or(AppError::NotFound)?;

    match input.validate() {
        Ok(text) => {
            let comment_id = comments::add_comment(&conn, post.id, user.id, &text)?;
            tracing::info!(
                "User {} commented on post {} (comment {})",
                user.username,
                post.id,
                comment_id
            );
        }
        Err(errors) => {
            tracing::debug!("Rejected comment on post {}: {:?}", post.id, errors);
            let mut page = PostDetailTemplate::load(&conn, post.id, Some(&user))?;
            page.comment_text = input.text;
            page.comment_errors = errors;
            return Ok(Html(page).into_response());
        }
    }

    Ok(Redirect::to(&format!("/posts/{}/", post.id)).into_response())
}

async fn post_create_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<PostFormTemplate>> {
    let conn = state.db.get()?;
    let groups = groups::list_groups(&conn)?;
    Ok(Html(PostFormTemplate::blank(&user, groups)))
}

async fn post_create(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let input = PostInput::from_multipart(&mut multipart).await?;
    let groups = {
        let conn = state.db.get()?;
        groups::list_groups(&conn)?
    };

    let valid = match input.validate(&groups) {
        Ok(valid) => valid,
        Err(errors) => {
            let form = PostFormTemplate::blank(&user, groups).with_input(&input, errors);
            return Ok(Html(form).into_response());
        }
    };

    let stored = match &valid.image {
        Some(upload) => Some(media::store_post_image(state.config.uploads_path(), upload).await?),
        None => None,
    };

    let fields = valid.into_fields(stored.clone());
    let saved = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| Ok(posts::create_post(&conn, user.id, &fields)?));
    let post_id = discard_upload_on_error(&state, stored.as_deref(), saved).await?;
    tracing::info!("User {} created post {}", user.username, post_id);

    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}

async fn post_edit_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Html<PostFormTemplate>> {
    let post_id = parse_post_id(&post_id)?;
    let conn = state.db.get()?;
    let post = posts::find_by_id(&conn, post_id)?.ok_or(AppError::NotFound)?;
    ensure_author(&user, &post)?;

    let groups = groups::list_groups(&conn)?;
    Ok(Html(PostFormTemplate::for_post(&user, &post, groups)))
}

async fn post_edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let post_id = parse_post_id(&post_id)?;
    let (post, groups) = {
        let conn = state.db.get()?;
        let post = posts::find_by_id(&conn, post_id)?.ok_or(AppError::NotFound)?;
        ensure_author(&user, &post)?;
        (post, groups::list_groups(&conn)?)
    };

    let input = PostInput::from_multipart(&mut multipart).await?;
    let valid = match input.validate(&groups) {
        Ok(valid) => valid,
        Err(errors) => {
            let form = PostFormTemplate::for_post(&user, &post, groups).with_input(&input, errors);
            return Ok(Html(form).into_response());
        }
    };

    let stored = match &valid.image {
        Some(upload) => Some(media::store_post_image(state.config.uploads_path(), upload).await?),
        None => None,
    };

    // No new upload keeps the current image
    let fields = valid.into_fields(stored.clone().or_else(|| post.image.clone()));
    let saved = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| Ok(posts::update_post(&conn, post.id, &fields)?));
    discard_upload_on_error(&state, stored.as_deref(), saved).await?;
    tracing::info!("User {} edited post {}", user.username, post.id);

    Ok(Redirect::to(&format!("/posts/{}/", post.id)).into_response())
}

/// Remove a just-written upload when the row meant to reference it was not saved
async fn discard_upload_on_error<T>(
    state: &AppState,
    stored: Option<&str>,
    saved: AppResult<T>,
) -> AppResult<T> {
    if saved.is_err() {
        if let Some(relative) = stored {
            media::remove_post_image(state.config.uploads_path(), relative).await;
        }
    }
    saved
}
