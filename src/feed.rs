//! Read side of the blog: which posts each listing shows, in what order.
//!
//! Every listing is newest first (ties broken by id, newest first) and loads
//! author and group in the same query as the post.

use rusqlite::{params_from_iter, Connection, Row};

use crate::db::comments::{comments_for_post, CommentRow};
use crate::db::models::{Group, User};
use crate::db::{groups, posts, users};
use crate::display::parse_and_format_time;
use crate::error::{AppError, AppResult};
use crate::follow;
use crate::pagination::{Page, Paginator};

/// A post joined with the author and group it is shown with
#[derive(Debug, Clone, PartialEq)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub pub_date: String,
    pub image: Option<String>,
    pub author_username: String,
    pub author_name: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
}

impl PostCard {
    pub fn has_group(&self) -> bool {
        self.group_slug.is_some()
    }

    pub fn group_slug(&self) -> &str {
        self.group_slug.as_deref().unwrap_or_default()
    }

    pub fn group_title(&self) -> &str {
        self.group_title.as_deref().unwrap_or_default()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn image_url(&self) -> String {
        self.image
            .as_deref()
            .map(|path| format!("/media/{}", path))
            .unwrap_or_default()
    }

    pub fn display_date(&self) -> String {
        parse_and_format_time(&self.pub_date)
    }
}

/// The filter behind each listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    All,
    Group(i64),
    Author(i64),
    /// Posts by everyone the given user follows
    FollowedBy(i64),
}

impl Feed {
    fn where_clause(&self) -> (&'static str, Vec<i64>) {
        match *self {
            Feed::All => ("", vec![]),
            Feed::Group(id) => ("WHERE p.group_id = ?", vec![id]),
            Feed::Author(id) => ("WHERE p.author_id = ?", vec![id]),
            Feed::FollowedBy(id) => (
                "WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ?)",
                vec![id],
            ),
        }
    }
}

const CARD_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image,
        u.username, u.first_name, u.last_name, g.slug, g.title
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id";

const CARD_ORDER: &str = "ORDER BY p.pub_date DESC, p.id DESC";

fn map_card(row: &Row<'_>) -> rusqlite::Result<PostCard> {
    let username: String = row.get(4)?;
    let first_name: String = row.get(5)?;
    let last_name: String = row.get(6)?;
    let full_name = format!("{} {}", first_name, last_name).trim().to_string();
    Ok(PostCard {
        id: row.get(0)?,
        text: row.get(1)?,
        pub_date: row.get(2)?,
        image: row.get(3)?,
        author_name: if full_name.is_empty() {
            username.clone()
        } else {
            full_name
        },
        author_username: username,
        group_slug: row.get(7)?,
        group_title: row.get(8)?,
    })
}

pub fn count(conn: &Connection, feed: Feed) -> rusqlite::Result<usize> {
    let (clause, args) = feed.where_clause();
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM posts p {}", clause),
        params_from_iter(args),
        |row| row.get(0),
    )?;
    Ok(total.max(0) as usize)
}

/// Load one page of `feed`, clamping `requested` into range
pub fn load_page(
    conn: &Connection,
    feed: Feed,
    per_page: usize,
    requested: Option<&str>,
) -> rusqlite::Result<Page<PostCard>> {
    let paginator = Paginator::new(count(conn, feed)?, per_page);
    paginator.page(requested, |limit, offset| {
        let (clause, mut args) = feed.where_clause();
        args.push(limit as i64);
        args.push(offset as i64);
        let sql = format!("{} {} {} LIMIT ? OFFSET ?", CARD_SELECT, clause, CARD_ORDER);
        let mut stmt = conn.prepare(&sql)?;
        let cards = stmt
            .query_map(params_from_iter(args), map_card)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    })
}

pub fn global_feed(
    conn: &Connection,
    per_page: usize,
    requested: Option<&str>,
) -> AppResult<Page<PostCard>> {
    Ok(load_page(conn, Feed::All, per_page, requested)?)
}

pub struct GroupFeed {
    pub group: Group,
    pub page: Page<PostCard>,
}

pub fn group_feed(
    conn: &Connection,
    slug: &str,
    per_page: usize,
    requested: Option<&str>,
) -> AppResult<GroupFeed> {
    let group = groups::find_by_slug(conn, slug)?.ok_or(AppError::NotFound)?;
    let page = load_page(conn, Feed::Group(group.id), per_page, requested)?;
    Ok(GroupFeed { group, page })
}

pub struct AuthorFeed {
    pub author: User,
    pub post_count: usize,
    /// Whether the viewer follows this author; always false for anonymous viewers
    pub following: bool,
    pub page: Page<PostCard>,
}

pub fn author_feed(
    conn: &Connection,
    username: &str,
    viewer_id: Option<i64>,
    per_page: usize,
    requested: Option<&str>,
) -> AppResult<AuthorFeed> {
    let author = users::find_by_username(conn, username)?.ok_or(AppError::NotFound)?;
    let page = load_page(conn, Feed::Author(author.id), per_page, requested)?;
    let following = match viewer_id {
        Some(viewer) => follow::is_following(conn, viewer, author.id)?,
        None => false,
    };
    Ok(AuthorFeed {
        post_count: page.total,
        author,
        following,
        page,
    })
}

/// Posts by authors `viewer_id` follows; empty when they follow nobody
pub fn followed_feed(
    conn: &Connection,
    viewer_id: i64,
    per_page: usize,
    requested: Option<&str>,
) -> AppResult<Page<PostCard>> {
    Ok(load_page(conn, Feed::FollowedBy(viewer_id), per_page, requested)?)
}

pub struct PostDetail {
    pub post: PostCard,
    pub author_id: i64,
    pub author_post_count: i64,
    pub comments: Vec<CommentRow>,
}

pub fn post_detail(conn: &Connection, post_id: i64) -> AppResult<PostDetail> {
    let post = posts::find_by_id(conn, post_id)?.ok_or(AppError::NotFound)?;
    let card = conn.query_row(
        &format!("{} WHERE p.id = ?1", CARD_SELECT),
        [post.id],
        map_card,
    )?;
    Ok(PostDetail {
        post: card,
        author_id: post.author_id,
        author_post_count: posts::count_by_author(conn, post.author_id)?,
        comments: comments_for_post(conn, post.id)?,
    })
}
