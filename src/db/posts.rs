use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::Post;

/// Validated post fields, as written on create and on edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFields {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Insert a post authored by `author_id`; `pub_date` is stamped by the store.
pub fn create_post(conn: &Connection, author_id: i64, fields: &PostFields) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO posts (text, author_id, group_id, image) VALUES (?1, ?2, ?3, ?4)",
        params![fields.text, author_id, fields.group_id, fields.image],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Post>> {
    conn.query_row(
        "SELECT id, text, pub_date, author_id, group_id, image FROM posts WHERE id = ?1",
        params![id],
        |row| {
            Ok(Post {
                id: row.get(0)?,
                text: row.get(1)?,
                pub_date: row.get(2)?,
                author_id: row.get(3)?,
                group_id: row.get(4)?,
                image: row.get(5)?,
            })
        },
    )
    .optional()
}

/// Overwrite text, group and image in place. Author and `pub_date` never change.
pub fn update_post(conn: &Connection, id: i64, fields: &PostFields) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE posts SET text = ?1, group_id = ?2, image = ?3 WHERE id = ?4",
        params![fields.text, fields.group_id, fields.image, id],
    )?;
    Ok(rows > 0)
}

pub fn count_by_author(conn: &Connection, author_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
        params![author_id],
        |row| row.get(0),
    )
}

pub fn count_all(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
}
