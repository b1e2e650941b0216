use rusqlite::{params, Connection};

/// A comment joined with its author's username, oldest first on a post
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRow {
    pub id: i64,
    pub author_username: String,
    pub text: String,
    pub created: String,
}

pub fn add_comment(
    conn: &Connection,
    post_id: i64,
    author_id: i64,
    text: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO comments (post_id, author_id, text) VALUES (?1, ?2, ?3)",
        params![post_id, author_id, text],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn comments_for_post(conn: &Connection, post_id: i64) -> rusqlite::Result<Vec<CommentRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, u.username, c.text, c.created
         FROM comments c
         JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?1
         ORDER BY c.created ASC, c.id ASC",
    )?;

    let comments = stmt
        .query_map(params![post_id], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                author_username: row.get(1)?,
                text: row.get(2)?,
                created: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(comments)
}
