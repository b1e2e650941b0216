//! Directed follow edges between users.
//!
//! Following twice, following yourself and unfollowing someone you do not
//! follow are all quiet no-ops.

use rusqlite::{params, Connection};

/// What a follow/unfollow call actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    Created,
    Removed,
    Unchanged,
}

pub fn follow(conn: &Connection, user_id: i64, author_id: i64) -> rusqlite::Result<EdgeChange> {
    if user_id == author_id {
        tracing::debug!("Ignoring self-follow by user {}", user_id);
        return Ok(EdgeChange::Unchanged);
    }

    let rows = conn.execute(
        "INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?1, ?2)",
        params![user_id, author_id],
    )?;

    if rows > 0 {
        tracing::info!("User {} now follows {}", user_id, author_id);
        Ok(EdgeChange::Created)
    } else {
        tracing::debug!("User {} already follows {}", user_id, author_id);
        Ok(EdgeChange::Unchanged)
    }
}

pub fn unfollow(conn: &Connection, user_id: i64, author_id: i64) -> rusqlite::Result<EdgeChange> {
    let rows = conn.execute(
        "DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2",
        params![user_id, author_id],
    )?;

    if rows > 0 {
        tracing::info!("User {} unfollowed {}", user_id, author_id);
        Ok(EdgeChange::Removed)
    } else {
        Ok(EdgeChange::Unchanged)
    }
}

pub fn is_following(conn: &Connection, user_id: i64, author_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM follows WHERE user_id = ?1 AND author_id = ?2",
        params![user_id, author_id],
        |row| row.get(0),
    )
}

pub fn follower_count(conn: &Connection, author_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE author_id = ?1",
        params![author_id],
        |row| row.get(0),
    )
}

pub fn following_count(conn: &Connection, user_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM follows WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}
