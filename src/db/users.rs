use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::User;

const USER_COLUMNS: &str =
    "id, username, password_hash, first_name, last_name, email, date_joined";

/// Fields collected at sign-up; the password is already hashed.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        date_joined: row.get(6)?,
    })
}

pub fn create_user(conn: &Connection, user: &NewUser) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (username, password_hash, first_name, last_name, email)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.username,
            user.password_hash,
            user.first_name,
            user.last_name,
            user.email
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
        params![username],
        map_user,
    )
    .optional()
}

pub fn username_taken(conn: &Connection, username: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )
}
