use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};

use crate::extractors::CurrentUser;

/// Create a new session for a user. Returns the session token.
pub fn create_session(conn: &Connection, user_id: i64, hours: u64) -> rusqlite::Result<String> {
    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve a live session token to its user.
pub fn lookup_session(conn: &Connection, token: &str) -> rusqlite::Result<Option<CurrentUser>> {
    conn.query_row(
        "SELECT u.id, u.username FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = ?1 AND s.expires_at > datetime('now')",
        params![token],
        |row| {
            Ok(CurrentUser {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Delete a session by token.
pub fn delete_session(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Drop sessions past their expiry. Returns how many were removed.
pub fn purge_expired(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= datetime('now')",
        [],
    )
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_pool;
    use crate::db::users::{create_user, NewUser};

    fn user(conn: &Connection) -> i64 {
        create_user(
            conn,
            &NewUser {
                username: "sessioned".into(),
                password_hash: "x".into(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_token_is_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn session_round_trip() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let uid = user(&conn);

        let token = create_session(&conn, uid, 1).unwrap();
        let found = lookup_session(&conn, &token).unwrap().unwrap();
        assert_eq!(found.id, uid);
        assert_eq!(found.username, "sessioned");

        delete_session(&conn, &token).unwrap();
        assert!(lookup_session(&conn, &token).unwrap().is_none());
    }

    #[test]
    fn expired_sessions_are_ignored_and_purged() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let uid = user(&conn);
        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at)
             VALUES ('old', ?1, 'stale', datetime('now', '-1 hours'))",
            params![uid],
        )
        .unwrap();

        assert!(lookup_session(&conn, "stale").unwrap().is_none());
        assert_eq!(purge_expired(&conn).unwrap(), 1);
    }
}
