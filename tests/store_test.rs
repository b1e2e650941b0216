//! Store-level checks against a real database file
//!
//! Tests cover:
//! - Migrations applying cleanly and only once
//! - Constraints the schema enforces on its own
//! - Feed pagination over varying collection sizes
//! - Session expiry

use rusqlite::params;
use tempfile::TempDir;

use yatube::db::{self, groups, posts, users};
use yatube::feed::{self, Feed};
use yatube::{auth::session, follow};

// Helper to create a test database
fn create_test_db() -> (TempDir, rusqlite::Connection) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();

    // Run migrations
    for (name, sql) in db::MIGRATIONS.iter() {
        conn.execute_batch(sql)
            .unwrap_or_else(|e| panic!("Migration {} failed: {}", name, e));
    }

    (temp_dir, conn)
}

fn insert_user(conn: &rusqlite::Connection, username: &str) -> i64 {
    users::create_user(
        conn,
        &users::NewUser {
            username: username.into(),
            password_hash: "hash".into(),
            ..Default::default()
        },
    )
    .unwrap()
}

fn insert_posts(conn: &rusqlite::Connection, author: i64, count: usize) {
    for i in 0..count {
        posts::create_post(
            conn,
            author,
            &posts::PostFields {
                text: format!("post {}", i),
                ..Default::default()
            },
        )
        .unwrap();
    }
}

#[test]
fn test_run_migrations_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let pool = db::create_pool(&temp_dir.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();
    db::run_migrations(&pool).unwrap();

    let conn = pool.get().unwrap();
    let applied: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(applied as usize, db::MIGRATIONS.len());

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1, "pooled connections enforce foreign keys");
}

#[test]
fn test_schema_rejects_duplicate_follow_edges() {
    let (_dir, conn) = create_test_db();
    let reader = insert_user(&conn, "reader");
    let writer = insert_user(&conn, "writer");

    conn.execute(
        "INSERT INTO follows (user_id, author_id) VALUES (?1, ?2)",
        params![reader, writer],
    )
    .unwrap();
    let duplicate = conn.execute(
        "INSERT INTO follows (user_id, author_id) VALUES (?1, ?2)",
        params![reader, writer],
    );
    assert!(duplicate.is_err());

    // The follow function absorbs the same conflict
    assert_eq!(
        follow::follow(&conn, reader, writer).unwrap(),
        follow::EdgeChange::Unchanged
    );
}

#[test]
fn test_duplicate_usernames_and_slugs_are_rejected() {
    let (_dir, conn) = create_test_db();
    insert_user(&conn, "same");
    assert!(users::create_user(
        &conn,
        &users::NewUser {
            username: "same".into(),
            password_hash: "hash".into(),
            ..Default::default()
        }
    )
    .is_err());

    groups::create_group(&conn, "One", "slug", "").unwrap();
    assert!(groups::create_group(&conn, "Two", "slug", "").is_err());
}

#[test]
fn test_page_counts_follow_collection_size() {
    for (total, per_page) in [(0, 10), (1, 10), (10, 10), (13, 10), (21, 5)] {
        let (_dir, conn) = create_test_db();
        let author = insert_user(&conn, "author");
        insert_posts(&conn, author, total);

        let first = feed::load_page(&conn, Feed::All, per_page, None).unwrap();
        let expected_pages = if total == 0 {
            1
        } else {
            total.div_ceil(per_page)
        };
        assert_eq!(first.num_pages, expected_pages, "{} posts by {}", total, per_page);

        let beyond = (expected_pages + 5).to_string();
        let last = feed::load_page(&conn, Feed::All, per_page, Some(beyond.as_str())).unwrap();
        let expected_last = match total % per_page {
            0 if total > 0 => per_page,
            rest => rest,
        };
        assert_eq!(last.number, expected_pages);
        assert_eq!(last.len(), expected_last, "{} posts by {}", total, per_page);
    }
}

#[test]
fn test_expired_sessions_are_ignored_and_purged() {
    let (_dir, conn) = create_test_db();
    let user = insert_user(&conn, "sleepy");
    let live = session::create_session(&conn, user, 1).unwrap();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at)
         VALUES ('old', ?1, 'stale-token', datetime('now', '-1 hours'))",
        params![user],
    )
    .unwrap();

    assert!(session::lookup_session(&conn, "stale-token").unwrap().is_none());
    assert_eq!(
        session::lookup_session(&conn, &live).unwrap().map(|u| u.id),
        Some(user)
    );
    assert_eq!(session::purge_expired(&conn).unwrap(), 1);
}
