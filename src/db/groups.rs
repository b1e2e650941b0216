use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::Group;

fn map_group(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

pub fn create_group(
    conn: &Connection,
    title: &str,
    slug: &str,
    description: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO groups (title, slug, description) VALUES (?1, ?2, ?3)",
        params![title, slug, description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_slug(conn: &Connection, slug: &str) -> rusqlite::Result<Option<Group>> {
    conn.query_row(
        "SELECT id, title, slug, description FROM groups WHERE slug = ?1",
        params![slug],
        map_group,
    )
    .optional()
}

/// All groups by title, for the post form's group picker
pub fn list_groups(conn: &Connection) -> rusqlite::Result<Vec<Group>> {
    let mut stmt =
        conn.prepare("SELECT id, title, slug, description FROM groups ORDER BY title, id")?;
    let groups = stmt
        .query_map([], map_group)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(groups)
}

/// Slugs are ASCII letters, digits, `-` and `_`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
