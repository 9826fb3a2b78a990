//! Database schema migrations for studyloop.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: courses, concepts, sessions, progress.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS courses (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            title       TEXT NOT NULL,
            card_count  INTEGER NOT NULL CHECK (card_count > 0),
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS memory_concepts (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL,
            course_id       TEXT,
            title           TEXT NOT NULL,
            content         TEXT,
            repetition      INTEGER NOT NULL DEFAULT 0,
            easiness_factor REAL NOT NULL CHECK (easiness_factor >= 1.3),
            interval        INTEGER NOT NULL DEFAULT 0,
            next_review     TEXT NOT NULL,
            last_reviewed   TEXT,
            retired         INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS course_sessions (
            id                TEXT PRIMARY KEY,
            course_id         TEXT NOT NULL,
            session_number    INTEGER NOT NULL,
            scheduled_date    TEXT NOT NULL,
            cards_start_index INTEGER NOT NULL,
            cards_end_index   INTEGER NOT NULL,
            is_completed      INTEGER NOT NULL DEFAULT 0,
            completed_at      TEXT,
            UNIQUE (course_id, session_number),
            CHECK (cards_start_index < cards_end_index)
        );

        CREATE TABLE IF NOT EXISTS course_progress (
            id                 TEXT PRIMARY KEY,
            user_id            TEXT NOT NULL,
            course_id          TEXT NOT NULL,
            current_card_index INTEGER NOT NULL DEFAULT 0,
            completed_cards    TEXT NOT NULL DEFAULT '[]',
            earned_xp          INTEGER NOT NULL DEFAULT 0,
            is_completed       INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, course_id)
        );

        CREATE TABLE IF NOT EXISTS user_progress (
            user_id           TEXT PRIMARY KEY,
            xp                INTEGER NOT NULL DEFAULT 0,
            streak            INTEGER NOT NULL DEFAULT 0,
            today_minutes     INTEGER NOT NULL DEFAULT 0,
            completed_lessons TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_concepts_user_due ON memory_concepts(user_id, next_review);
        CREATE INDEX IF NOT EXISTS idx_sessions_course ON course_sessions(course_id, session_number);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: per-day activity tracking.
///
/// Adds the following columns to the user_progress table:
/// - last_active_date: last calendar day the learner did anything
/// - last_streak_date: last calendar day the streak was extended
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE user_progress ADD COLUMN last_active_date TEXT;
         ALTER TABLE user_progress ADD COLUMN last_streak_date TEXT;",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        conn.execute(
            "INSERT INTO user_progress (user_id, last_streak_date) VALUES ('u1', '2024-01-01')",
            [],
        )
        .unwrap();
    }
}
