//! Database schema migrations.

use rusqlite::Connection;

use crate::error::{DatabaseError, ServiceResult};

/// Run all database migrations.
///
/// Called during database initialization to ensure the schema is up to date.
pub(super) fn run_migrations(conn: &Connection) -> ServiceResult<()> {
    conn.execute_batch(
        r#"
        -- One active conversation thread per user
        CREATE TABLE IF NOT EXISTS user_threads (
            user_id TEXT PRIMARY KEY,
            thread_id TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Audit trail of thread replacements
        CREATE TABLE IF NOT EXISTS thread_rotations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            previous_thread_id TEXT,
            new_thread_id TEXT NOT NULL,
            reason TEXT NOT NULL,
            rotated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_thread_rotations_user ON thread_rotations(user_id);
    "#,
    )
    .map_err(|e| DatabaseError::Migration {
        message: e.to_string(),
    })?;

    Ok(())
}
