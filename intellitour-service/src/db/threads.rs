//! User -> thread mapping operations.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use strum::Display;

use super::Database;
use crate::error::{DatabaseError, ServiceResult};

/// Why a user's thread was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RotationReason {
    /// The thread grew past the configured message count
    MessageLimit,
    /// The assistant runtime rejected the thread with a rate limit
    RateLimit,
}

/// Persistent user -> thread mapping
pub trait ThreadStore: Send + Sync {
    fn get(&self, user_id: &str) -> ServiceResult<Option<String>>;

    fn put(&self, user_id: &str, thread_id: &str) -> ServiceResult<()>;

    fn record_rotation(
        &self,
        _user_id: &str,
        _previous_thread_id: Option<&str>,
        _new_thread_id: &str,
        _reason: RotationReason,
    ) -> ServiceResult<()> {
        Ok(())
    }
}

impl ThreadStore for Database {
    fn get(&self, user_id: &str) -> ServiceResult<Option<String>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT thread_id FROM user_threads WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(DatabaseError::Query)
        .map_err(Into::into)
    }

    fn put(&self, user_id: &str, thread_id: &str) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO user_threads (user_id, thread_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                thread_id = excluded.thread_id,
                updated_at = excluded.updated_at
            "#,
            params![user_id, thread_id, now],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    fn record_rotation(
        &self,
        user_id: &str,
        previous_thread_id: Option<&str>,
        new_thread_id: &str,
        reason: RotationReason,
    ) -> ServiceResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO thread_rotations (user_id, previous_thread_id, new_thread_id, reason, rotated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                user_id,
                previous_thread_id,
                new_thread_id,
                reason.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }
}

impl Database {
    /// Rotations recorded for a user, oldest first, as (new thread, reason)
    #[cfg(test)]
    pub fn list_rotations(&self, user_id: &str) -> ServiceResult<Vec<(String, String)>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT new_thread_id, reason FROM thread_rotations WHERE user_id = ?1 ORDER BY id",
            )
            .map_err(DatabaseError::Query)?;

        let rows = stmt
            .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(DatabaseError::Query)?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Query)
            .map_err(Into::into)
    }
}
