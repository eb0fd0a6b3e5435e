//! Durable copy of the last published result bundle.

use super::RecordStore;
use crate::error::AnalyticsResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

/// Snapshots retained after each save.
const SNAPSHOT_RETENTION: i64 = 5;

impl RecordStore {
    pub fn save_snapshot(&self, computed_at: DateTime<Utc>, bundle_json: &str) -> AnalyticsResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO analytics_snapshot (computed_at, bundle_json) VALUES (?1, ?2)",
            params![computed_at.to_rfc3339(), bundle_json],
        )?;
        conn.execute(
            "DELETE FROM analytics_snapshot
             WHERE id NOT IN (SELECT id FROM analytics_snapshot ORDER BY id DESC LIMIT ?1)",
            params![SNAPSHOT_RETENTION],
        )?;
        Ok(())
    }

    /// The most recently saved bundle JSON, if any.
    pub fn latest_snapshot(&self) -> AnalyticsResult<Option<String>> {
        let json = self
            .conn()
            .query_row(
                "SELECT bundle_json FROM analytics_snapshot ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(json)
    }

    /// Number of snapshots currently retained (for tests).
    pub fn snapshot_count(&self) -> AnalyticsResult<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM analytics_snapshot",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
