//! SQLite persistence for the activity ledger.

use super::ActivityRecord;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

/// Append-only ledger store.
///
/// Inserts are single statements under a Mutex-wrapped connection, so
/// concurrent writers need no further coordination. The rowid gives records
/// a per-store monotonic order, which is what the delete-enrichment lookup
/// relies on when timestamps tie.
pub struct ActivityLedger {
    conn: Mutex<Connection>,
}

/// `/history` projection of a record.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub activity: String,
    pub timestamp: String,
    pub success: bool,
    #[serde(rename = "type")]
    pub type_tag: Option<String>,
}

/// `/card` history projection: card activity with its room context.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub activity: String,
    pub timestamp: String,
    pub success: bool,
    #[serde(rename = "type")]
    pub type_tag: Option<String>,
    pub room_id: Option<String>,
    pub room_title: Option<String>,
    pub message_id: Option<String>,
}

/// `/images` projection: everything but the email.
#[derive(Debug, Serialize)]
pub struct ImageRecord {
    pub activity: String,
    pub timestamp: String,
    pub success: bool,
    pub filename: Option<String>,
    pub link: Option<String>,
}

/// Aggregate usage statistics for `/system`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendStats {
    pub total_users: i64,
    pub total_cards_sent: i64,
}

impl SendStats {
    pub fn zero() -> Self {
        Self {
            total_users: 0,
            total_cards_sent: 0,
        }
    }
}

impl ActivityLedger {
    /// Create or open the ledger database.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open ledger database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS activity (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL,
                activity TEXT NOT NULL,
                success INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                type TEXT,
                room_id TEXT,
                room_title TEXT,
                message_id TEXT,
                filename TEXT,
                link TEXT
            )
            "#,
            [],
        )
        .context("Failed to create activity table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activity_email ON activity(email, id)",
            [],
        )
        .context("Failed to create email index")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activity_message ON activity(email, message_id)",
            [],
        )
        .context("Failed to create message index")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append a record. Records are never updated after insertion.
    pub fn record(&self, record: &ActivityRecord) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                r#"
                INSERT INTO activity (
                    email, activity, success, timestamp,
                    type, room_id, room_title, message_id, filename, link
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    record.email,
                    record.activity.as_str(),
                    record.success as i64,
                    record.timestamp.to_rfc3339(),
                    record.type_tag,
                    record.room_id,
                    record.room_title,
                    record.message_id,
                    record.filename,
                    record.link,
                ],
            )
            .context("Failed to insert activity record")?;

        Ok(())
    }

    /// All activities for one identity, newest first.
    pub fn recent(&self, email: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT activity, timestamp, success, type
                FROM activity
                WHERE email = ?1
                ORDER BY id DESC
                LIMIT ?2
                "#,
            )
            .context("Failed to prepare history query")?;

        let entries = stmt
            .query_map(params![email, limit as i64], |row| {
                Ok(HistoryEntry {
                    activity: row.get(0)?,
                    timestamp: row.get(1)?,
                    success: row.get::<_, i64>(2)? != 0,
                    type_tag: row.get(3)?,
                })
            })
            .context("Failed to execute history query")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read history rows")?;

        Ok(entries)
    }

    /// Card activity (sends and deletes) for one identity, newest first.
    pub fn card_history(&self, email: &str, limit: usize) -> Result<Vec<CardRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT activity, timestamp, success, type, room_id, room_title, message_id
                FROM activity
                WHERE email = ?1 AND activity IN ('send card', 'delete card')
                ORDER BY id DESC
                LIMIT ?2
                "#,
            )
            .context("Failed to prepare card history query")?;

        let records = stmt
            .query_map(params![email, limit as i64], card_record_from_row)
            .context("Failed to execute card history query")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read card history rows")?;

        Ok(records)
    }

    /// Image upload records for one identity, newest first.
    pub fn image_history(&self, email: &str, limit: usize) -> Result<Vec<ImageRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT activity, timestamp, success, filename, link
                FROM activity
                WHERE email = ?1 AND activity = 'upload image'
                ORDER BY id DESC
                LIMIT ?2
                "#,
            )
            .context("Failed to prepare image history query")?;

        let records = stmt
            .query_map(params![email, limit as i64], |row| {
                Ok(ImageRecord {
                    activity: row.get(0)?,
                    timestamp: row.get(1)?,
                    success: row.get::<_, i64>(2)? != 0,
                    filename: row.get(3)?,
                    link: row.get(4)?,
                })
            })
            .context("Failed to execute image history query")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read image history rows")?;

        Ok(records)
    }

    /// Room context of the most recent successful send of `message_id` by
    /// `email`. The sole source of room metadata for delete records.
    pub fn find_sent_card(
        &self,
        email: &str,
        message_id: &str,
    ) -> Result<Option<(Option<String>, Option<String>)>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT room_id, room_title
            FROM activity
            WHERE email = ?1 AND message_id = ?2
                  AND activity = 'send card' AND success = 1
            ORDER BY id DESC
            LIMIT 1
            "#,
            params![email, message_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .context("Failed to query sent card")
    }

    /// Distinct users with at least one successful send, and the total
    /// number of successful sends.
    pub fn send_stats(&self) -> Result<SendStats> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            r#"
            SELECT COUNT(DISTINCT email), COUNT(*)
            FROM activity
            WHERE activity = 'send card' AND success = 1
            "#,
            [],
            |row| {
                Ok(SendStats {
                    total_users: row.get(0)?,
                    total_cards_sent: row.get(1)?,
                })
            },
        )
        .context("Failed to query send stats")
    }
}

fn card_record_from_row(row: &Row<'_>) -> rusqlite::Result<CardRecord> {
    Ok(CardRecord {
        activity: row.get(0)?,
        timestamp: row.get(1)?,
        success: row.get::<_, i64>(2)? != 0,
        type_tag: row.get(3)?,
        room_id: row.get(4)?,
        room_title: row.get(5)?,
        message_id: row.get(6)?,
    })
}
