//! Reminder store - SQLite-backed lifecycle state
//!
//! Owns the reminders table: creation, owner-scoped queries, status
//! transitions, and the nudge/digest markers the dispatcher relies on.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::{params, Connection, Row};
use std::fs;
use std::path::Path;

/// Lifecycle state of a reminder. Done and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Done,
    Cancelled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Done => "DONE",
            Status::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "PENDING" => Some(Status::Pending),
            "DONE" => Some(Status::Done),
            "CANCELLED" => Some(Status::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done | Status::Cancelled)
    }

    /// Legal transitions: Pending -> Done, Pending -> Cancelled
    pub fn can_become(&self, new: Status) -> bool {
        matches!(
            (self, new),
            (Status::Pending, Status::Done) | (Status::Pending, Status::Cancelled)
        )
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pending => write!(f, "pending"),
            Status::Done => write!(f, "done"),
            Status::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How the reminder reached us. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Text,
    Voice,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Text => "TEXT",
            Source::Voice => "VOICE",
        }
    }

    pub fn parse(s: &str) -> Option<Source> {
        match s {
            "TEXT" => Some(Source::Text),
            "VOICE" => Some(Source::Voice),
            _ => None,
        }
    }
}

/// A stored reminder
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: i64,
    pub created_by: String,
    pub for_user: String,
    pub text: String,
    pub due_at: DateTime<Utc>,
    pub status: Status,
    pub source: Source,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub nudged_at: Option<DateTime<Utc>>,
    pub digested_on: Option<NaiveDate>,
}

/// Input for creating a reminder
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub created_by: String,
    pub for_user: String,
    pub text: String,
    pub due_at: DateTime<Utc>,
    pub source: Source,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS reminders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    created_by  TEXT NOT NULL,
    for_user    TEXT NOT NULL,
    text        TEXT NOT NULL,
    due_at      INTEGER NOT NULL,
    status      TEXT NOT NULL DEFAULT 'PENDING',
    source      TEXT NOT NULL DEFAULT 'TEXT',
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL,
    nudged_at   INTEGER,
    digested_on TEXT
);
CREATE INDEX IF NOT EXISTS idx_reminders_owner_status ON reminders(for_user, status);
CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders(status, due_at);
"#;

const COLUMNS: &str =
    "id, created_by, for_user, text, due_at, status, source, created_at, updated_at, nudged_at, digested_on";

/// SQLite-backed store. All reads and writes go through one connection;
/// transition and marker updates are single guarded UPDATE statements, so
/// they are atomic per row.
pub struct ReminderStore {
    conn: Connection,
}

impl ReminderStore {
    /// Open (creating parents and schema as needed) a database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// In-memory store for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert a new reminder and return the stored row
    pub fn create(&self, new: &NewReminder, now: DateTime<Utc>) -> Result<Reminder> {
        self.conn.execute(
            "INSERT INTO reminders (created_by, for_user, text, due_at, status, source, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                new.created_by,
                new.for_user,
                new.text.trim(),
                new.due_at.timestamp(),
                Status::Pending.as_str(),
                new.source.as_str(),
                now.timestamp(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get(&new.for_user, id)?.ok_or(Error::NotFound(id))
    }

    /// Fetch one reminder by id, scoped to the owner
    pub fn get(&self, owner: &str, id: i64) -> Result<Option<Reminder>> {
        let sql = format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1 AND for_user = ?2");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id, owner], row_to_reminder)?;
        Ok(rows.next().transpose()?)
    }

    /// All pending reminders for an owner, ascending due time (ties by id)
    pub fn list_pending(&self, owner: &str) -> Result<Vec<Reminder>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE for_user = ?1 AND status = 'PENDING'
             ORDER BY due_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], row_to_reminder)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Pending reminders for an owner with due time in `[start, end)`
    pub fn list_window(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reminder>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE for_user = ?1 AND status = 'PENDING'
               AND due_at >= ?2 AND due_at < ?3
             ORDER BY due_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![owner, start.timestamp(), end.timestamp()],
            row_to_reminder,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Case-insensitive substring match over an owner's pending reminders
    pub fn match_text(&self, owner: &str, needle: &str) -> Result<Vec<Reminder>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE for_user = ?1 AND status = 'PENDING'
               AND instr(lower(text), lower(?2)) > 0
             ORDER BY due_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner, needle], row_to_reminder)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Move a pending reminder to a terminal status.
    ///
    /// The UPDATE is guarded on `status = 'PENDING'`, so a concurrent
    /// transition cannot double-apply; a terminal row yields
    /// `Error::IllegalTransition`, a missing or foreign row `Error::NotFound`.
    pub fn transition(
        &self,
        owner: &str,
        id: i64,
        new_status: Status,
        now: DateTime<Utc>,
    ) -> Result<Reminder> {
        if !Status::Pending.can_become(new_status) {
            return Err(Error::IllegalTransition {
                id,
                from: Status::Pending,
                to: new_status,
            });
        }

        let changed = self.conn.execute(
            "UPDATE reminders SET status = ?1, updated_at = ?2
             WHERE id = ?3 AND for_user = ?4 AND status = 'PENDING'",
            params![new_status.as_str(), now.timestamp(), id, owner],
        )?;

        if changed == 0 {
            return match self.get(owner, id)? {
                Some(r) => Err(Error::IllegalTransition {
                    id,
                    from: r.status,
                    to: new_status,
                }),
                None => Err(Error::NotFound(id)),
            };
        }

        self.get(owner, id)?.ok_or(Error::NotFound(id))
    }

    /// All owners' pending reminders that are due and not yet nudged
    pub fn due_for_nudge(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE status = 'PENDING' AND due_at <= ?1 AND nudged_at IS NULL
             ORDER BY due_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![now.timestamp()], row_to_reminder)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Set the nudge marker. Guarded on the marker being unset; returns
    /// whether this call set it, so racing callers see exactly one `true`.
    pub fn mark_nudged(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE reminders SET nudged_at = ?1
             WHERE id = ?2 AND status = 'PENDING' AND nudged_at IS NULL",
            params![now.timestamp(), id],
        )?;
        Ok(changed == 1)
    }

    /// Pending reminders in the window not yet digested on `date`
    pub fn digest_candidates(
        &self,
        owner: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        date: NaiveDate,
    ) -> Result<Vec<Reminder>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE for_user = ?1 AND status = 'PENDING'
               AND due_at >= ?2 AND due_at < ?3
               AND digested_on IS NOT ?4
             ORDER BY due_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![owner, start.timestamp(), end.timestamp(), date.to_string()],
            row_to_reminder,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Set the digest marker for `date`. Idempotent per day.
    pub fn mark_digested(&self, id: i64, date: NaiveDate) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE reminders SET digested_on = ?1
             WHERE id = ?2 AND digested_on IS NOT ?1",
            params![date.to_string(), id],
        )?;
        Ok(changed == 1)
    }

    /// Distinct owners that have at least one pending reminder
    pub fn owners_with_pending(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT for_user FROM reminders WHERE status = 'PENDING' ORDER BY for_user",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn row_to_reminder(row: &Row) -> rusqlite::Result<Reminder> {
    let status_s: String = row.get(5)?;
    let source_s: String = row.get(6)?;
    let digested_s: Option<String> = row.get(10)?;

    let status = Status::parse(&status_s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown status: {status_s}").into(),
        )
    })?;
    let source = Source::parse(&source_s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown source: {source_s}").into(),
        )
    })?;

    Ok(Reminder {
        id: row.get(0)?,
        created_by: row.get(1)?,
        for_user: row.get(2)?,
        text: row.get(3)?,
        due_at: epoch_to_utc(row.get(4)?),
        status,
        source,
        created_at: epoch_to_utc(row.get(7)?),
        updated_at: epoch_to_utc(row.get(8)?),
        nudged_at: row.get::<_, Option<i64>>(9)?.map(epoch_to_utc),
        digested_on: digested_s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
    })
}

/// Convert stored epoch seconds to DateTime<Utc>
fn epoch_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}
