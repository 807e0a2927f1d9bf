// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Processing history — SQLite log of every document Restamp has produced.
//
// Schema:
//   process_history(
//     id              INTEGER PRIMARY KEY AUTOINCREMENT,
//     user_email      TEXT    NOT NULL,
//     user_name       TEXT    NOT NULL,
//     job_description TEXT    NOT NULL,
//     output_kind     TEXT    NOT NULL,   -- "layout-preserved" | "fallback" | "report"
//     source_hash     TEXT,               -- SHA-256 hex of the input document
//     output_hash     TEXT    NOT NULL,   -- SHA-256 hex of the produced document
//     created_at      TEXT    NOT NULL    -- RFC 3339
//   )

use std::path::Path;

use chrono::Utc;
use restamp_core::error::{RestampError, Result};
use restamp_core::types::OutputKind;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS process_history (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_email      TEXT    NOT NULL,
    user_name       TEXT    NOT NULL,
    job_description TEXT    NOT NULL,
    output_kind     TEXT    NOT NULL,
    source_hash     TEXT,
    output_hash     TEXT    NOT NULL,
    created_at      TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_process_history_user
    ON process_history (user_email, id);";

fn db_err(e: rusqlite::Error) -> RestampError {
    RestampError::Database(e.to_string())
}

/// A processing run about to be recorded.
#[derive(Debug, Clone)]
pub struct NewRecord<'a> {
    pub user_email: &'a str,
    pub user_name: &'a str,
    pub job_description: &'a str,
    pub output_kind: OutputKind,
    /// `None` for reports, which have no source document.
    pub source_hash: Option<&'a str>,
    pub output_hash: &'a str,
}

/// A stored processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: i64,
    pub user_email: String,
    pub user_name: String,
    pub job_description: String,
    pub output_kind: OutputKind,
    pub source_hash: Option<String>,
    pub output_hash: String,
    pub created_at: String,
}

impl ProcessRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(4)?;
        let output_kind = OutputKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown output kind {kind:?}").into(),
            )
        })?;
        Ok(Self {
            id: row.get(0)?,
            user_email: row.get(1)?,
            user_name: row.get(2)?,
            job_description: row.get(3)?,
            output_kind,
            source_hash: row.get(5)?,
            output_hash: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

/// History of processed documents, keyed by the requesting user's email.
pub struct ProcessHistory {
    conn: Connection,
}

impl ProcessHistory {
    /// Open (or create) the history database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("process history opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        debug!("in-memory process history opened");
        Ok(Self { conn })
    }

    /// Append a record and return its row id.
    #[instrument(skip_all, fields(kind = record.output_kind.as_str()))]
    pub fn record(&self, record: &NewRecord<'_>) -> Result<i64> {
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO process_history
                    (user_email, user_name, job_description, output_kind,
                     source_hash, output_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.user_email,
                    record.user_name,
                    record.job_description,
                    record.output_kind.as_str(),
                    record.source_hash,
                    record.output_hash,
                    created_at,
                ],
            )
            .map_err(db_err)?;

        let id = self.conn.last_insert_rowid();
        debug!(id, "process recorded");
        Ok(id)
    }

    /// The most recent `limit` records for `user_email`, newest first.
    ///
    /// A blank email matches nothing.
    pub fn recent_for_user(&self, user_email: &str, limit: usize) -> Result<Vec<ProcessRecord>> {
        if user_email.trim().is_empty() {
            warn!("history lookup without a user email");
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_email, user_name, job_description, output_kind,
                        source_hash, output_hash, created_at
                 FROM process_history
                 WHERE user_email = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(db_err)?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![user_email, limit], ProcessRecord::from_row)
            .map_err(db_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    /// Total number of records.
    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM process_history", [], |row| row.get(0))
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_history() -> ProcessHistory {
        ProcessHistory::open_in_memory().expect("in-memory history should open")
    }

    fn rewrite_for<'a>(email: &'a str, job: &'a str) -> NewRecord<'a> {
        NewRecord {
            user_email: email,
            user_name: "Jane Doe",
            job_description: job,
            output_kind: OutputKind::LayoutPreserved,
            source_hash: Some("aa11"),
            output_hash: "bb22",
        }
    }

    #[test]
    fn record_and_count() {
        let history = make_history();
        assert_eq!(history.count().unwrap(), 0);
        let first = history.record(&rewrite_for("jane@example.com", "Rust role")).unwrap();
        let second = history.record(&rewrite_for("jane@example.com", "Go role")).unwrap();
        assert!(second > first);
        assert_eq!(history.count().unwrap(), 2);
    }

    #[test]
    fn recent_records_are_newest_first_and_limited() {
        let history = make_history();
        for job in ["one", "two", "three"] {
            history.record(&rewrite_for("jane@example.com", job)).unwrap();
        }
        let recent = history.recent_for_user("jane@example.com", 2).unwrap();
        let jobs: Vec<&str> = recent.iter().map(|r| r.job_description.as_str()).collect();
        assert_eq!(jobs, vec!["three", "two"]);
        assert_eq!(recent[0].output_kind, OutputKind::LayoutPreserved);
        assert_eq!(recent[0].source_hash.as_deref(), Some("aa11"));
        assert!(chrono::DateTime::parse_from_rfc3339(&recent[0].created_at).is_ok());
    }

    #[test]
    fn records_are_scoped_to_the_user() {
        let history = make_history();
        history.record(&rewrite_for("jane@example.com", "mine")).unwrap();
        history.record(&rewrite_for("sam@example.com", "theirs")).unwrap();

        let recent = history.recent_for_user("sam@example.com", 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].job_description, "theirs");
    }

    #[test]
    fn blank_email_returns_nothing() {
        let history = make_history();
        history.record(&rewrite_for("jane@example.com", "job")).unwrap();
        assert!(history.recent_for_user("  ", 10).unwrap().is_empty());
    }

    #[test]
    fn reports_have_no_source_hash() {
        let history = make_history();
        history
            .record(&NewRecord {
                output_kind: OutputKind::Report,
                source_hash: None,
                ..rewrite_for("jane@example.com", "feedback")
            })
            .unwrap();
        let recent = history.recent_for_user("jane@example.com", 1).unwrap();
        assert_eq!(recent[0].output_kind, OutputKind::Report);
        assert!(recent[0].source_hash.is_none());
    }

    #[test]
    fn file_backed_history_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let history = ProcessHistory::open(&path).unwrap();
            history.record(&rewrite_for("jane@example.com", "persisted")).unwrap();
        }
        let reopened = ProcessHistory::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
