//! Read-only access to the message archive.

use super::queries;
use crate::error::{Error, Result};
use crate::types::{Direction, PersonId};
use chrono::NaiveDate;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};

/// One grouped row from a count query, before it is shaped into records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCountRow<B> {
    pub person: PersonId,
    pub bucket: B,
    pub direction_flag: i64,
    pub count: i64,
}

/// One candidate message body for readability scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBodyRow {
    pub person: PersonId,
    pub direction: Direction,
    pub text: Option<String>,
    pub attributed_body: Option<Vec<u8>>,
    pub has_attachments: bool,
}

/// Rows returned by a query plus how many were dropped as undecodable.
#[derive(Debug, Clone)]
pub struct QueryOutput<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

impl<T> QueryOutput<T> {
    fn collect<I>(iter: I, query: &'static str) -> Self
    where
        I: IntoIterator<Item = Result<T>>,
    {
        let mut rows = Vec::new();
        let mut skipped = 0;
        for item in iter {
            match item {
                Ok(row) => rows.push(row),
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(query, error = %e, "Skipping undecodable row");
                }
            }
        }
        if skipped > 0 {
            tracing::warn!(query, skipped, "Some archive rows could not be decoded");
        }
        Self { rows, skipped }
    }
}

/// Only a missing file is `ArchiveNotFound`; any other stat failure
/// (permissions, sandboxing) means the archive is there but unreadable.
fn metadata_error(path: &Path, err: &std::io::Error) -> Error {
    match err.kind() {
        std::io::ErrorKind::NotFound => Error::ArchiveNotFound(path.to_path_buf()),
        _ => Error::ArchiveUnreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    }
}

/// Handle to an open, read-only message archive
pub struct Archive {
    conn: Connection,
    path: PathBuf,
}

impl Archive {
    /// Open the archive at `path` without write access.
    ///
    /// Fails with [`Error::ArchiveNotFound`] when the file is absent and
    /// [`Error::ArchiveUnreadable`] when it cannot be opened or lacks the
    /// expected tables.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::metadata(path).map_err(|e| metadata_error(path, &e))?;

        let unreadable = |reason: String| Error::ArchiveUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unreadable(e.to_string()))?;

        // Opening is lazy; touching the schema surfaces permission and corruption errors.
        for table in queries::REQUIRED_TABLES {
            let present: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                    [table],
                    |row| row.get(0),
                )
                .map_err(|e| unreadable(e.to_string()))?;
            if !present {
                return Err(unreadable(format!("missing table `{}`", table)));
            }
        }

        tracing::info!(path = %path.display(), "Opened message archive read-only");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path this archive was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Message counts grouped by (person, local calendar day, direction).
    pub fn daily_counts(&self) -> Result<QueryOutput<RawCountRow<NaiveDate>>> {
        let mut stmt = self.conn.prepare(&queries::daily_counts_sql())?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let parsed = rows.map(|r| -> Result<RawCountRow<NaiveDate>> {
            let (person, day, direction_flag, count) = r?;
            let bucket = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map_err(|e| Error::RowDecode(format!("bad day {:?}: {}", day, e)))?;
            Ok(RawCountRow {
                person,
                bucket,
                direction_flag,
                count,
            })
        });

        Ok(QueryOutput::collect(parsed, "daily_counts"))
    }

    /// Message counts grouped by (person, local hour of day, direction).
    pub fn hourly_counts(&self) -> Result<QueryOutput<RawCountRow<u8>>> {
        let mut stmt = self.conn.prepare(&queries::hourly_counts_sql())?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let parsed = rows.map(|r| -> Result<RawCountRow<u8>> {
            let (person, hour, direction_flag, count) = r?;
            let bucket = u8::try_from(hour)
                .ok()
                .filter(|h| *h < 24)
                .ok_or_else(|| Error::RowDecode(format!("hour out of range: {}", hour)))?;
            Ok(RawCountRow {
                person,
                bucket,
                direction_flag,
                count,
            })
        });

        Ok(QueryOutput::collect(parsed, "hourly_counts"))
    }

    /// Candidate message bodies for readability scoring.
    pub fn message_bodies(&self) -> Result<QueryOutput<MessageBodyRow>> {
        let mut stmt = self.conn.prepare(queries::MESSAGE_BODIES_SQL)?;
        let rows = stmt.query_map([], Self::row_to_body)?;
        let parsed = rows.map(|r| r.map_err(Error::from));
        Ok(QueryOutput::collect(parsed, "message_bodies"))
    }

    fn row_to_body(row: &Row) -> rusqlite::Result<MessageBodyRow> {
        let flag: i64 = row.get(1)?;
        Ok(MessageBodyRow {
            person: row.get(0)?,
            direction: Direction::from_flag(flag),
            text: row.get(2)?,
            attributed_body: row.get(3)?,
            has_attachments: row.get::<_, Option<i64>>(4)?.unwrap_or(0) == 1,
        })
    }
}
