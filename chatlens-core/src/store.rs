//! Snapshot store for archive loads.
//!
//! A [`MessageStore`] is constructed explicitly and handed to whatever
//! consumes the data. Each load runs every archive query, builds every
//! derived view, and only then publishes the result as one
//! [`ArchiveSnapshot`]. Readers holding an older `Arc<ArchiveSnapshot>`
//! keep seeing it unchanged; a failed load publishes nothing.

use crate::analytics::{
    aggregate, score_bodies, series, Aggregation, CountMetric, PersonSeries, RankingOptions,
    ReadabilityReport,
};
use crate::db::Archive;
use crate::error::Result;
use crate::types::DirectionCounts;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// Everything derived from one successful load.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSnapshot {
    pub daily: Aggregation<NaiveDate>,
    pub hourly: Aggregation<u8>,
    pub readability: ReadabilityReport,
    pub loaded_at: DateTime<Utc>,
}

impl ArchiveSnapshot {
    /// Per-person (incoming, outgoing) totals over the whole archive.
    pub fn person_totals(&self) -> Vec<(String, DirectionCounts)> {
        self.daily.person_totals()
    }

    pub fn top_daily_series(
        &self,
        metric: CountMetric,
        alpha: f64,
        limit: usize,
    ) -> Vec<PersonSeries<NaiveDate>> {
        series::top_daily_series(&self.daily.lookup, metric, alpha, limit)
    }

    pub fn top_hourly_series(&self, metric: CountMetric, limit: usize) -> Vec<PersonSeries<u8>> {
        series::top_hourly_series(&self.hourly.lookup, metric, limit)
    }

    /// The whole snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Counts describing a completed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub persons: usize,
    pub daily_records: usize,
    pub hourly_records: usize,
    pub readability_records: usize,
    /// Archive rows dropped as undecodable across all three queries
    pub skipped_rows: usize,
    /// Message bodies whose rich-text blob could not be decoded
    pub decode_failures: usize,
    pub elapsed_ms: u64,
}

/// Run every query against the archive at `path` and build a snapshot.
///
/// Pure with respect to the store: nothing is published here.
pub fn build_snapshot(
    path: &Path,
    options: &RankingOptions,
) -> Result<(ArchiveSnapshot, LoadSummary)> {
    let started = Instant::now();
    let archive = Archive::open(path)?;

    let daily_rows = archive.daily_counts()?;
    let hourly_rows = archive.hourly_counts()?;
    let bodies = archive.message_bodies()?;
    let skipped_rows = daily_rows.skipped + hourly_rows.skipped + bodies.skipped;

    let daily = aggregate(daily_rows.rows);
    let hourly = aggregate(hourly_rows.rows);
    let (records, scan) = score_bodies(&bodies.rows);
    let readability = ReadabilityReport::build(records, scan, options);

    let summary = LoadSummary {
        persons: daily.person_count(),
        daily_records: daily.records.len(),
        hourly_records: hourly.records.len(),
        readability_records: readability.records.len(),
        skipped_rows,
        decode_failures: scan.decode_failures,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    let snapshot = ArchiveSnapshot {
        daily,
        hourly,
        readability,
        loaded_at: Utc::now(),
    };

    Ok((snapshot, summary))
}

/// Holds the most recent successful [`ArchiveSnapshot`].
///
/// Cheap to clone; clones share the same slot.
#[derive(Clone, Default)]
pub struct MessageStore {
    current: Arc<RwLock<Option<Arc<ArchiveSnapshot>>>>,
    options: RankingOptions,
}

impl MessageStore {
    pub fn new(options: RankingOptions) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            options,
        }
    }

    pub fn options(&self) -> &RankingOptions {
        &self.options
    }

    /// The latest snapshot, or `None` before the first successful load.
    pub fn snapshot(&self) -> Option<Arc<ArchiveSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    /// Load the archive at `path` and publish the result.
    ///
    /// On failure the previous snapshot (if any) stays in place and the
    /// error is returned to the caller.
    pub fn load(&self, path: &Path) -> Result<LoadSummary> {
        tracing::info!(path = %path.display(), "Loading message archive");

        let (snapshot, summary) = match build_snapshot(path, &self.options) {
            Ok(built) => built,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    kept_previous = self.is_loaded(),
                    "Archive load failed"
                );
                return Err(e);
            }
        };

        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(snapshot));

        tracing::info!(
            persons = summary.persons,
            daily_records = summary.daily_records,
            hourly_records = summary.hourly_records,
            readability_records = summary.readability_records,
            skipped_rows = summary.skipped_rows,
            elapsed_ms = summary.elapsed_ms,
            "Archive load complete"
        );

        Ok(summary)
    }

    /// Run [`load`](Self::load) on a blocking task.
    pub fn spawn_load(&self, path: PathBuf) -> tokio::task::JoinHandle<Result<LoadSummary>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_empty_store() {
        let store = MessageStore::default();
        assert!(store.snapshot().is_none());
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_missing_archive_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = MessageStore::new(RankingOptions::default());

        let err = store.load(&dir.path().join("chat.db")).unwrap_err();
        assert!(matches!(err, Error::ArchiveNotFound(_)));
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_snapshot_json_keys() {
        let snapshot = ArchiveSnapshot {
            daily: Aggregation::default(),
            hourly: Aggregation::default(),
            readability: ReadabilityReport::default(),
            loaded_at: Utc::now(),
        };
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        for key in ["daily", "hourly", "readability", "loaded_at"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_spawn_load_reports_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not-a-db");
        std::fs::write(&path, b"definitely not sqlite").unwrap();

        let store = MessageStore::default();
        let result = store.spawn_load(path).await.unwrap();
        assert!(matches!(result, Err(Error::ArchiveUnreadable { .. })));
        assert!(!store.is_loaded());
    }
}
