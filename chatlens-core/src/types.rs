//! Core domain types for chatlens
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Archive** | The local message database (`chat.db`), opened read-only |
//! | **Handle** | A raw person identifier as stored by the archive (phone digits or email) |
//! | **Person** | The handle a record is keyed by; not guaranteed unique per human |
//! | **Direction** | Whether a message was sent by the account owner or received |
//! | **Bucket** | The time grouping of a count: a local calendar day or a local hour-of-day |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A person identifier as stored in the archive's `handle` table.
pub type PersonId = String;

// ============================================
// Direction
// ============================================

/// Whether a message was received or sent by the account owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    /// Map the archive's `is_from_me` flag: 1 is outgoing, anything else incoming.
    pub fn from_flag(flag: i64) -> Self {
        if flag == 1 {
            Direction::Outgoing
        } else {
            Direction::Incoming
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }

    pub const ALL: [Direction; 2] = [Direction::Incoming, Direction::Outgoing];
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Count records
// ============================================

/// Message count for one (person, bucket, direction) group.
///
/// `B` is the bucket type: [`NaiveDate`] for daily counts, `u8` (0-23) for
/// hourly counts. Counts are always at least 1 since empty groups are never
/// produced by the archive query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRecord<B> {
    pub person: PersonId,
    pub bucket: B,
    pub direction: Direction,
    pub count: u64,
}

/// Count per local calendar day.
pub type DailyCountRecord = CountRecord<NaiveDate>;

/// Count per local hour of day (0-23).
pub type HourlyCountRecord = CountRecord<u8>;

/// Incoming and outgoing counts for a single lookup cell.
///
/// An absent direction reads as zero, which is not the same as the
/// aggregator emitting a zero-count record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionCounts {
    pub incoming: u64,
    pub outgoing: u64,
}

impl DirectionCounts {
    pub fn get(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Incoming => self.incoming,
            Direction::Outgoing => self.outgoing,
        }
    }

    /// Set a direction, returning the previous value.
    pub fn set(&mut self, direction: Direction, count: u64) -> u64 {
        let slot = match direction {
            Direction::Incoming => &mut self.incoming,
            Direction::Outgoing => &mut self.outgoing,
        };
        std::mem::replace(slot, count)
    }

    pub fn total(&self) -> u64 {
        self.incoming + self.outgoing
    }
}

/// person -> bucket -> direction -> count
pub type CountLookup<B> = BTreeMap<PersonId, BTreeMap<B, DirectionCounts>>;

/// person -> day -> direction -> count
pub type DailyLookup = CountLookup<NaiveDate>;

/// person -> hour -> direction -> count
pub type HourlyLookup = CountLookup<u8>;

// ============================================
// Readability
// ============================================

/// Accumulated readability metrics for one (person, direction).
///
/// Only emitted when both `words` and `sentences` are non-zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadabilityRecord {
    pub person: PersonId,
    pub direction: Direction,
    pub words: u64,
    pub syllables: u64,
    pub sentences: u64,
    /// Flesch-Kincaid grade level
    pub score: f64,
}

/// person -> direction -> record
pub type ReadabilityLookup = BTreeMap<PersonId, BTreeMap<Direction, ReadabilityRecord>>;

// ============================================
// Series
// ============================================

/// One point of a time-indexed series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint<T> {
    pub at: T,
    pub value: f64,
}

impl<T> SeriesPoint<T> {
    pub fn new(at: T, value: f64) -> Self {
        Self { at, value }
    }
}
