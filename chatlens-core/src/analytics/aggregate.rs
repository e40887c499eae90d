//! Shapes grouped count rows into flat records and nested lookups.

use crate::db::RawCountRow;
use crate::types::{CountLookup, CountRecord, Direction, DirectionCounts};
use serde::Serialize;

/// Flat records plus the person -> bucket -> direction lookup derived from them.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregation<B: Ord> {
    pub records: Vec<CountRecord<B>>,
    pub lookup: CountLookup<B>,
    /// Rows that landed on an already-populated cell. Zero for any archive
    /// queried through [`crate::db::Archive`], whose GROUP BY makes keys unique.
    pub collisions: usize,
    /// Rows dropped because their count was not positive.
    pub dropped: usize,
}

impl<B: Ord> Default for Aggregation<B> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            lookup: CountLookup::new(),
            collisions: 0,
            dropped: 0,
        }
    }
}

impl<B: Ord + Copy> Aggregation<B> {
    /// Total messages for a person across every bucket and direction, read from the lookup.
    pub fn person_total(&self, person: &str) -> u64 {
        self.lookup
            .get(person)
            .map(|buckets| buckets.values().map(DirectionCounts::total).sum())
            .unwrap_or(0)
    }

    /// Per-person (incoming, outgoing) totals, read from the lookup.
    pub fn person_totals(&self) -> Vec<(String, DirectionCounts)> {
        self.lookup
            .iter()
            .map(|(person, buckets)| {
                let totals = buckets
                    .values()
                    .fold(DirectionCounts::default(), |acc, c| DirectionCounts {
                        incoming: acc.incoming + c.incoming,
                        outgoing: acc.outgoing + c.outgoing,
                    });
                (person.clone(), totals)
            })
            .collect()
    }

    /// Number of distinct persons.
    pub fn person_count(&self) -> usize {
        self.lookup.len()
    }
}

/// Turn raw `(person, bucket, flag, count)` rows into records and a lookup.
///
/// Flag 1 is outgoing, anything else incoming. On a key collision the later
/// row wins and the collision is counted.
pub fn aggregate<B, I>(rows: I) -> Aggregation<B>
where
    B: Ord + Copy,
    I: IntoIterator<Item = RawCountRow<B>>,
{
    let mut out = Aggregation::default();

    for row in rows {
        let count = match u64::try_from(row.count) {
            Ok(c) if c > 0 => c,
            _ => {
                out.dropped += 1;
                tracing::debug!(person = %row.person, count = row.count, "Dropping non-positive count");
                continue;
            }
        };
        let direction = Direction::from_flag(row.direction_flag);

        let previous = out
            .lookup
            .entry(row.person.clone())
            .or_default()
            .entry(row.bucket)
            .or_default()
            .set(direction, count);

        if previous != 0 {
            out.collisions += 1;
            tracing::warn!(person = %row.person, %direction, "Duplicate count group, keeping last");
            if let Some(existing) = out.records.iter_mut().find(|r| {
                r.person == row.person && r.bucket == row.bucket && r.direction == direction
            }) {
                existing.count = count;
                continue;
            }
        }

        out.records.push(CountRecord {
            person: row.person,
            bucket: row.bucket,
            direction,
            count,
        });
    }

    out
}
