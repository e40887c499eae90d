//! Per-person series views over the count lookups.
//!
//! These are what charts consume: a metric is read from each lookup cell,
//! daily series are gap-filled and smoothed, and persons are ranked by the
//! sum of their series.

use super::smoothing;
use crate::types::{DailyLookup, DirectionCounts, HourlyLookup, PersonId, SeriesPoint};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which number to read from a direction-count cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMetric {
    #[default]
    Incoming,
    Outgoing,
    Total,
    /// Incoming minus outgoing
    NetIncoming,
    /// Outgoing minus incoming
    NetOutgoing,
}

impl CountMetric {
    pub fn value(&self, counts: &DirectionCounts) -> f64 {
        let incoming = counts.incoming as f64;
        let outgoing = counts.outgoing as f64;
        match self {
            CountMetric::Incoming => incoming,
            CountMetric::Outgoing => outgoing,
            CountMetric::Total => incoming + outgoing,
            CountMetric::NetIncoming => incoming - outgoing,
            CountMetric::NetOutgoing => outgoing - incoming,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CountMetric::Incoming => "Incoming",
            CountMetric::Outgoing => "Outgoing",
            CountMetric::Total => "Total",
            CountMetric::NetIncoming => "Net Incoming",
            CountMetric::NetOutgoing => "Net Outgoing",
        }
    }
}

impl FromStr for CountMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(&['-', ' '][..], "_").as_str() {
            "incoming" => Ok(CountMetric::Incoming),
            "outgoing" => Ok(CountMetric::Outgoing),
            "total" => Ok(CountMetric::Total),
            "net_incoming" => Ok(CountMetric::NetIncoming),
            "net_outgoing" => Ok(CountMetric::NetOutgoing),
            other => Err(format!("unknown metric: {}", other)),
        }
    }
}

/// A labelled series for one person.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonSeries<T> {
    pub person: PersonId,
    pub points: Vec<SeriesPoint<T>>,
    /// Sum of `points`, used for ranking
    pub total: f64,
}

impl<T> PersonSeries<T> {
    fn new(person: PersonId, points: Vec<SeriesPoint<T>>) -> Self {
        let total = points.iter().map(|p| p.value).sum();
        Self {
            person,
            points,
            total,
        }
    }
}

/// Raw daily series for a person: one point per day present in the lookup.
pub fn daily_series(
    lookup: &DailyLookup,
    person: &str,
    metric: CountMetric,
) -> Vec<SeriesPoint<NaiveDate>> {
    lookup
        .get(person)
        .map(|days| {
            days.iter()
                .map(|(day, counts)| SeriesPoint::new(*day, metric.value(counts)))
                .collect()
        })
        .unwrap_or_default()
}

/// Hourly series for a person, dense over 0-23 with zeros for silent hours.
pub fn hourly_series(
    lookup: &HourlyLookup,
    person: &str,
    metric: CountMetric,
) -> Vec<SeriesPoint<u8>> {
    let hours = lookup.get(person);
    (0u8..24)
        .map(|hour| {
            let counts = hours
                .and_then(|h| h.get(&hour))
                .copied()
                .unwrap_or_default();
            SeriesPoint::new(hour, metric.value(&counts))
        })
        .collect()
}

/// Smoothed daily series for a person.
pub fn smoothed_daily_series(
    lookup: &DailyLookup,
    person: &str,
    metric: CountMetric,
    alpha: f64,
) -> Vec<SeriesPoint<NaiveDate>> {
    smoothing::smooth(&daily_series(lookup, person, metric), alpha)
}

fn keep_top<T>(mut series: Vec<PersonSeries<T>>, limit: usize) -> Vec<PersonSeries<T>> {
    series.sort_by(|a, b| b.total.total_cmp(&a.total));
    series.truncate(limit);
    series
}

/// The `limit` persons with the largest smoothed daily totals.
pub fn top_daily_series(
    lookup: &DailyLookup,
    metric: CountMetric,
    alpha: f64,
    limit: usize,
) -> Vec<PersonSeries<NaiveDate>> {
    let all = lookup
        .keys()
        .map(|person| {
            PersonSeries::new(
                person.clone(),
                smoothed_daily_series(lookup, person, metric, alpha),
            )
        })
        .collect();
    keep_top(all, limit)
}

/// The `limit` persons with the largest hourly totals.
pub fn top_hourly_series(
    lookup: &HourlyLookup,
    metric: CountMetric,
    limit: usize,
) -> Vec<PersonSeries<u8>> {
    let all = lookup
        .keys()
        .map(|person| PersonSeries::new(person.clone(), hourly_series(lookup, person, metric)))
        .collect();
    keep_top(all, limit)
}
