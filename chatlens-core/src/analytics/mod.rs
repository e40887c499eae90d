//! Analytics module for chatlens
//!
//! Provides the derived views over one archive load:
//! - Count aggregation into records and nested lookups ([`aggregate`])
//! - Readability scoring and rankings ([`readability`])
//! - Gap-filled exponential smoothing ([`smoothing`])
//! - Per-person chart series ([`series`])
//!
//! Everything here is a pure function of its inputs; the database is only
//! touched by [`crate::db`].

pub mod aggregate;
pub mod readability;
pub mod series;
pub mod smoothing;

pub use aggregate::{aggregate, Aggregation};
pub use readability::{
    count_sentences, count_syllables, flesch_kincaid_grade, score_bodies, BodyScanStats,
    DirectionRankings, RankingOptions, Rankings, ReadabilityAccumulator, ReadabilityReport,
    TextStats,
};
pub use series::{
    daily_series, hourly_series, smoothed_daily_series, top_daily_series, top_hourly_series,
    CountMetric, PersonSeries,
};
pub use smoothing::{ema, fill_daily_gaps, smooth, DEFAULT_ALPHA};
