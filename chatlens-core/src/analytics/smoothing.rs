//! Exponential smoothing of daily count series.
//!
//! Missing days between the first and last point are filled with zero
//! before smoothing, and the running average is seeded with the first
//! day's raw value:
//!
//! ```text
//! ema[0] = value[0]
//! ema[i] = alpha * value[i] + (1 - alpha) * ema[i - 1]
//! ```
//!
//! The hourly series is never gap-filled here; it is dense over 0-23 by
//! construction (see [`super::series::hourly_series`]).

use crate::types::SeriesPoint;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Default decay constant for daily series.
pub const DEFAULT_ALPHA: f64 = 0.1;

/// EMA over an already dense sequence of values.
pub fn ema(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let (first, rest) = match values.split_first() {
        Some(split) => split,
        None => return out,
    };
    let mut prev = *first;
    out.push(prev);
    for value in rest {
        prev = alpha * value + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// Insert a zero point for every day missing between the first and last day.
///
/// Input order does not matter; duplicate days keep the last value.
pub fn fill_daily_gaps(series: &[SeriesPoint<NaiveDate>]) -> Vec<SeriesPoint<NaiveDate>> {
    let by_day: BTreeMap<NaiveDate, f64> = series.iter().map(|p| (p.at, p.value)).collect();
    let (first, last) = match (by_day.keys().next(), by_day.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let mut filled = Vec::new();
    let mut day = first;
    loop {
        filled.push(SeriesPoint::new(
            day,
            by_day.get(&day).copied().unwrap_or(0.0),
        ));
        if day >= last {
            break;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    filled
}

/// Gap-fill then smooth a daily series, one output point per day.
pub fn smooth(series: &[SeriesPoint<NaiveDate>], alpha: f64) -> Vec<SeriesPoint<NaiveDate>> {
    let filled = fill_daily_gaps(series);
    let values: Vec<f64> = filled.iter().map(|p| p.value).collect();
    filled
        .into_iter()
        .zip(ema(&values, alpha))
        .map(|(point, smoothed)| SeriesPoint::new(point.at, smoothed))
        .collect()
}
