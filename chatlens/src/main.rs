//! chatlens - who you text, when, and how you write
//!
//! Reads the local message archive once (never writing to it) and prints
//! per-contact volume, smoothed daily activity, hour-of-day patterns and
//! readability rankings.

use anyhow::{Context, Result};
use chatlens_core::analytics::{daily_series, hourly_series, DirectionRankings};
use chatlens_core::contacts::VCardSource;
use chatlens_core::{
    ArchiveSnapshot, Config, CountMetric, Direction, HandleResolver, LoadSummary, MessageStore,
    RankingOptions, SeriesPoint,
};
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "chatlens")]
#[command(about = "Message archive analytics: volume, timing and readability per contact")]
#[command(version)]
struct Args {
    /// Path to chat.db (default: config value or ~/Library/Messages/chat.db)
    #[arg(long)]
    archive: Option<PathBuf>,

    /// vCard export used to resolve handles to names
    #[arg(long)]
    contacts: Option<PathBuf>,

    /// Metric for series views (incoming, outgoing, total, net-incoming, net-outgoing)
    #[arg(long, default_value = "total")]
    metric: CountMetric,

    /// Number of contacts shown in each list
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    limit: Option<usize>,

    /// Show detail for a single handle
    #[arg(long)]
    person: Option<String>,

    /// Export format (json = JSON)
    #[arg(long)]
    export: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = match chatlens_core::logging::init(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!(
                "warning: logging disabled ({}): {e}",
                Config::log_path().display()
            );
            None
        }
    };

    let archive_path = args.archive.clone().unwrap_or_else(|| config.archive_path());
    let limit = args.limit.unwrap_or(config.analytics.series_limit);

    // Names are best-effort; the load never waits on them
    let resolver = HandleResolver::new();
    let contacts_build = args
        .contacts
        .clone()
        .or_else(|| config.contacts.vcard_path.clone())
        .map(|path| resolver.spawn_index_build(Arc::new(VCardSource::new(path))));

    let store = MessageStore::new(RankingOptions::from(&config.analytics));
    let summary = store
        .spawn_load(archive_path.clone())
        .await
        .context("archive load task failed")?
        .with_context(|| format!("failed to load archive at {}", archive_path.display()))?;

    if let Some(build) = contacts_build {
        match build.await {
            Ok(Ok(keys)) => tracing::debug!(keys, "Contacts ready"),
            Ok(Err(e)) => eprintln!("warning: contacts unavailable: {}", e),
            Err(e) => eprintln!("warning: contacts task failed: {}", e),
        }
    }

    let snapshot = store
        .snapshot()
        .context("load finished without publishing a snapshot")?;

    let report = Report::build(
        &snapshot,
        &summary,
        &resolver,
        args.metric,
        config.analytics.smoothing_alpha,
        limit,
    );

    if resolver.is_ready() && resolver.unmatched_count() > 0 {
        tracing::warn!(
            unmatched = resolver.unmatched_count(),
            "Some handles matched no contact and are shown raw"
        );
    }

    match (args.export.as_deref(), args.person.as_deref()) {
        (Some("json"), None) => println!("{}", serde_json::to_string_pretty(&report)?),
        (Some("json"), Some(person)) => {
            let detail = PersonDetail::build(&snapshot, &resolver, person, args.metric);
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        (Some(other), _) => anyhow::bail!("Unknown export format: {}. Use 'json'", other),
        (None, Some(person)) => {
            print_person(&PersonDetail::build(&snapshot, &resolver, person, args.metric))
        }
        (None, None) => print_terminal(&report),
    }

    Ok(())
}

// ============================================
// Report model
// ============================================

#[derive(Debug, Serialize)]
struct ContactTotals {
    name: String,
    handle: String,
    incoming: u64,
    outgoing: u64,
}

#[derive(Debug, Serialize)]
struct SeriesSummary {
    name: String,
    handle: String,
    /// Sum of the smoothed (daily) or raw (hourly) values
    total: f64,
    peak_at: String,
    peak: f64,
}

#[derive(Debug, Serialize)]
struct RankedScore {
    name: String,
    handle: String,
    words: u64,
    score: f64,
}

#[derive(Debug, Serialize)]
struct DirectionReport {
    top: Vec<RankedScore>,
    bottom: Vec<RankedScore>,
    most_prolific: Vec<RankedScore>,
}

#[derive(Debug, Serialize)]
struct Report {
    summary: LoadSummary,
    metric: CountMetric,
    contacts: Vec<ContactTotals>,
    daily: Vec<SeriesSummary>,
    hourly: Vec<SeriesSummary>,
    incoming_readability: DirectionReport,
    outgoing_readability: DirectionReport,
}

impl Report {
    fn build(
        snapshot: &ArchiveSnapshot,
        summary: &LoadSummary,
        resolver: &HandleResolver,
        metric: CountMetric,
        alpha: f64,
        limit: usize,
    ) -> Self {
        let mut contacts: Vec<ContactTotals> = snapshot
            .person_totals()
            .into_iter()
            .map(|(handle, totals)| ContactTotals {
                name: resolver.resolve(&handle),
                handle,
                incoming: totals.incoming,
                outgoing: totals.outgoing,
            })
            .collect();
        contacts.sort_by(|a, b| (b.incoming + b.outgoing).cmp(&(a.incoming + a.outgoing)));
        contacts.truncate(limit);

        let daily = snapshot
            .top_daily_series(metric, alpha, limit)
            .into_iter()
            .map(|s| {
                let peak = s.points.iter().max_by(|a, b| a.value.total_cmp(&b.value));
                SeriesSummary {
                    name: resolver.resolve(&s.person),
                    peak_at: peak.map(|p| p.at.to_string()).unwrap_or_default(),
                    peak: peak.map(|p| p.value).unwrap_or(0.0),
                    total: s.total,
                    handle: s.person,
                }
            })
            .collect();

        let hourly = snapshot
            .top_hourly_series(metric, limit)
            .into_iter()
            .map(|s| {
                let peak = s.points.iter().max_by(|a, b| a.value.total_cmp(&b.value));
                SeriesSummary {
                    name: resolver.resolve(&s.person),
                    peak_at: peak.map(|p| format!("{:02}:00", p.at)).unwrap_or_default(),
                    peak: peak.map(|p| p.value).unwrap_or(0.0),
                    total: s.total,
                    handle: s.person,
                }
            })
            .collect();

        let rankings = &snapshot.readability.rankings;
        Self {
            summary: *summary,
            metric,
            contacts,
            daily,
            hourly,
            incoming_readability: DirectionReport::build(
                rankings.for_direction(Direction::Incoming),
                resolver,
            ),
            outgoing_readability: DirectionReport::build(
                rankings.for_direction(Direction::Outgoing),
                resolver,
            ),
        }
    }
}

impl DirectionReport {
    fn build(rankings: &DirectionRankings, resolver: &HandleResolver) -> Self {
        let ranked = |records: &[chatlens_core::ReadabilityRecord]| {
            records
                .iter()
                .map(|r| RankedScore {
                    name: resolver.resolve(&r.person),
                    handle: r.person.clone(),
                    words: r.words,
                    score: r.score,
                })
                .collect::<Vec<_>>()
        };
        Self {
            top: ranked(&rankings.top),
            bottom: ranked(&rankings.bottom),
            most_prolific: ranked(&rankings.most_prolific),
        }
    }
}

#[derive(Debug, Serialize)]
struct PersonDetail {
    name: String,
    handle: String,
    incoming: u64,
    outgoing: u64,
    /// Raw (unsmoothed) metric value per local day with messages
    daily: Vec<SeriesPoint<NaiveDate>>,
    /// Hour of day (0-23) -> metric value
    hourly: Vec<f64>,
    incoming_grade: Option<f64>,
    outgoing_grade: Option<f64>,
}

impl PersonDetail {
    fn build(
        snapshot: &ArchiveSnapshot,
        resolver: &HandleResolver,
        handle: &str,
        metric: CountMetric,
    ) -> Self {
        let totals = snapshot
            .person_totals()
            .into_iter()
            .find(|(person, _)| person == handle)
            .map(|(_, totals)| totals)
            .unwrap_or_default();
        let grade = |direction| {
            snapshot
                .readability
                .get(handle, direction)
                .map(|r| r.score)
        };

        Self {
            name: resolver.resolve(handle),
            handle: handle.to_string(),
            incoming: totals.incoming,
            outgoing: totals.outgoing,
            daily: daily_series(&snapshot.daily.lookup, handle, metric),
            hourly: hourly_series(&snapshot.hourly.lookup, handle, metric)
                .into_iter()
                .map(|p| p.value)
                .collect(),
            incoming_grade: grade(Direction::Incoming),
            outgoing_grade: grade(Direction::Outgoing),
        }
    }
}

// ============================================
// Terminal output
// ============================================

fn print_header(title: &str) {
    println!();
    println!("+{}+", "-".repeat(60));
    println!("|{:^60}|", title);
    println!("+{}+", "-".repeat(60));
    println!();
}

fn print_series(title: &str, series: &[SeriesSummary]) {
    if series.is_empty() {
        return;
    }
    println!("{}", title);
    for (i, s) in series.iter().enumerate() {
        println!(
            "   {:>2}. {:<28} total {:>9.1}   peak {:>7.1} at {}",
            i + 1,
            truncate(&s.name, 28),
            s.total,
            s.peak,
            s.peak_at
        );
    }
    println!();
}

fn print_ranking(title: &str, scores: &[RankedScore]) {
    if scores.is_empty() {
        return;
    }
    println!("   {}", title);
    for (i, s) in scores.iter().enumerate() {
        println!(
            "      {:>2}. {:<28} grade {:>5.1}   {:>7} words",
            i + 1,
            truncate(&s.name, 28),
            s.score,
            s.words
        );
    }
}

fn print_terminal(report: &Report) {
    print_header("MESSAGE ARCHIVE REPORT");

    if report.summary.persons == 0 {
        println!("  No messages found in the archive.");
        println!();
        return;
    }

    let s = &report.summary;
    println!("SUMMARY");
    println!(
        "   Contacts: {:<10} Daily records: {:<10} Loaded in {} ms",
        s.persons, s.daily_records, s.elapsed_ms
    );
    if s.skipped_rows > 0 || s.decode_failures > 0 {
        println!(
            "   Skipped rows: {}   Undecodable bodies: {}",
            s.skipped_rows, s.decode_failures
        );
    }
    println!();

    println!("TOP CONTACTS");
    for (i, c) in report.contacts.iter().enumerate() {
        println!(
            "   {:>2}. {:<28} in {:>7}   out {:>7}",
            i + 1,
            truncate(&c.name, 28),
            c.incoming,
            c.outgoing
        );
    }
    println!();

    print_series(
        &format!("DAILY ACTIVITY ({}, smoothed)", report.metric.label()),
        &report.daily,
    );
    print_series(
        &format!("HOUR OF DAY ({})", report.metric.label()),
        &report.hourly,
    );

    for (label, direction) in [
        ("READABILITY: RECEIVED", &report.incoming_readability),
        ("READABILITY: SENT", &report.outgoing_readability),
    ] {
        println!("{}", label);
        print_ranking("Highest grade", &direction.top);
        print_ranking("Lowest grade", &direction.bottom);
        print_ranking("Most words", &direction.most_prolific);
        println!();
    }
}

fn print_person(detail: &PersonDetail) {
    print_header(&detail.name);

    println!("   Handle:   {}", detail.handle);
    println!(
        "   Received: {:<10} Sent: {}",
        detail.incoming, detail.outgoing
    );
    let grade = |g: Option<f64>| g.map(|g| format!("{:.1}", g)).unwrap_or_else(|| "-".into());
    println!(
        "   Grade level received: {}   sent: {}",
        grade(detail.incoming_grade),
        grade(detail.outgoing_grade)
    );
    println!();

    println!("HOUR OF DAY");
    let max = detail.hourly.iter().cloned().fold(0.0_f64, f64::max);
    for (hour, value) in detail.hourly.iter().enumerate() {
        let width = if max > 0.0 {
            ((value.max(0.0) / max) * 40.0).round() as usize
        } else {
            0
        };
        println!("   {:02}:00 {:>7.0} {}", hour, value, "#".repeat(width));
    }
    println!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Alice", 10), "Alice");
        assert_eq!(truncate("Alexandria Ocasio", 10), "Alexand...");
    }

    #[test]
    fn test_args_parse_metric() {
        let args = Args::parse_from(["chatlens", "--metric", "net-incoming", "--limit", "3"]);
        assert_eq!(args.metric, CountMetric::NetIncoming);
        assert_eq!(args.limit, Some(3));
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(Args::try_parse_from(["chatlens", "--limit", "0"]).is_err());
    }
}
