//! Readability scoring per (person, direction).
//!
//! Text statistics are accumulated across every message a person sent or
//! received, and the Flesch-Kincaid grade level is computed once per
//! accumulated bucket:
//!
//! ```text
//! grade = 0.39 * (words / sentences) + 11.8 * (syllables / words) - 15.59
//! ```

use crate::content::{self, BodyContent};
use crate::db::MessageBodyRow;
use crate::types::{Direction, PersonId, ReadabilityLookup, ReadabilityRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;

// ============================================
// Text statistics
// ============================================

fn is_vowel(c: char) -> bool {
    matches!(
        c,
        'a' | 'e' | 'i' | 'o' | 'u' | 'y' | 'A' | 'E' | 'I' | 'O' | 'U' | 'Y'
    )
}

/// Count vowel runs in a word, with a floor of one.
pub fn count_syllables(word: &str) -> u64 {
    let mut count = 0;
    let mut last_was_vowel = false;
    for c in word.chars() {
        let vowel = is_vowel(c);
        if vowel && !last_was_vowel {
            count += 1;
        }
        last_was_vowel = vowel;
    }
    count.max(1)
}

/// Non-empty segments after splitting on `.`, `!`, `?` and newline.
pub fn count_sentences(text: &str) -> u64 {
    text.split(&['.', '!', '?', '\n'][..])
        .filter(|segment| !segment.trim().is_empty())
        .count() as u64
}

/// Word, syllable and sentence tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStats {
    pub words: u64,
    pub syllables: u64,
    pub sentences: u64,
}

impl TextStats {
    /// Tally one piece of already-cleaned text.
    pub fn of(text: &str) -> Self {
        let (words, syllables) = text
            .split_whitespace()
            .fold((0, 0), |(w, s), word| (w + 1, s + count_syllables(word)));
        Self {
            words,
            syllables,
            sentences: count_sentences(text),
        }
    }

    /// Grade level, or `None` when there are no words or no sentences.
    pub fn grade_level(&self) -> Option<f64> {
        flesch_kincaid_grade(self.words, self.sentences, self.syllables)
    }
}

impl AddAssign for TextStats {
    fn add_assign(&mut self, rhs: Self) {
        self.words += rhs.words;
        self.syllables += rhs.syllables;
        self.sentences += rhs.sentences;
    }
}

/// Flesch-Kincaid grade level; `None` guards the divisions.
pub fn flesch_kincaid_grade(words: u64, sentences: u64, syllables: u64) -> Option<f64> {
    if words == 0 || sentences == 0 {
        return None;
    }
    let (w, t, s) = (words as f64, sentences as f64, syllables as f64);
    Some(0.39 * (w / t) + 11.8 * (s / w) - 15.59)
}

// ============================================
// Accumulation
// ============================================

/// What happened to the body rows fed into scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BodyScanStats {
    /// Rows whose text contributed to a bucket
    pub scored: usize,
    /// Attachment-only rows, excluded
    pub attachment_only: usize,
    /// Rows with no usable content, excluded
    pub empty: usize,
    /// Rows whose blob failed both decoders, skipped
    pub decode_failures: usize,
}

/// Running text statistics keyed by (person, direction).
#[derive(Debug, Default)]
pub struct ReadabilityAccumulator {
    buckets: BTreeMap<(PersonId, Direction), TextStats>,
    scan: BodyScanStats,
}

impl ReadabilityAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add cleaned text for one message.
    pub fn add_text(&mut self, person: &str, direction: Direction, text: &str) {
        *self
            .buckets
            .entry((person.to_string(), direction))
            .or_default() += TextStats::of(text);
    }

    /// Resolve a body row and fold its text in, skipping rows without prose.
    pub fn add_row(&mut self, row: &MessageBodyRow) {
        match content::extract(row) {
            Ok(BodyContent::Text(text)) => {
                self.add_text(&row.person, row.direction, &text);
                self.scan.scored += 1;
            }
            Ok(BodyContent::AttachmentOnly) => self.scan.attachment_only += 1,
            Ok(BodyContent::Empty) => self.scan.empty += 1,
            Err(e) => {
                self.scan.decode_failures += 1;
                tracing::debug!(person = %row.person, error = %e, "Skipping undecodable message body");
            }
        }
    }

    pub fn scan_stats(&self) -> BodyScanStats {
        self.scan
    }

    /// One record per bucket with words and sentences, ordered by (person, direction).
    pub fn finish(self) -> (Vec<ReadabilityRecord>, BodyScanStats) {
        let records = self
            .buckets
            .into_iter()
            .filter_map(|((person, direction), stats)| {
                stats.grade_level().map(|score| ReadabilityRecord {
                    person,
                    direction,
                    words: stats.words,
                    syllables: stats.syllables,
                    sentences: stats.sentences,
                    score,
                })
            })
            .collect();
        (records, self.scan)
    }
}

/// Score a batch of body rows.
pub fn score_bodies<'a, I>(rows: I) -> (Vec<ReadabilityRecord>, BodyScanStats)
where
    I: IntoIterator<Item = &'a MessageBodyRow>,
{
    let mut acc = ReadabilityAccumulator::new();
    for row in rows {
        acc.add_row(row);
    }
    let (records, scan) = acc.finish();
    if scan.decode_failures > 0 {
        tracing::warn!(
            failures = scan.decode_failures,
            "Some message bodies could not be decoded"
        );
    }
    (records, scan)
}

// ============================================
// Rankings
// ============================================

/// Ranking sizes and the word floor for top/bottom lists.
#[derive(Debug, Clone, Copy)]
pub struct RankingOptions {
    pub min_words: u64,
    pub ranking_size: usize,
    pub prolific_size: usize,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            min_words: 50,
            ranking_size: 5,
            prolific_size: 10,
        }
    }
}

impl From<&crate::config::AnalyticsConfig> for RankingOptions {
    fn from(config: &crate::config::AnalyticsConfig) -> Self {
        Self {
            min_words: config.min_ranking_words,
            ranking_size: config.ranking_size,
            prolific_size: config.prolific_size,
        }
    }
}

/// Ranked lists for a single direction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectionRankings {
    /// Highest grade level first, word floor applied
    pub top: Vec<ReadabilityRecord>,
    /// Lowest grade level first, word floor applied
    pub bottom: Vec<ReadabilityRecord>,
    /// Most words first, no floor
    pub most_prolific: Vec<ReadabilityRecord>,
}

/// Rankings for both directions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Rankings {
    pub incoming: DirectionRankings,
    pub outgoing: DirectionRankings,
}

impl Rankings {
    /// Rank records. Sorts are stable, so ties keep record order.
    pub fn compute(records: &[ReadabilityRecord], options: &RankingOptions) -> Self {
        Self {
            incoming: rank_direction(records, Direction::Incoming, options),
            outgoing: rank_direction(records, Direction::Outgoing, options),
        }
    }

    pub fn for_direction(&self, direction: Direction) -> &DirectionRankings {
        match direction {
            Direction::Incoming => &self.incoming,
            Direction::Outgoing => &self.outgoing,
        }
    }
}

fn rank_direction(
    records: &[ReadabilityRecord],
    direction: Direction,
    options: &RankingOptions,
) -> DirectionRankings {
    let in_direction: Vec<&ReadabilityRecord> =
        records.iter().filter(|r| r.direction == direction).collect();

    let mut eligible: Vec<&ReadabilityRecord> = in_direction
        .iter()
        .copied()
        .filter(|r| r.words >= options.min_words)
        .collect();

    eligible.sort_by(|a, b| b.score.total_cmp(&a.score));
    let top = eligible
        .iter()
        .take(options.ranking_size)
        .map(|r| (*r).clone())
        .collect();

    eligible.sort_by(|a, b| a.score.total_cmp(&b.score));
    let bottom = eligible
        .iter()
        .take(options.ranking_size)
        .map(|r| (*r).clone())
        .collect();

    let mut prolific = in_direction;
    prolific.sort_by(|a, b| b.words.cmp(&a.words));
    let most_prolific = prolific
        .into_iter()
        .take(options.prolific_size)
        .cloned()
        .collect();

    DirectionRankings {
        top,
        bottom,
        most_prolific,
    }
}

// ============================================
// Report
// ============================================

/// Records, the per-person lookup, and rankings derived from one load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadabilityReport {
    pub records: Vec<ReadabilityRecord>,
    pub lookup: ReadabilityLookup,
    pub rankings: Rankings,
    pub scan: BodyScanStats,
}

impl ReadabilityReport {
    pub fn build(
        records: Vec<ReadabilityRecord>,
        scan: BodyScanStats,
        options: &RankingOptions,
    ) -> Self {
        let mut lookup = ReadabilityLookup::new();
        for record in &records {
            lookup
                .entry(record.person.clone())
                .or_default()
                .insert(record.direction, record.clone());
        }
        let rankings = Rankings::compute(&records, options);
        Self {
            records,
            lookup,
            rankings,
            scan,
        }
    }

    /// Record for a person and direction, if one was emitted.
    pub fn get(&self, person: &str, direction: Direction) -> Option<&ReadabilityRecord> {
        self.lookup.get(person).and_then(|d| d.get(&direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syllable_counts() {
        assert_eq!(count_syllables("queue"), 1);
        assert_eq!(count_syllables("beautiful"), 3);
        assert_eq!(count_syllables("rhythm"), 1);
        assert_eq!(count_syllables("hmm"), 1);
        assert_eq!(count_syllables(""), 1);
        assert_eq!(count_syllables("AEIOU"), 1);
        assert_eq!(count_syllables("banana"), 3);
    }

    #[test]
    fn test_sentence_count_ignores_blank_segments() {
        assert_eq!(count_sentences("Hi. How are you?? Fine!\n\n ok"), 4);
        assert_eq!(count_sentences("..."), 0);
        assert_eq!(count_sentences("no terminator"), 1);
    }

    #[test]
    fn test_text_stats() {
        let stats = TextStats::of("The cat sat. It was happy!");
        assert_eq!(stats.words, 6);
        assert_eq!(stats.sentences, 2);
        // the cat sat it was hap-py
        assert_eq!(stats.syllables, 7);
    }

    #[test]
    fn test_grade_level_formula() {
        let grade = flesch_kincaid_grade(100, 5, 150).unwrap();
        assert!((grade - 9.92).abs() < 1e-9);
    }

    #[test]
    fn test_grade_level_guards_zero() {
        assert!(flesch_kincaid_grade(0, 3, 0).is_none());
        assert!(flesch_kincaid_grade(10, 0, 12).is_none());
    }

    #[test]
    fn test_score_computed_on_accumulated_totals() {
        let mut acc = ReadabilityAccumulator::new();
        acc.add_text("alice", Direction::Outgoing, "Short one.");
        acc.add_text(
            "alice",
            Direction::Outgoing,
            "Considerably elaborate vocabulary appears here.",
        );
        let (records, _) = acc.finish();
        assert_eq!(records.len(), 1);

        let r = &records[0];
        let mut combined = TextStats::of("Short one.");
        combined += TextStats::of("Considerably elaborate vocabulary appears here.");
        assert_eq!(r.words, combined.words);
        assert_eq!(r.sentences, combined.sentences);
        assert_eq!(r.score, combined.grade_level().unwrap());
    }

    #[test]
    fn test_buckets_without_sentences_are_not_emitted() {
        let mut acc = ReadabilityAccumulator::new();
        acc.add_text("bob", Direction::Incoming, "   ");
        acc.add_text("carol", Direction::Incoming, "fine");
        let (records, _) = acc.finish();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].person, "carol");
    }

    #[test]
    fn test_add_row_tracks_skips() {
        let mut acc = ReadabilityAccumulator::new();
        let mut row = MessageBodyRow {
            person: "dave".into(),
            direction: Direction::Incoming,
            text: None,
            attributed_body: None,
            has_attachments: true,
        };
        acc.add_row(&row);
        row.has_attachments = false;
        acc.add_row(&row);
        row.attributed_body = Some(vec![1, 2, 3]);
        acc.add_row(&row);
        row.text = Some("Hello there.".into());
        acc.add_row(&row);

        let scan = acc.scan_stats();
        assert_eq!(scan.attachment_only, 1);
        assert_eq!(scan.empty, 1);
        assert_eq!(scan.decode_failures, 1);
        assert_eq!(scan.scored, 1);
    }

    fn record(person: &str, direction: Direction, words: u64, score: f64) -> ReadabilityRecord {
        ReadabilityRecord {
            person: person.to_string(),
            direction,
            words,
            syllables: words,
            sentences: 1,
            score,
        }
    }

    #[test]
    fn test_rankings_apply_word_floor() {
        let records = vec![
            record("a", Direction::Incoming, 49, 30.0),
            record("b", Direction::Incoming, 50, 4.0),
            record("c", Direction::Incoming, 200, 8.0),
            record("d", Direction::Incoming, 10, -3.0),
            record("e", Direction::Outgoing, 500, 1.0),
        ];
        let rankings = Rankings::compute(&records, &RankingOptions::default());

        let top: Vec<&str> = rankings.incoming.top.iter().map(|r| r.person.as_str()).collect();
        assert_eq!(top, vec!["c", "b"]);

        let bottom: Vec<&str> = rankings
            .incoming
            .bottom
            .iter()
            .map(|r| r.person.as_str())
            .collect();
        assert_eq!(bottom, vec!["b", "c"]);

        let prolific: Vec<&str> = rankings
            .incoming
            .most_prolific
            .iter()
            .map(|r| r.person.as_str())
            .collect();
        assert_eq!(prolific, vec!["c", "b", "a", "d"]);

        assert_eq!(rankings.outgoing.top.len(), 1);
    }

    #[test]
    fn test_rankings_truncate_and_keep_tie_order() {
        let records: Vec<_> = (0..12)
            .map(|i| record(&format!("p{:02}", i), Direction::Outgoing, 100, 5.0))
            .collect();
        let rankings = Rankings::compute(&records, &RankingOptions::default());

        assert_eq!(rankings.outgoing.top.len(), 5);
        assert_eq!(rankings.outgoing.bottom.len(), 5);
        assert_eq!(rankings.outgoing.most_prolific.len(), 10);
        assert_eq!(rankings.outgoing.top[0].person, "p00");
        assert_eq!(rankings.outgoing.bottom[4].person, "p04");
    }

    #[test]
    fn test_report_lookup() {
        let records = vec![
            record("a", Direction::Incoming, 60, 3.0),
            record("a", Direction::Outgoing, 70, 6.0),
        ];
        let report =
            ReadabilityReport::build(records, BodyScanStats::default(), &RankingOptions::default());
        assert_eq!(report.get("a", Direction::Outgoing).unwrap().score, 6.0);
        assert!(report.get("b", Direction::Incoming).is_none());
    }
}
