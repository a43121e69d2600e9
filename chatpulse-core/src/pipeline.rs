//! End-to-end analysis of one transcript
//!
//! bytes → lines → [`TranscriptParser`] → [`IdentityMerger`] →
//! [`StatisticsAggregator`] → [`Report`]
//!
//! Each call builds fresh parser and merger state; only the configuration is
//! shared, so independent analyses can run concurrently.

use chrono::NaiveDateTime;

use crate::analytics::{ParseSummary, StatisticsAggregator};
use crate::config::GroupConfig;
use crate::error::Result;
use crate::ingest::{self, TranscriptParser};
use crate::merge::IdentityMerger;
use crate::types::Report;

/// Result of analysing a transcript.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: Report,
    pub summary: ParseSummary,
    /// Non-fatal parse problems
    pub warnings: Vec<String>,
}

/// Runs the parse → merge → aggregate pipeline.
pub struct Analyser<'c> {
    config: &'c GroupConfig,
    reference_time: Option<NaiveDateTime>,
}

impl<'c> Analyser<'c> {
    pub fn new(config: &'c GroupConfig) -> Self {
        Self {
            config,
            reference_time: None,
        }
    }

    /// Measure time in chat up to `now` instead of the current time.
    pub fn with_reference_time(mut self, now: NaiveDateTime) -> Self {
        self.reference_time = Some(now);
        self
    }

    /// Analyse raw transcript bytes.
    pub fn analyse(&self, content: Vec<u8>) -> Result<Analysis> {
        let text = ingest::decode(content)?;
        self.analyse_text(&text)
    }

    /// Analyse already-decoded transcript text.
    pub fn analyse_text(&self, text: &str) -> Result<Analysis> {
        let lines = ingest::to_lines(text);

        let parsed = TranscriptParser::new(self.config)?.parse(lines.iter().copied());
        let summary = ParseSummary::from_output(&parsed);
        summary.log();
        for warning in &parsed.warnings {
            tracing::warn!("{}", warning);
        }

        let merged = IdentityMerger::new(self.config).merge(
            &parsed.messages,
            &parsed.activity_logs,
            &parsed.joined_at,
        );

        let aggregator = match self.reference_time {
            Some(now) => StatisticsAggregator::with_reference_time(self.config, now),
            None => StatisticsAggregator::new(self.config),
        };
        let report = aggregator.aggregate(&merged, &parsed.media, &parsed.media_totals);

        tracing::info!(
            members = report.member_count,
            messages = report.messages,
            "Report assembled"
        );

        Ok(Analysis {
            report,
            summary,
            warnings: parsed.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AliasTable;

    fn now() -> NaiveDateTime {
        crate::logging::init_test();
        NaiveDateTime::parse_from_str("2024-02-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_two_line_scenario() {
        let config = GroupConfig::default();
        let analysis = Analyser::new(&config)
            .with_reference_time(now())
            .analyse(b"[1/2/24, 09:00:00] Alice: hi\n[1/2/24, 09:00:05] Bob: image omitted".to_vec())
            .unwrap();

        let report = &analysis.report;
        assert_eq!(report.images, 1);
        assert_eq!(report.members["alice"].messages, 1);
        assert_eq!(report.members["bob"].images_sent, 1);
        assert_eq!(report.members["bob"].messages, 1);
        assert_eq!(report.messages, 2);
        assert_eq!(analysis.summary.matched_messages, 1);
    }

    #[test]
    fn test_aliases_merge_end_to_end() {
        let config = GroupConfig {
            aliases: AliasTable::from_pairs([("Alice", vec!["Alice Phone2"])]),
            ..Default::default()
        };
        let text = "[1/2/24, 09:00:00] Alice: a\n\
                    [1/2/24, 09:00:01] Alice: b\n\
                    [1/2/24, 09:00:02] Alice: c\n\
                    [1/2/24, 09:00:03] Alice Phone2: d\n\
                    [1/2/24, 09:00:04] Alice Phone2: e";

        let analysis = Analyser::new(&config)
            .with_reference_time(now())
            .analyse_text(text)
            .unwrap();

        assert_eq!(analysis.report.member_count, 1);
        assert_eq!(analysis.report.members["alice"].messages, 5);
    }

    #[test]
    fn test_names_with_same_key_keep_all_traffic() {
        let config = GroupConfig::default();
        let text = "[1/2/24, 09:00:00] Mary Jane: a\n\
                    [1/2/24, 09:00:01] Mary-Jane: b\n\
                    [1/2/24, 09:00:02] Bob: c";

        let report = Analyser::new(&config)
            .with_reference_time(now())
            .analyse_text(text)
            .unwrap()
            .report;

        assert_eq!(report.messages, 3);
        assert_eq!(report.member_count, 2);
        assert_eq!(report.members["mary_jane"].messages, 2);
        let sum: f64 = report.members.values().map(|m| m.percentage_share).sum();
        assert!((sum - 100.0).abs() < 0.05, "sum was {sum}");
    }

    #[test]
    fn test_empty_transcript_is_valid() {
        let config = GroupConfig::default();
        let analysis = Analyser::new(&config).analyse(Vec::new()).unwrap();

        assert_eq!(analysis.report.messages, 0);
        assert_eq!(analysis.report.member_count, 0);
        assert!(analysis.report.members.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let config = GroupConfig::default();
        assert!(Analyser::new(&config).analyse(vec![0xc3, 0x28]).is_err());
    }
}
