//! Transcript parser
//!
//! Turns the lines of a WhatsApp export into per-identity message counts,
//! media tallies, activity logs and join dates.
//!
//! # Message boundaries
//!
//! A header line opens a new message and flushes the previous one. Lines
//! without a header are continuations and are folded into the open message
//! with a single space. Media placeholder lines sit outside this scheme: they
//! are tallied and never open, close or extend a message.
//!
//! # Error Handling
//!
//! - **Text before the first header**: flushed as a record without a header,
//!   counted in [`ParseOutput::unmatched_line_count`] and dropped.
//! - **Malformed date or time**: the message is counted as unmatched, a
//!   warning is recorded in [`ParseOutput::warnings`] and parsing continues.
//!
//! Nothing in a transcript is fatal to the parser.

use chrono::NaiveDateTime;

use crate::config::GroupConfig;
use crate::error::Result;
use crate::ingest::classify::{LineKind, TranscriptPatterns};
use crate::types::{
    ActivityLogs, DefaultMap, JoinDates, MediaCounts, MediaKind, MediaTally, MessageCounts,
};

/// Adder name WhatsApp uses when the exporting device added someone.
const SELF_ADDER: &str = "You";

/// Everything extracted from one transcript, keyed by raw identity.
#[derive(Debug, Default)]
pub struct ParseOutput {
    /// Text messages per sender. Media-only senders appear with a count of 0.
    pub messages: MessageCounts,
    /// Join/add events per identity, in transcript order
    pub activity_logs: ActivityLogs,
    /// Earliest join candidate per identity
    pub joined_at: JoinDates,
    /// Media placeholders per sender
    pub media: MediaCounts,
    /// Media placeholders across the whole transcript, attributed or not
    pub media_totals: MediaTally,
    /// Buffered records dropped because their header or timestamp did not parse
    pub unmatched_line_count: u64,
    /// Number of input lines
    pub total_lines: usize,
    /// Non-fatal problems encountered while parsing
    pub warnings: Vec<String>,
}

impl ParseOutput {
    /// Messages that parsed successfully.
    pub fn matched_messages(&self) -> u64 {
        self.messages.iter().map(|(_, count)| *count).sum()
    }
}

/// Parser for WhatsApp group transcripts.
///
/// Holds only compiled patterns and a reference to the group configuration;
/// every call to [`TranscriptParser::parse`] starts from fresh state.
pub struct TranscriptParser<'c> {
    config: &'c GroupConfig,
    patterns: TranscriptPatterns,
}

impl<'c> TranscriptParser<'c> {
    pub fn new(config: &'c GroupConfig) -> Result<Self> {
        Ok(Self {
            config,
            patterns: TranscriptPatterns::new(&config.invite_link_phrase)?,
        })
    }

    /// Parse a transcript in one pass.
    pub fn parse<'a, I>(&self, lines: I) -> ParseOutput
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = ParseState::new(self.config);
        let mut buffer = String::new();
        let mut current_user: Option<String> = None;

        for line in lines {
            state.total_lines += 1;

            match self.patterns.classify(line) {
                LineKind::Media { kind, sender } => {
                    if let Some(sender) = sender {
                        state.register(sender);
                    }
                    state.record_media(kind, sender.or(current_user.as_deref()));
                }
                LineKind::Header(header) => {
                    if !buffer.is_empty() {
                        self.flush(&mut state, &buffer);
                        buffer.clear();
                    }
                    buffer.push_str(line);
                    current_user = Some(header.sender.to_string());
                }
                LineKind::Continuation => {
                    buffer.push(' ');
                    buffer.push_str(line);
                }
            }
        }

        if !buffer.is_empty() {
            self.flush(&mut state, &buffer);
        }

        state.add_log_placeholders(self.config);
        state.finish()
    }

    /// Process one accumulated message.
    fn flush(&self, state: &mut ParseState, buffer: &str) {
        let message = buffer.trim();

        let Some(header) = self.patterns.header(message) else {
            state.unmatched_line_count += 1;
            tracing::debug!(record = %truncate(message), "Record without header skipped");
            return;
        };

        let Some(timestamp) = header.timestamp() else {
            state.unmatched_line_count += 1;
            state.warnings.push(format!(
                "Unparseable timestamp {:?} {:?} from {}; message skipped",
                header.date, header.time, header.sender
            ));
            tracing::debug!(
                date = header.date,
                time = header.time,
                sender = header.sender,
                "Message with malformed timestamp skipped"
            );
            return;
        };

        let body = message[header.end..].trim();
        let (date, time) = (header.date, header.time);

        if let Some((adder, addee)) = self.patterns.added(body) {
            let adder = if adder == SELF_ADDER {
                self.config.uploader_name.as_str()
            } else {
                adder
            };
            state.record_join(addee, format!("Added by {} on {} {}", adder, date, time), timestamp);
        }

        if let Some(addee) = self.patterns.was_added(body) {
            state.record_join(
                addee,
                format!("Added by {} on {} {}", self.config.uploader_name, date, time),
                timestamp,
            );
        }

        if let Some(joined) = self.patterns.joined_via_link(body) {
            state.record_join(joined, format!("Joined via link on {} {}", date, time), timestamp);
        }

        *state.messages.entry_or_default(header.sender) += 1;
    }
}

/// Mutable state of a single parse.
struct ParseState {
    messages: MessageCounts,
    logs: ActivityLogs,
    join_candidates: DefaultMap<Vec<NaiveDateTime>>,
    media: MediaCounts,
    media_totals: MediaTally,
    unmatched_line_count: u64,
    total_lines: usize,
    warnings: Vec<String>,
}

impl ParseState {
    fn new(config: &GroupConfig) -> Self {
        let mut logs = ActivityLogs::new();
        if !config.creator.is_empty() {
            logs.insert(config.creator.clone(), vec![config.created_entry()]);
        }

        Self {
            messages: MessageCounts::new(),
            logs,
            join_candidates: DefaultMap::new(),
            media: MediaCounts::new(),
            media_totals: MediaTally::default(),
            unmatched_line_count: 0,
            total_lines: 0,
            warnings: Vec::new(),
        }
    }

    /// Make `sender` a participant without counting a message.
    fn register(&mut self, sender: &str) {
        self.messages.entry_or_default(sender);
    }

    fn record_media(&mut self, kind: MediaKind, sender: Option<&str>) {
        self.media_totals.increment(kind);
        if let Some(sender) = sender {
            self.media.entry_or_default(sender).increment(kind);
        }
    }

    fn record_join(&mut self, user: &str, entry: String, at: NaiveDateTime) {
        self.logs.entry_or_default(user).push(entry);
        self.join_candidates.entry_or_default(user).push(at);
    }

    /// Give every participant without a log entry (or with an anomalous
    /// name) the creation-time placeholder, so that each one resolves to a
    /// join date. A participating creator already holds the seeded
    /// "Created chat on" entry and only gets the creation time as a
    /// join candidate.
    fn add_log_placeholders(&mut self, config: &GroupConfig) {
        for user in self.messages.keys() {
            let has_log = self.logs.get(user).is_some_and(|log| !log.is_empty());
            if !has_log || config.is_anomaly(user) {
                self.logs
                    .entry_or_default(user)
                    .insert(0, config.added_placeholder());
                self.join_candidates
                    .entry_or_default(user)
                    .push(config.created_at);
            } else if user == config.creator {
                self.join_candidates
                    .entry_or_default(user)
                    .push(config.created_at);
            }
        }
    }

    fn finish(self) -> ParseOutput {
        let joined_at: JoinDates = self
            .join_candidates
            .iter()
            .filter_map(|(user, dates)| dates.iter().min().map(|min| (user, *min)))
            .collect();

        ParseOutput {
            messages: self.messages,
            activity_logs: self.logs,
            joined_at,
            media: self.media,
            media_totals: self.media_totals,
            unmatched_line_count: self.unmatched_line_count,
            total_lines: self.total_lines,
            warnings: self.warnings,
        }
    }
}

/// First 80 characters of a record, for log output.
fn truncate(text: &str) -> &str {
    match text.char_indices().nth(80) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn group() -> GroupConfig {
        GroupConfig {
            group_name: "Hiking Club".to_string(),
            uploader_name: "Dana".to_string(),
            creator: "Dana".to_string(),
            created_at: date("2023-01-01 10:00:00"),
            ..Default::default()
        }
    }

    fn parse(config: &GroupConfig, text: &str) -> ParseOutput {
        TranscriptParser::new(config).unwrap().parse(text.lines())
    }

    #[test]
    fn test_header_and_media_lines() {
        let config = group();
        let out = parse(
            &config,
            "[1/2/24, 09:00:00] Alice: hi\n[1/2/24, 09:00:05] Bob: image omitted",
        );

        assert_eq!(out.messages.get_or_default("Alice"), 1);
        assert_eq!(out.messages.get_or_default("Bob"), 0);
        assert!(out.messages.contains_key("Bob"));
        assert_eq!(out.media_totals.get(MediaKind::Image), 1);
        assert_eq!(out.media.get_or_default("Bob").get(MediaKind::Image), 1);
        assert_eq!(out.media.get_or_default("Alice").total(), 0);
        assert_eq!(out.total_lines, 2);
        assert_eq!(out.unmatched_line_count, 0);
    }

    #[test]
    fn test_continuation_folds_into_message() {
        let config = group();
        let out = parse(
            &config,
            "[1/2/24, 09:00:00] Alice: first line\nsecond line\nthird line\n[1/2/24, 09:01:00] Bob: ok",
        );
        assert_eq!(out.messages.get_or_default("Alice"), 1);
        assert_eq!(out.messages.get_or_default("Bob"), 1);
        assert_eq!(out.matched_messages(), 2);
    }

    #[test]
    fn test_headerless_media_goes_to_current_user() {
        let config = group();
        let out = parse(
            &config,
            "[1/2/24, 09:00:00] Alice: look\nvideo omitted\n[1/2/24, 09:00:10] Bob: nice",
        );
        assert_eq!(out.media.get_or_default("Alice").get(MediaKind::Video), 1);
        assert_eq!(out.messages.get_or_default("Alice"), 1);
    }

    #[test]
    fn test_media_before_any_sender_counts_globally_only() {
        let config = group();
        let out = parse(&config, "GIF omitted\n[1/2/24, 09:00:00] Alice: hi");
        assert_eq!(out.media_totals.get(MediaKind::Gif), 1);
        assert!(out.media.is_empty());
    }

    #[test]
    fn test_media_line_does_not_split_message() {
        let config = group();
        let out = parse(
            &config,
            "[1/2/24, 09:00:00] Alice: start\naudio omitted\nstill alice",
        );
        assert_eq!(out.messages.get_or_default("Alice"), 1);
        assert_eq!(out.media_totals.get(MediaKind::VoiceNote), 1);
        assert_eq!(out.unmatched_line_count, 0);
    }

    #[test]
    fn test_text_before_first_header_is_unmatched() {
        let config = group();
        let out = parse(&config, "orphan text\n[1/2/24, 09:00:00] Alice: hi");
        assert_eq!(out.unmatched_line_count, 1);
        assert_eq!(out.messages.get_or_default("Alice"), 1);
    }

    #[test]
    fn test_malformed_timestamp_is_skipped_and_counted() {
        let config = group();
        let out = parse(
            &config,
            "[13/45/24, 09:00:00] Alice: bad date\n[1/2/24, 09:00:00] Bob: fine",
        );
        assert_eq!(out.unmatched_line_count, 1);
        assert!(!out.messages.contains_key("Alice"));
        assert_eq!(out.messages.get_or_default("Bob"), 1);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_added_events() {
        let config = group();
        let out = parse(
            &config,
            "[1/2/24, 09:00:00] Hiking Club: You added Bob Lee\n\
             [1/3/24, 10:00:00] Hiking Club: Carol added Eve\n\
             [1/4/24, 11:00:00] Hiking Club: Frank was added\n\
             [1/5/24, 12:00:00] Hiking Club: Grace joined using this group's invite link",
        );

        assert_eq!(
            out.activity_logs.get_or_default("Bob Lee"),
            vec!["Added by Dana on 1/2/24 09:00:00"]
        );
        assert_eq!(
            out.activity_logs.get_or_default("Eve"),
            vec!["Added by Carol on 1/3/24 10:00:00"]
        );
        assert_eq!(
            out.activity_logs.get_or_default("Frank"),
            vec!["Added by Dana on 1/4/24 11:00:00"]
        );
        assert_eq!(
            out.activity_logs.get_or_default("Grace"),
            vec!["Joined via link on 1/5/24 12:00:00"]
        );
        assert_eq!(out.joined_at.get("Eve"), Some(&date("2024-01-03 10:00:00")));
        assert_eq!(out.messages.get_or_default("Hiking Club"), 4);
    }

    #[test]
    fn test_join_date_is_earliest_candidate() {
        let config = group();
        let out = parse(
            &config,
            "[3/1/24, 09:00:00] Hiking Club: Carol added Eve\n\
             [1/1/24, 09:00:00] Hiking Club: Eve joined using this group's invite link\n\
             [4/1/24, 09:00:00] Eve: hello",
        );
        assert_eq!(out.activity_logs.get_or_default("Eve").len(), 2);
        assert_eq!(out.joined_at.get("Eve"), Some(&date("2024-01-01 09:00:00")));
    }

    #[test]
    fn test_placeholder_for_user_without_log() {
        let config = group();
        let out = parse(&config, "[1/2/24, 09:00:00] Alice: hi\n[1/2/24, 09:05:00] Alice: again");

        let log = out.activity_logs.get_or_default("Alice");
        assert_eq!(log, vec!["Added by Dana on or before 01/01/2023"]);
        assert_eq!(out.joined_at.get("Alice"), Some(&config.created_at));
    }

    #[test]
    fn test_placeholder_for_anomaly_goes_first() {
        let mut config = group();
        config.anomalies = vec!["Eve".to_string()];
        let out = parse(
            &config,
            "[1/2/24, 09:00:00] Hiking Club: Carol added Eve\n[1/3/24, 09:00:00] Eve: hi",
        );

        let log = out.activity_logs.get_or_default("Eve");
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], "Added by Dana on or before 01/01/2023");
        assert_eq!(out.joined_at.get("Eve"), Some(&config.created_at));
    }

    #[test]
    fn test_creator_log_is_seeded() {
        let config = group();
        let out = parse(&config, "[1/2/24, 09:00:00] Dana: welcome");
        assert_eq!(
            out.activity_logs.get_or_default("Dana"),
            vec!["Created chat on 01/01/2023 10:00:00 AM"]
        );
        // Seeded log means no placeholder, but the creation time still joins
        assert_eq!(out.joined_at.get("Dana"), Some(&config.created_at));
    }

    #[test]
    fn test_absent_creator_gets_no_join_date() {
        let config = group();
        let out = parse(&config, "[1/2/24, 09:00:00] Alice: hi");
        assert!(!out.messages.contains_key("Dana"));
        assert!(out.joined_at.get("Dana").is_none());
    }

    #[test]
    fn test_every_participant_has_log_and_join_date() {
        let config = group();
        let out = parse(
            &config,
            "[1/2/24, 09:00:00] Alice: hi\n[1/2/24, 09:00:05] Bob: image omitted\n[1/2/24, 09:01:00] Carol: yo\n[1/2/24, 09:02:00] Dana: welcome",
        );
        assert!(out.messages.contains_key("Dana"));
        for user in out.messages.keys() {
            assert!(!out.activity_logs.get_or_default(user).is_empty(), "{user}");
            assert!(out.joined_at.contains_key(user), "{user}");
        }
    }

    #[test]
    fn test_line_accounting() {
        let config = group();
        let text = "stray\n[1/2/24, 09:00:00] Alice: hi\nmore\n[1/2/24, 09:00:05] Bob: image omitted\n[1/2/24, 9:00:07] Carol: yo";
        let out = parse(&config, text);
        let media = out.media_totals.total();
        assert!(
            out.unmatched_line_count + out.matched_messages() + media <= out.total_lines as u64
        );
    }

    #[test]
    fn test_empty_transcript() {
        let config = group();
        let out = parse(&config, "");
        assert!(out.messages.is_empty());
        assert_eq!(out.total_lines, 0);
        assert_eq!(out.unmatched_line_count, 0);
    }
}
