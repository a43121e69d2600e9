//! Line classification for WhatsApp transcripts
//!
//! Every line falls into exactly one [`LineKind`]. The rules in [`RULES`] are
//! tried in order and the first that applies wins; a line no rule claims is a
//! continuation of the message being accumulated.
//!
//! Header lines look like:
//!
//! ```text
//! [1/2/24, 9:05:12 PM] Alice Smith: message text
//! ```

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::Result;
use crate::types::MediaKind;

/// Bracketed date/time prefix followed by a sender label and a colon.
const HEADER_PATTERN: &str =
    r"^\[(\d{1,2}/\d{1,2}/\d{2,4}), (\d{1,2}:\d{2}:\d{2})\s?([APM]*)\] (.*?):";

/// A capitalised name of one or more words.
const NAME_PATTERN: &str = r"[A-Z][a-zA-Z]+(?: [A-Z][a-zA-Z]+)*";

/// Parsed facet of a header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader<'a> {
    pub date: &'a str,
    pub time: &'a str,
    /// `AM`/`PM`, or empty for 24-hour exports
    pub meridiem: &'a str,
    pub sender: &'a str,
    /// Byte offset where the message body starts
    pub end: usize,
}

impl MessageHeader<'_> {
    /// Timestamp of the message, or `None` when the date or time is malformed.
    ///
    /// Two-digit years use `%y`, longer ones `%Y`. A meridiem marker switches
    /// the time to 12-hour parsing.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let year_digits = self.date.rsplit('/').next().map_or(0, str::len);
        let date_format = if year_digits <= 2 { "%m/%d/%y" } else { "%m/%d/%Y" };

        if self.meridiem.is_empty() {
            NaiveDateTime::parse_from_str(
                &format!("{} {}", self.date, self.time),
                &format!("{} %H:%M:%S", date_format),
            )
            .ok()
        } else {
            NaiveDateTime::parse_from_str(
                &format!("{} {} {}", self.date, self.time, self.meridiem),
                &format!("{} %I:%M:%S %p", date_format),
            )
            .ok()
        }
    }
}

/// Outcome of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Media placeholder. `sender` is set when the line carries its own header.
    Media {
        kind: MediaKind,
        sender: Option<&'a str>,
    },
    /// Start of a new message
    Header(MessageHeader<'a>),
    /// Part of the message currently being accumulated
    Continuation,
}

/// One classification rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Media(MediaKind),
    Header,
}

/// Classification rules in priority order.
///
/// Media markers come first so a placeholder line never opens or closes a
/// buffered message.
pub const RULES: [Rule; 6] = [
    Rule::Media(MediaKind::Image),
    Rule::Media(MediaKind::Video),
    Rule::Media(MediaKind::Gif),
    Rule::Media(MediaKind::Poll),
    Rule::Media(MediaKind::VoiceNote),
    Rule::Header,
];

/// Compiled transcript patterns.
#[derive(Debug, Clone)]
pub struct TranscriptPatterns {
    header: Regex,
    added: Regex,
    was_added: Regex,
    joined_via_link: Regex,
    invite_link_phrase: String,
}

impl TranscriptPatterns {
    /// Compile the patterns. `invite_link_phrase` is matched literally.
    pub fn new(invite_link_phrase: &str) -> Result<Self> {
        Ok(Self {
            header: Regex::new(HEADER_PATTERN)?,
            added: Regex::new(&format!("({name}) added ({name})", name = NAME_PATTERN))?,
            was_added: Regex::new(&format!("({}) was added", NAME_PATTERN))?,
            joined_via_link: Regex::new(&format!(
                "({}) {}",
                NAME_PATTERN,
                regex::escape(invite_link_phrase)
            ))?,
            invite_link_phrase: invite_link_phrase.to_string(),
        })
    }

    /// Classify a line by the first rule in [`RULES`] that applies.
    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        RULES
            .iter()
            .find_map(|rule| self.apply(*rule, line))
            .unwrap_or(LineKind::Continuation)
    }

    fn apply<'a>(&self, rule: Rule, line: &'a str) -> Option<LineKind<'a>> {
        match rule {
            Rule::Media(kind) => line.contains(kind.marker()).then(|| LineKind::Media {
                kind,
                sender: self.header(line).map(|h| h.sender),
            }),
            Rule::Header => self.header(line).map(LineKind::Header),
        }
    }

    /// Match a header at the start of `text`.
    pub fn header<'a>(&self, text: &'a str) -> Option<MessageHeader<'a>> {
        let caps = self.header.captures(text)?;
        let whole = caps.get(0)?;
        let label = caps.get(4)?.as_str();

        Some(MessageHeader {
            date: caps.get(1)?.as_str(),
            time: caps.get(2)?.as_str(),
            meridiem: caps.get(3).map_or("", |m| m.as_str()),
            // The label ends at the first colon; a ": " in the text belongs to the body
            sender: label.trim(),
            end: whole.end(),
        })
    }

    /// "X added Y" → `(X, Y)`
    pub fn added<'a>(&self, body: &'a str) -> Option<(&'a str, &'a str)> {
        let caps = self.added.captures(body)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }

    /// "Z was added" → `Z`
    pub fn was_added<'a>(&self, body: &'a str) -> Option<&'a str> {
        Some(self.was_added.captures(body)?.get(1)?.as_str())
    }

    /// "Z joined using this group's invite link" → `Z`
    pub fn joined_via_link<'a>(&self, body: &'a str) -> Option<&'a str> {
        if !body.contains(&self.invite_link_phrase) {
            return None;
        }
        Some(self.joined_via_link.captures(body)?.get(1)?.as_str())
    }
}
