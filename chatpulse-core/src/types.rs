//! Core domain types for chatpulse
//!
//! These types are shared by the three pipeline stages:
//!
//! | Type | Produced by | Consumed by |
//! |------|-------------|-------------|
//! | [`DefaultMap`] | parser, merger | merger, aggregator |
//! | [`MediaTally`] | parser | aggregator |
//! | [`Report`] | aggregator | CLI, server |
//!
//! ### Identities
//!
//! A *raw identity* is the sender label exactly as it appears in a transcript
//! header. Several raw identities can belong to one *canonical* member (a
//! person exporting from more than one device). Parser output is keyed by raw
//! identity; merger output and the report are keyed by canonical name.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::config::DISPLAY_DATE_FORMAT;

// ============================================
// Media
// ============================================

/// Kind of media placeholder found in an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Gif,
    Poll,
    VoiceNote,
}

impl MediaKind {
    /// All kinds, in the order their markers are checked.
    pub const ALL: [MediaKind; 5] = [
        MediaKind::Image,
        MediaKind::Video,
        MediaKind::Gif,
        MediaKind::Poll,
        MediaKind::VoiceNote,
    ];

    /// Substring that marks this kind of placeholder line.
    pub fn marker(&self) -> &'static str {
        match self {
            MediaKind::Image => "image omitted",
            MediaKind::Video => "video omitted",
            MediaKind::Gif => "GIF omitted",
            MediaKind::Poll => "POLL:",
            MediaKind::VoiceNote => "audio omitted",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Gif => "gif",
            MediaKind::Poll => "poll",
            MediaKind::VoiceNote => "voice_note",
        }
    }

    fn index(&self) -> usize {
        match self {
            MediaKind::Image => 0,
            MediaKind::Video => 1,
            MediaKind::Gif => 2,
            MediaKind::Poll => 3,
            MediaKind::VoiceNote => 4,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count of media placeholders per kind. Every kind starts at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaTally {
    counts: [u64; 5],
}

impl MediaTally {
    pub fn get(&self, kind: MediaKind) -> u64 {
        self.counts[kind.index()]
    }

    pub fn increment(&mut self, kind: MediaKind) {
        self.counts[kind.index()] += 1;
    }

    /// Sum over all kinds.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Add another tally into this one.
    pub fn absorb(&mut self, other: &MediaTally) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts) {
            *mine += theirs;
        }
    }
}

// ============================================
// DefaultMap
// ============================================

/// Insertion-ordered map keyed by identity with an explicit default for
/// absent keys.
///
/// Reads through [`DefaultMap::get_or_default`] return `V::default()` (zero
/// counts, empty logs) without inserting anything; writes through
/// [`DefaultMap::entry_or_default`] create the entry on first use. Iteration
/// follows first-insertion order, which is what makes leaderboard ties
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DefaultMap<V> {
    inner: IndexMap<String, V>,
}

impl<V> Default for DefaultMap<V> {
    fn default() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }
}

impl<V> DefaultMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.inner.insert(key.into(), value)
    }

    /// Remove an entry, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.inner.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V: Default> DefaultMap<V> {
    /// Mutable access to `key`, inserting `V::default()` when absent.
    pub fn entry_or_default(&mut self, key: &str) -> &mut V {
        self.inner.entry(key.to_string()).or_default()
    }
}

impl<V: Default + Clone> DefaultMap<V> {
    /// Value for `key`, or `V::default()` when absent. Never inserts.
    pub fn get_or_default(&self, key: &str) -> V {
        self.inner.get(key).cloned().unwrap_or_default()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for DefaultMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Message counts per identity.
pub type MessageCounts = DefaultMap<u64>;
/// Activity log entries per identity.
pub type ActivityLogs = DefaultMap<Vec<String>>;
/// Resolved join date per identity. Absent means unknown.
pub type JoinDates = DefaultMap<NaiveDateTime>;
/// Media placeholders per identity.
pub type MediaCounts = DefaultMap<MediaTally>;

// ============================================
// Report
// ============================================

/// A value that may be reported as the literal string `"Unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrUnknown<T> {
    Known(T),
    Unknown,
}

impl<T> OrUnknown<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            OrUnknown::Known(value) => Some(value),
            OrUnknown::Unknown => None,
        }
    }
}

impl<T> From<Option<T>> for OrUnknown<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(OrUnknown::Unknown, OrUnknown::Known)
    }
}

impl<T: Serialize> Serialize for OrUnknown<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OrUnknown::Known(value) => value.serialize(serializer),
            OrUnknown::Unknown => serializer.serialize_str("Unknown"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for OrUnknown<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrUnknown::Known(value) => value.fmt(f),
            OrUnknown::Unknown => f.write_str("Unknown"),
        }
    }
}

fn serialize_display_date<S: Serializer>(
    date: &OrUnknown<NaiveDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        OrUnknown::Known(dt) => serializer.collect_str(&dt.format(DISPLAY_DATE_FORMAT)),
        OrUnknown::Unknown => serializer.serialize_str("Unknown"),
    }
}

/// Per-member statistics in the final report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberStats {
    /// Text messages plus media placeholders
    pub messages: u64,
    pub messages_per_day: f64,
    pub percentage_share: f64,
    #[serde(serialize_with = "serialize_display_date")]
    pub joined_chat: OrUnknown<NaiveDateTime>,
    pub days_in_chat: OrUnknown<i64>,
    pub activity_log: Vec<String>,
    pub left_or_removed: usize,
    pub images_sent: u64,
    pub videos_sent: u64,
    pub gifs_sent: u64,
    pub polls_sent: u64,
    pub voicenotes_sent: u64,
    /// 1-based rank by descending messages per day
    pub leaderboard: usize,
}

/// The analysis result for one transcript.
///
/// `members` is ordered by leaderboard rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub messages: u64,
    pub images: u64,
    pub videos: u64,
    pub gifs: u64,
    pub polls: u64,
    pub voice_notes: u64,
    pub member_count: usize,
    pub members: IndexMap<String, MemberStats>,
}
