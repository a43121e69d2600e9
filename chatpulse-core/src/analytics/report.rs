//! Report aggregation
//!
//! Turns merged identities into the final [`Report`]: traffic totals, shares,
//! join dates, time in chat, daily message rate and the leaderboard.

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;

use crate::config::{GroupConfig, CREATED_CHAT_PREFIX, DISPLAY_DATE_FORMAT};
use crate::format::{member_key, round_to, to_percentage};
use crate::merge::MergedIdentities;
use crate::types::{MediaCounts, MediaKind, MediaTally, MemberStats, Report};

const SECONDS_PER_DAY: i64 = 86_400;

/// Computes derived per-member metrics and ranks members.
pub struct StatisticsAggregator<'c> {
    config: &'c GroupConfig,
    now: NaiveDateTime,
}

impl<'c> StatisticsAggregator<'c> {
    /// Aggregator measuring time in chat up to the current local time.
    pub fn new(config: &'c GroupConfig) -> Self {
        Self::with_reference_time(config, Local::now().naive_local())
    }

    /// Aggregator measuring time in chat up to `now`.
    pub fn with_reference_time(config: &'c GroupConfig, now: NaiveDateTime) -> Self {
        Self { config, now }
    }

    /// Build the report.
    ///
    /// `media` is keyed by raw identity and is folded under canonical names
    /// here; `media_totals` are the transcript-wide counters.
    pub fn aggregate(
        &self,
        merged: &MergedIdentities,
        media: &MediaCounts,
        media_totals: &MediaTally,
    ) -> Report {
        let media = self.fold_media(media);
        let traffic = self.traffic_by_key(merged, &media);
        let grand_total: u64 = traffic.values().map(|t| t.total).sum();

        let mut members: IndexMap<String, MemberStats> = IndexMap::with_capacity(traffic.len());
        for (key, member) in traffic {
            let days_in_chat = member.joined.map(|date| self.whole_days_since(date));
            let messages_per_day = match days_in_chat {
                Some(days) if days > 0 => round_to(member.total as f64 / days as f64, 2),
                _ => 0.0,
            };
            let tally = member.media;

            let stats = MemberStats {
                messages: member.total,
                messages_per_day,
                percentage_share: to_percentage(member.total, grand_total),
                joined_chat: member.joined.into(),
                days_in_chat: days_in_chat.into(),
                left_or_removed: member.activity_log.len().saturating_sub(1),
                activity_log: member.activity_log,
                images_sent: tally.get(MediaKind::Image),
                videos_sent: tally.get(MediaKind::Video),
                gifs_sent: tally.get(MediaKind::Gif),
                polls_sent: tally.get(MediaKind::Poll),
                voicenotes_sent: tally.get(MediaKind::VoiceNote),
                leaderboard: 0,
            };
            members.insert(key, stats);
        }

        // Stable: equal rates keep merge order
        members.sort_by(|_, a, _, b| b.messages_per_day.total_cmp(&a.messages_per_day));
        for (rank, stats) in members.values_mut().enumerate() {
            stats.leaderboard = rank + 1;
        }

        Report {
            messages: members.values().map(|m| m.messages).sum(),
            images: media_totals.get(MediaKind::Image),
            videos: media_totals.get(MediaKind::Video),
            gifs: media_totals.get(MediaKind::Gif),
            polls: media_totals.get(MediaKind::Poll),
            voice_notes: media_totals.get(MediaKind::VoiceNote),
            member_count: members.len(),
            members,
        }
    }

    /// Traffic per report key, in merge order.
    ///
    /// Names that normalize to the same key (e.g. "Mary Jane" and
    /// "Mary-Jane") are folded into one entry: totals and media are summed,
    /// logs concatenated and the earlier join date kept.
    fn traffic_by_key(
        &self,
        merged: &MergedIdentities,
        media: &MediaCounts,
    ) -> IndexMap<String, KeyedTraffic> {
        let mut traffic: IndexMap<String, KeyedTraffic> = IndexMap::new();

        for (name, count) in merged.messages.iter() {
            let tally = media.get_or_default(name);
            let activity_log = merged.activity_logs.get_or_default(name);
            let joined = created_chat_date(&activity_log)
                .or_else(|| merged.joined_at.get(name).copied());

            let key = member_key(name);
            if traffic.contains_key(&key) {
                tracing::warn!(
                    member = name,
                    key = %key,
                    "Two members share a report key; folding them together"
                );
            }

            let entry = traffic.entry(key).or_default();
            entry.total += count + tally.total();
            entry.media.absorb(&tally);
            entry.activity_log.extend(activity_log);
            entry.joined = match (entry.joined, joined) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }

        traffic
    }

    /// Re-key media tallies by canonical name.
    fn fold_media(&self, media: &MediaCounts) -> MediaCounts {
        let mut folded = MediaCounts::new();
        for (identity, tally) in media.iter() {
            let canonical = self.config.aliases.canonical_for(identity).unwrap_or(identity);
            folded.entry_or_default(canonical).absorb(tally);
        }
        folded
    }

    /// Whole days from `date` to the reference time, rounded down.
    fn whole_days_since(&self, date: NaiveDateTime) -> i64 {
        (self.now - date).num_seconds().div_euclid(SECONDS_PER_DAY)
    }
}

/// Everything counted for one report key before metrics are derived.
#[derive(Debug, Default)]
struct KeyedTraffic {
    /// Text messages plus media placeholders
    total: u64,
    media: MediaTally,
    activity_log: Vec<String>,
    joined: Option<NaiveDateTime>,
}

/// Date recorded in a "Created chat on ..." log entry, if any.
fn created_chat_date(log: &[String]) -> Option<NaiveDateTime> {
    log.iter().find_map(|entry| {
        let start = entry.find(CREATED_CHAT_PREFIX)? + CREATED_CHAT_PREFIX.len();
        NaiveDateTime::parse_from_str(entry[start..].trim(), DISPLAY_DATE_FORMAT).ok()
    })
}
