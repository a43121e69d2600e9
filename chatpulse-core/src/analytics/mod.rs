//! Analytics for chatpulse
//!
//! Provides the per-member statistics of a transcript:
//! - Traffic totals and percentage shares
//! - Join dates and time in chat
//! - Messages per day and the leaderboard
//! - Run summaries for diagnostics
//!
//! See [`report`] for the aggregation itself and [`summary`] for the
//! line-accounting summary logged after each run.

pub mod report;
pub mod summary;

pub use report::StatisticsAggregator;
pub use summary::ParseSummary;
