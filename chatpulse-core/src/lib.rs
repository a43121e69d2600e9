//! # chatpulse-core
//!
//! Core library for chatpulse - engagement statistics for exported WhatsApp
//! group chats.
//!
//! This library provides:
//! - A line-oriented transcript parser
//! - Alias merging of a member's several identities
//! - Per-member statistics, shares and a leaderboard
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three stages, each a pure function of its input and
//! the read-only [`GroupConfig`]:
//! - **Parse:** transcript lines → per-identity counts, logs and join dates
//! - **Merge:** raw identities → canonical members
//! - **Aggregate:** canonical members → [`Report`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use chatpulse_core::{Analyser, Config};
//!
//! let config = Config::load().expect("failed to load config");
//! let transcript = std::fs::read("_chat.txt").expect("failed to read transcript");
//!
//! let analysis = Analyser::new(&config.group)
//!     .analyse(transcript)
//!     .expect("failed to analyse transcript");
//! println!("{} members", analysis.report.member_count);
//! ```

// Re-export commonly used items at the crate root
pub use config::{AliasEntry, AliasTable, Config, GroupConfig};
pub use error::{Error, Result};
pub use pipeline::{Analyser, Analysis};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod types;
