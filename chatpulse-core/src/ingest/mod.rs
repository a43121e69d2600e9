//! Ingestion layer for exported chat transcripts
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │  raw bytes   │ ──► │  to_lines()  │ ──► │ TranscriptParser │ ──► │ ParseOutput │
//! └──────────────┘     └──────────────┘     └──────────────────┘     └─────────────┘
//!                                                   │
//!                                                   ▼
//!                                        ┌────────────────────┐
//!                                        │ TranscriptPatterns │
//!                                        │  (line classifier) │
//!                                        └────────────────────┘
//! ```

pub mod classify;
mod parser;

pub use classify::{LineKind, MessageHeader, Rule, TranscriptPatterns, RULES};
pub use parser::{ParseOutput, TranscriptParser};

use crate::error::Result;

/// Decode transcript bytes into text.
///
/// A leading byte-order mark is dropped. Invalid UTF-8 is an error.
pub fn decode(content: Vec<u8>) -> Result<String> {
    let text = String::from_utf8(content)?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Split decoded text into lines (`\n` or `\r\n` terminated).
pub fn to_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}
