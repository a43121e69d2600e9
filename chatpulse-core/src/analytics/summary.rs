//! Line-accounting summary of a parse.

use serde::Serialize;

use crate::ingest::ParseOutput;
use crate::types::MediaKind;

/// How the lines of a transcript were accounted for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    pub total_lines: usize,
    /// Messages counted for some sender
    pub matched_messages: u64,
    /// Records dropped for a missing header or bad timestamp
    pub unmatched_lines: u64,
    pub images: u64,
    pub videos: u64,
    pub gifs: u64,
    pub polls: u64,
    pub voice_notes: u64,
    /// Images, videos, GIFs and voice notes. Polls are not media files.
    pub total_media: u64,
}

impl ParseSummary {
    pub fn from_output(output: &ParseOutput) -> Self {
        let totals = &output.media_totals;
        let images = totals.get(MediaKind::Image);
        let videos = totals.get(MediaKind::Video);
        let gifs = totals.get(MediaKind::Gif);
        let voice_notes = totals.get(MediaKind::VoiceNote);

        Self {
            total_lines: output.total_lines,
            matched_messages: output.matched_messages(),
            unmatched_lines: output.unmatched_line_count,
            images,
            videos,
            gifs,
            polls: totals.get(MediaKind::Poll),
            voice_notes,
            total_media: images + videos + gifs + voice_notes,
        }
    }

    /// Emit the summary at info level.
    pub fn log(&self) {
        tracing::info!(
            total_lines = self.total_lines,
            matched = self.matched_messages,
            unmatched = self.unmatched_lines,
            images = self.images,
            videos = self.videos,
            gifs = self.gifs,
            polls = self.polls,
            voice_notes = self.voice_notes,
            total_media = self.total_media,
            "Transcript parsed"
        );
    }
}
