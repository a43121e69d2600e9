//! chatpulse - engagement statistics for an exported WhatsApp group chat
//!
//! Reads a `_chat.txt` export, merges aliases and prints per-member
//! statistics with a leaderboard.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chatpulse_core::analytics::ParseSummary;
use chatpulse_core::{logging, Analyser, Config, Report};
use chrono::NaiveDateTime;
use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "chatpulse")]
#[command(about = "Engagement statistics for an exported WhatsApp group chat")]
#[command(version)]
struct Args {
    /// Exported transcript (`_chat.txt`)
    transcript: PathBuf,

    /// Config file to use instead of ~/.config/chatpulse/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Measure time in chat up to this instant (e.g. 2024-03-01T00:00:00)
    #[arg(long)]
    now: Option<NaiveDateTime>,

    /// Also print the line-accounting summary
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    // Logging is best-effort: a read-only state dir should not block a report
    let _log_guard = match logging::init(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!(
                "warning: file logging disabled ({}): {}",
                logging::log_file_path().display(),
                e
            );
            None
        }
    };

    let content = std::fs::read(&args.transcript)
        .with_context(|| format!("failed to read transcript {}", args.transcript.display()))?;

    let mut analyser = Analyser::new(&config.group);
    if let Some(now) = args.now {
        analyser = analyser.with_reference_time(now);
    }
    let analysis = analyser
        .analyse(content)
        .context("failed to analyse transcript")?;

    match args.format {
        Format::Json => print_json(&analysis.report, &analysis.summary, args.verbose)?,
        Format::Text => {
            if args.verbose {
                print_summary(&analysis.summary);
                for warning in &analysis.warnings {
                    eprintln!("warning: {}", warning);
                }
            }
            print_report(&config.group.group_name, &analysis.report);
        }
    }

    Ok(())
}

fn print_json(report: &Report, summary: &ParseSummary, verbose: bool) -> Result<()> {
    let output = if verbose {
        serde_json::json!({
            "summary": summary,
            "report": report,
        })
    } else {
        serde_json::to_value(report)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_summary(summary: &ParseSummary) {
    println!("Lines:      {}", summary.total_lines);
    println!("Messages:   {}", summary.matched_messages);
    println!("Unmatched:  {}", summary.unmatched_lines);
    println!(
        "Media:      {} ({} images, {} videos, {} GIFs, {} voice notes)",
        summary.total_media, summary.images, summary.videos, summary.gifs, summary.voice_notes
    );
    println!("Polls:      {}", summary.polls);
    println!();
}

fn print_report(group_name: &str, report: &Report) {
    println!("{}", group_name);
    println!(
        "{} members, {} messages ({} images, {} videos, {} GIFs, {} polls, {} voice notes)",
        report.member_count,
        report.messages,
        report.images,
        report.videos,
        report.gifs,
        report.polls,
        report.voice_notes
    );

    if report.members.is_empty() {
        println!("No members found.");
        return;
    }

    let width = report.members.keys().map(String::len).max().unwrap_or(0).max(6);
    println!();
    println!(
        "{:>4}  {:<width$}  {:>8}  {:>7}  {:>7}  {:>6}  {}",
        "#", "member", "messages", "share%", "per day", "days", "joined"
    );
    for (key, stats) in &report.members {
        println!(
            "{:>4}  {:<width$}  {:>8}  {:>7.2}  {:>7.2}  {:>6}  {}",
            stats.leaderboard,
            key,
            stats.messages,
            stats.percentage_share,
            stats.messages_per_day,
            stats.days_in_chat.to_string(),
            stats
                .joined_chat
                .known()
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
        );
    }
}
