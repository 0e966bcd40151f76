//! CLI output formatting utilities.

use crate::rag::{AnswerResult, Citation};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print video info with duration.
    pub fn video_info(title: &str, id: &str, segments: usize, duration_seconds: Option<u32>) {
        let duration = duration_seconds
            .map(format_duration)
            .unwrap_or_else(|| "unknown length".to_string());
        println!(
            "  {} {} ({}, {} segments, {})",
            style("*").cyan(),
            style(title).bold(),
            style(id).dim(),
            segments,
            duration
        );
    }

    /// Print a generated answer with its citations.
    pub fn answer(result: &AnswerResult) {
        if result.is_degraded() {
            Self::warning("Answer generation unavailable; showing the most relevant transcript excerpt instead.");
        }
        println!("\n{}\n", result.text);

        if !result.citations.is_empty() {
            Self::header("Sources");
            for citation in &result.citations {
                Self::citation(citation);
            }
        }
    }

    /// Print one citation line.
    pub fn citation(citation: &Citation) {
        println!(
            "\n{} segment {} @ offsets {}..{} (score: {:.2})",
            style(">>").green(),
            style(citation.segment_index.to_string()).bold(),
            citation.start,
            citation.end,
            citation.score
        );
        println!("   {}", citation.excerpt.replace('\n', " "));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format bytes as a human-readable size.
pub fn format_bytes(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
