//! CLI module for Svar.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Resolve the tracing filter directive for this run. `-v` flags take
/// precedence over the configured log level.
pub fn log_directive(verbose: u8, configured: &str) -> String {
    let level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    format!("svar={}", level)
}

/// Svar - YouTube Transcript Q&A
///
/// A CLI tool for asking questions about YouTube videos, answered from their
/// transcripts with citations. The name "Svar" comes from the
/// Norwegian/Scandinavian word for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a video's transcript and build its search index
    Process {
        /// YouTube URL or video ID
        video: String,

        /// Preferred caption language (falls back to English, then any track)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Ask a single question about a video
    Ask {
        /// YouTube URL or video ID
        video: String,

        /// The question to ask
        question: String,

        /// Preferred caption language
        #[arg(short, long)]
        language: Option<String>,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,

        /// Number of transcript segments to retrieve as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Start an interactive question-answering session
    Chat {
        /// Video to load on startup (YouTube URL or video ID)
        video: Option<String>,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Manage the index cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cache usage and entries
    Stats,

    /// Remove all cached indexes
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directive_verbosity_overrides_config() {
        assert_eq!(log_directive(0, "warn"), "svar=warn");
        assert_eq!(log_directive(0, "info"), "svar=info");
        assert_eq!(log_directive(1, "warn"), "svar=debug");
        assert_eq!(log_directive(3, "info"), "svar=trace");
    }
}
