//! Interactive chat command.
//!
//! A small REPL over the session coordinator: load one or more videos,
//! switch between them, and ask follow-up questions with conversation
//! history carried per video.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SvarError;
use crate::session::SessionCoordinator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(
    video: Option<String>,
    model: Option<String>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check_process() {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut session = super::build_session(&settings, model.as_deref())?;

    if let Some(video) = video {
        load_video(&mut session, &video, &settings).await;
    }

    println!("\n{}", style("Svar Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about the active video, or: load <video>, switch <id>, videos, clear, exit.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("videos") {
            list_videos(&session);
            continue;
        }

        if input.eq_ignore_ascii_case("clear") {
            match session.active().map(str::to_string) {
                Some(id) => {
                    // Drop and reload so the index stays available but the
                    // history starts fresh.
                    let entry = session.entry(&id).map(|e| e.transcript().clone());
                    session.clear(&id).ok();
                    if let Some(transcript) = entry {
                        match session.load(transcript, settings.chunking.params()).await {
                            Ok(_) => Output::info("Conversation history cleared."),
                            Err(e) => Output::error(&format!("Failed to reload video: {}", e)),
                        }
                    }
                }
                None => Output::warning("No video loaded."),
            }
            continue;
        }

        if let Some(video) = input.strip_prefix("load ") {
            load_video(&mut session, video.trim(), &settings).await;
            continue;
        }

        if let Some(id) = input.strip_prefix("switch ") {
            match session.switch_active(id.trim()) {
                Ok(()) => Output::info(&format!("Active video is now {}.", id.trim())),
                Err(e) => Output::error(&format!("{}", e)),
            }
            continue;
        }

        let Some(active) = session.active().map(str::to_string) else {
            Output::warning("No video loaded. Use: load <video>");
            continue;
        };

        let spinner = Output::spinner("Thinking...");
        match session.ask(&active, input).await {
            Ok(result) => {
                spinner.finish_and_clear();
                if result.is_degraded() {
                    Output::warning(
                        "Answer generation unavailable; showing the most relevant excerpt.",
                    );
                }
                println!("\n{} {}\n", style("Svar:").cyan().bold(), result.text);
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}

/// Fetch, chunk and index a video, making it active on success.
async fn load_video(session: &mut SessionCoordinator, video: &str, settings: &Settings) {
    let spinner = Output::spinner("Loading video...");
    let transcript = match super::fetch_transcript(video, None, settings).await {
        Ok(t) => t,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to fetch transcript: {}", e));
            return;
        }
    };

    match session.load(transcript, settings.chunking.params()).await {
        Ok(entry) => {
            spinner.finish_and_clear();
            Output::success(&format!(
                "Loaded \"{}\" ({} segments).",
                entry.transcript().metadata().title,
                entry.index().len()
            ));
        }
        Err(e) => {
            spinner.finish_and_clear();
            match e {
                SvarError::NoContent(_) => {
                    Output::error("This video has no usable transcript text.")
                }
                e => Output::error(&format!("Failed to load video: {}", e)),
            }
        }
    }
}

/// Print the loaded videos, marking the active one.
fn list_videos(session: &SessionCoordinator) {
    let loaded = session.loaded();
    if loaded.is_empty() {
        Output::info("No videos loaded.");
        return;
    }

    Output::header("Loaded videos");
    for id in loaded {
        let marker = if session.active() == Some(id) {
            style("(active)").green().to_string()
        } else {
            String::new()
        };
        if let Some(entry) = session.entry(id) {
            println!(
                "  {} {} {} {}",
                style("*").cyan(),
                style(&entry.transcript().metadata().title).bold(),
                style(id).dim(),
                marker
            );
        }
    }
}
