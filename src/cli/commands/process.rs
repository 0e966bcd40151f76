//! Process command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Fetch a video's transcript and build (or reuse) its search index.
pub async fn run_process(
    video: &str,
    language: Option<String>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check_process() {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let spinner = Output::spinner("Fetching transcript...");
    let transcript = match super::fetch_transcript(video, language.as_deref(), &settings).await {
        Ok(t) => t,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to fetch transcript: {}", e));
            return Err(e.into());
        }
    };
    spinner.set_message("Building search index...");

    let mut session = super::build_session(&settings, None)?;
    let params = settings.chunking.params();
    match session.load(transcript, params).await {
        Ok(entry) => {
            spinner.finish_and_clear();
            Output::success("Video processed.");
            Output::video_info(
                &entry.transcript().metadata().title,
                entry.transcript().video_id(),
                entry.index().len(),
                entry.transcript().metadata().duration_seconds,
            );
            Output::info(&format!(
                "Ask a question with: svar ask {} \"...\"",
                entry.transcript().video_id()
            ));
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to process video: {}", e));
            Err(e.into())
        }
    }
}
