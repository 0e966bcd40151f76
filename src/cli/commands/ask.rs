//! Ask command implementation.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Ask a single question about one video.
pub async fn run_ask(
    video: &str,
    question: &str,
    language: Option<String>,
    model: Option<String>,
    top_k: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check_process() {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(k) = top_k {
        settings.rag.top_k = k;
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

    spinner.set_message("Preparing search index...");
    let mut session = super::build_session(&settings, model.as_deref())?;
    let video_id = transcript.video_id().to_string();
    if let Err(e) = session.load(transcript, settings.chunking.params()).await {
        spinner.finish_and_clear();
        Output::error(&format!("Failed to process video: {}", e));
        return Err(e.into());
    }

    spinner.set_message("Generating answer...");
    match session.ask(&video_id, question).await {
        Ok(result) => {
            spinner.finish_and_clear();
            Output::answer(&result);
            Ok(())
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}
