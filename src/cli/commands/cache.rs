//! Cache command implementation.

use crate::cache::CacheStore;
use crate::cli::output::format_bytes;
use crate::cli::{CacheAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the cache command.
pub fn run_cache(action: &CacheAction, settings: Settings) -> Result<()> {
    let cache = CacheStore::new(settings.cache_dir(), settings.cache.max_bytes())?;

    match action {
        CacheAction::Stats => {
            let stats = cache.stats()?;
            Output::header("Index cache");
            Output::kv("Directory", &settings.cache_dir().display().to_string());
            Output::kv(
                "Usage",
                &format!(
                    "{} of {} ({} entries)",
                    format_bytes(stats.total_bytes),
                    format_bytes(stats.max_bytes),
                    stats.entry_count
                ),
            );

            if !stats.entries.is_empty() {
                Output::header("Entries");
                let mut entries = stats.entries;
                entries.sort_by(|a, b| b.last_access.cmp(&a.last_access));
                for entry in entries {
                    let video = if entry.video_id.is_empty() {
                        "unknown".to_string()
                    } else {
                        entry.video_id
                    };
                    Output::list_item(&format!(
                        "{} ({}, last used {})",
                        video,
                        format_bytes(entry.size_bytes),
                        entry.last_access.format("%Y-%m-%d %H:%M")
                    ));
                }
            }
        }

        CacheAction::Clear => {
            let removed = cache.clear()?;
            Output::success(&format!("Removed {} cached indexes.", removed));
        }
    }

    Ok(())
}
