//! YouTube transcript fetching via yt-dlp.
//!
//! Uses `yt-dlp --dump-json` to get metadata and the available caption
//! tracks, then downloads the chosen track in json3 format and flattens it
//! to plain text.

use super::{Transcript, TranscriptFetcher, VideoMetadata};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Extract a video ID from a YouTube URL or bare ID.
pub fn parse_video_id(input: &str) -> Option<String> {
    // Matches various YouTube URL formats and bare video IDs
    let video_id_regex = Regex::new(
        r"(?x)
        (?:
            # Full YouTube URLs
            (?:https?://)?
            (?:www\.)?
            (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        # Bare video ID (11 characters)
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex");

    let caps = video_id_regex.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// YouTube transcript source backed by yt-dlp.
pub struct YoutubeFetcher {
    http: reqwest::Client,
}

impl YoutubeFetcher {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { http }
    }

    /// Fetch video info (metadata + caption track listings) using yt-dlp.
    async fn fetch_info(&self, video_id: &str) -> Result<serde_json::Value> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--dump-json",
                "--no-download",
                "--no-warnings",
                &url,
            ])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SvarError::ToolNotFound("yt-dlp".to_string())
                } else {
                    SvarError::VideoSource(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SvarError::TranscriptUnavailable(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        let json_str = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&json_str)
            .map_err(|e| SvarError::VideoSource(format!("Failed to parse yt-dlp output: {}", e)))
    }

    /// Pick a caption track URL: requested language first, then English,
    /// then any available track. Manual subtitles win over auto-generated
    /// ones within each language.
    fn select_track(info: &serde_json::Value, language: &str) -> Option<(String, String)> {
        let mut candidates: Vec<String> = vec![language.to_string()];
        if language != "en" {
            candidates.push("en".to_string());
        }
        for key in ["subtitles", "automatic_captions"] {
            if let Some(map) = info[key].as_object() {
                let mut langs: Vec<&String> = map.keys().collect();
                langs.sort();
                candidates.extend(langs.into_iter().cloned());
            }
        }

        for lang in candidates {
            for key in ["subtitles", "automatic_captions"] {
                let tracks = &info[key][lang.as_str()];
                let Some(formats) = tracks.as_array() else {
                    continue;
                };
                let track = formats
                    .iter()
                    .find(|t| t["ext"].as_str() == Some("json3"))
                    .or_else(|| formats.first());
                if let Some(url) = track.and_then(|t| t["url"].as_str()) {
                    return Some((lang, url.to_string()));
                }
            }
        }

        None
    }

    /// Download a json3 caption track and flatten it to plain text.
    async fn download_track(&self, url: &str) -> Result<String> {
        let body: serde_json::Value = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut parts: Vec<String> = Vec::new();
        if let Some(events) = body["events"].as_array() {
            for event in events {
                let Some(segs) = event["segs"].as_array() else {
                    continue;
                };
                let line: String = segs
                    .iter()
                    .filter_map(|s| s["utf8"].as_str())
                    .collect::<Vec<_>>()
                    .concat();
                let line = line.trim();
                if !line.is_empty() {
                    parts.push(line.to_string());
                }
            }
        }

        Ok(parts.join(" "))
    }

    fn parse_metadata(info: &serde_json::Value) -> VideoMetadata {
        VideoMetadata {
            title: info["title"].as_str().unwrap_or("Unknown Title").to_string(),
            author: info["channel"]
                .as_str()
                .or_else(|| info["uploader"].as_str())
                .map(|s| s.to_string()),
            duration_seconds: info["duration"].as_f64().map(|d| d as u32),
            view_count: info["view_count"].as_u64(),
        }
    }
}

#[async_trait]
impl TranscriptFetcher for YoutubeFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str, language: &str) -> Result<Transcript> {
        let video_id = parse_video_id(video_id)
            .ok_or_else(|| SvarError::InvalidVideoId(video_id.to_string()))?;

        info!("Fetching transcript for {}", video_id);
        let info = self.fetch_info(&video_id).await?;
        let metadata = Self::parse_metadata(&info);

        let (used_language, track_url) =
            Self::select_track(&info, language).ok_or_else(|| {
                SvarError::TranscriptUnavailable(format!(
                    "No caption track available for video {}",
                    video_id
                ))
            })?;

        debug!("Using caption track '{}'", used_language);
        let text = self.download_track(&track_url).await?;

        if text.is_empty() {
            return Err(SvarError::TranscriptUnavailable(format!(
                "Caption track '{}' for video {} is empty",
                used_language, video_id
            )));
        }

        Ok(Transcript::new(video_id, used_language, text, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_id_formats() {
        let expected = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(parse_video_id("dQw4w9WgXcQ"), expected);
        assert_eq!(
            parse_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(parse_video_id("https://youtu.be/dQw4w9WgXcQ"), expected);
        assert_eq!(
            parse_video_id("youtube.com/embed/dQw4w9WgXcQ"),
            expected
        );
        assert_eq!(parse_video_id("not a video"), None);
        assert_eq!(parse_video_id("tooshort"), None);
    }

    #[test]
    fn test_select_track_prefers_requested_language() {
        let info = serde_json::json!({
            "subtitles": {
                "de": [{ "ext": "json3", "url": "https://example.com/de" }]
            },
            "automatic_captions": {
                "en": [{ "ext": "json3", "url": "https://example.com/en" }]
            }
        });

        let (lang, url) = YoutubeFetcher::select_track(&info, "de").unwrap();
        assert_eq!(lang, "de");
        assert_eq!(url, "https://example.com/de");

        let (lang, _) = YoutubeFetcher::select_track(&info, "fr").unwrap();
        assert_eq!(lang, "en");
    }

    #[test]
    fn test_select_track_none_available() {
        let info = serde_json::json!({ "title": "No captions" });
        assert!(YoutubeFetcher::select_track(&info, "en").is_none());
    }

    #[test]
    fn test_parse_metadata() {
        let info = serde_json::json!({
            "title": "Photosynthesis 101",
            "channel": "Bio Channel",
            "duration": 612.0,
            "view_count": 12345
        });

        let meta = YoutubeFetcher::parse_metadata(&info);
        assert_eq!(meta.title, "Photosynthesis 101");
        assert_eq!(meta.author.as_deref(), Some("Bio Channel"));
        assert_eq!(meta.duration_seconds, Some(612));
        assert_eq!(meta.view_count, Some(12345));
    }
}
