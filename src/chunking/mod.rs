//! Transcript chunking.
//!
//! Splits a transcript into overlapping segments suitable for embedding and
//! retrieval. Chunking is deterministic: the same text and parameters always
//! produce byte-identical output, which keeps cache fingerprints honest.

use crate::error::{Result, SvarError};
use serde::{Deserialize, Serialize};

/// Chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkParams {
    /// Maximum segment length in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive segments in characters.
    pub overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

impl ChunkParams {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SvarError::InvalidInput(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap == 0 || self.overlap >= self.chunk_size {
            return Err(SvarError::InvalidInput(format!(
                "overlap must satisfy 0 < overlap < chunk_size (got overlap={}, chunk_size={})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// One segment of transcript text with its location in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position of this segment in the chunk sequence.
    pub index: usize,
    /// Byte offset of the segment start in the source text.
    pub start: usize,
    /// Byte offset one past the segment end.
    pub end: usize,
    /// Segment text.
    pub text: String,
}

impl Segment {
    /// A short preview of the segment text for display.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut out: String = self.text.chars().take(max_chars).collect();
        if self.text.chars().count() > max_chars {
            out.push('…');
        }
        out
    }
}

/// An ordered sequence of overlapping segments covering a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkSet {
    segments: Vec<Segment>,
    params: ChunkParams,
}

impl ChunkSet {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn params(&self) -> ChunkParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Rebuild the source text from the segments, dropping the overlap
    /// prefix of every segment after the first. Used to verify coverage.
    pub fn reconstruct(&self) -> String {
        let mut out = String::new();
        for (i, seg) in self.segments.iter().enumerate() {
            if i == 0 {
                out.push_str(&seg.text);
            } else {
                out.extend(seg.text.chars().skip(self.params.overlap));
            }
        }
        out
    }
}

/// Split `text` into overlapping segments.
///
/// The window walks the text in character units, emitting segments of at
/// most `chunk_size` characters and stepping so that consecutive segments
/// share exactly `overlap` characters. Cut points are snapped backward to
/// the nearest sentence or word boundary when one exists within the overlap
/// window; snapping never shrinks a segment below the overlap length, so
/// the window always advances and reconstruction stays exact.
pub fn chunk(text: &str, params: ChunkParams) -> Result<ChunkSet> {
    params.validate()?;

    if text.is_empty() {
        return Err(SvarError::InvalidInput(
            "transcript text is empty".to_string(),
        ));
    }

    // Byte offset of every character, so char-based window arithmetic can
    // slice the source without landing inside a multi-byte sequence.
    let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let byte_at = |i: usize| if i == n { text.len() } else { offsets[i] };

    let mut segments = Vec::new();
    let mut start = 0usize;

    loop {
        let hard_end = (start + params.chunk_size).min(n);
        let end = if hard_end < n {
            snap_boundary(&chars, start, hard_end, params.overlap)
        } else {
            n
        };

        let (sb, eb) = (byte_at(start), byte_at(end));
        segments.push(Segment {
            index: segments.len(),
            start: sb,
            end: eb,
            text: text[sb..eb].to_string(),
        });

        if end == n {
            break;
        }
        start = end - params.overlap;
    }

    Ok(ChunkSet { segments, params })
}

/// Find a cut point at or before `hard_end` that avoids mid-word breaks.
///
/// Prefers a position just after sentence-final punctuation, then any
/// whitespace character. Only positions strictly greater than
/// `start + overlap` are eligible; otherwise the hard cut stands.
fn snap_boundary(chars: &[char], start: usize, hard_end: usize, overlap: usize) -> usize {
    let lo = (start + overlap + 1).max(hard_end.saturating_sub(overlap));

    // Sentence boundary: cut right after ". ", "! " or "? ".
    for i in (lo..=hard_end).rev() {
        if matches!(chars[i - 1], '.' | '!' | '?') && chars[i].is_whitespace() {
            return i;
        }
    }

    // Word boundary: cut before a whitespace character.
    for i in (lo..=hard_end).rev() {
        if chars[i].is_whitespace() {
            return i;
        }
    }

    hard_end
}

#[cfg(test)]
mod tests {
    use super::*;

    const LESSON: &str =
        "Lesson one. Photosynthesis converts light into chemical energy. Plants use chlorophyll.";

    #[test]
    fn test_rejects_empty_text() {
        let err = chunk("", ChunkParams::new(100, 20)).unwrap_err();
        assert!(matches!(err, SvarError::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_bad_params() {
        assert!(chunk("hello world", ChunkParams::new(10, 0)).is_err());
        assert!(chunk("hello world", ChunkParams::new(10, 10)).is_err());
        assert!(chunk("hello world", ChunkParams::new(10, 15)).is_err());
        assert!(chunk("hello world", ChunkParams::new(0, 0)).is_err());
    }

    #[test]
    fn test_short_text_single_segment() {
        let set = chunk("short", ChunkParams::new(100, 20)).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.segments()[0].text, "short");
        assert_eq!(set.segments()[0].start, 0);
        assert_eq!(set.segments()[0].end, 5);
    }

    #[test]
    fn test_deterministic() {
        let a = chunk(LESSON, ChunkParams::new(40, 10)).unwrap();
        let b = chunk(LESSON, ChunkParams::new(40, 10)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reconstruction_exact() {
        for (size, overlap) in [(40, 10), (25, 5), (50, 49), (13, 7)] {
            let set = chunk(LESSON, ChunkParams::new(size, overlap)).unwrap();
            assert_eq!(set.reconstruct(), LESSON, "size={} overlap={}", size, overlap);
        }
    }

    #[test]
    fn test_exact_overlap_between_segments() {
        let params = ChunkParams::new(40, 10);
        let set = chunk(LESSON, params).unwrap();
        for pair in set.segments().windows(2) {
            let tail: Vec<char> = pair[0]
                .text
                .chars()
                .rev()
                .take(params.overlap)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            let head: Vec<char> = pair[1].text.chars().take(params.overlap).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_lesson_scenario_coverage() {
        let set = chunk(LESSON, ChunkParams::new(40, 10)).unwrap();
        assert!(set.len() >= 3, "expected 3+ segments, got {}", set.len());
        assert_eq!(set.reconstruct(), LESSON);
        assert!(set
            .segments()
            .iter()
            .any(|s| s.text.contains("Photosynthesis")));
    }

    #[test]
    fn test_segments_respect_chunk_size() {
        let set = chunk(LESSON, ChunkParams::new(40, 10)).unwrap();
        for seg in set.segments() {
            assert!(seg.text.chars().count() <= 40);
        }
    }

    #[test]
    fn test_offsets_slice_source() {
        let set = chunk(LESSON, ChunkParams::new(40, 10)).unwrap();
        for seg in set.segments() {
            assert_eq!(&LESSON[seg.start..seg.end], seg.text);
        }
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Blåbær er gode. Æsj, sier noen. Øving gjør mester, sier andre igjen.";
        let set = chunk(text, ChunkParams::new(20, 5)).unwrap();
        assert_eq!(set.reconstruct(), text);
        for seg in set.segments() {
            assert_eq!(&text[seg.start..seg.end], seg.text);
        }
    }

    #[test]
    fn test_snaps_to_sentence_boundary() {
        // The hard cut at 30 lands mid-word inside the second sentence; the
        // period at offset 17 is inside the snap window, so the first
        // segment should end right after it.
        let text = "One sentence here. Another sentence follows right after it.";
        let set = chunk(text, ChunkParams::new(30, 12)).unwrap();
        assert!(set.segments()[0].text.ends_with('.'));
    }

    #[test]
    fn test_preview_truncates() {
        let seg = Segment {
            index: 0,
            start: 0,
            end: 11,
            text: "hello world".to_string(),
        };
        assert_eq!(seg.preview(5), "hello…");
        assert_eq!(seg.preview(50), "hello world");
    }
}
