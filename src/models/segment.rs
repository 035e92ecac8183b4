use serde::{Deserialize, Serialize};

use crate::error::{CascadeError, CascadeResult};

use super::stable_id;

/// A single utterance from the transcription service.
///
/// Times are seconds since meeting start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub participant_id: String,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl Utterance {
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Whether the participant is speaking at `offset_seconds`
    pub fn covers(&self, offset_seconds: f64) -> bool {
        self.start_time <= offset_seconds && offset_seconds < self.end_time
    }
}

/// Boundary rules for the segmenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SegmenterConfig {
    /// Segments shorter than this are held and merged with the speaker's next speech
    pub min_segment_seconds: f64,
    /// Hard ceiling on a segment's duration
    pub max_segment_seconds: f64,
    /// Silence between two utterances that closes a segment
    pub pause_gap_seconds: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_segment_seconds: 15.0,
            max_segment_seconds: 120.0,
            pause_gap_seconds: 2.0,
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> CascadeResult<()> {
        if !(self.min_segment_seconds >= 0.0) {
            return Err(CascadeError::InvalidConfiguration(format!(
                "minSegmentSeconds must be >= 0, got {}",
                self.min_segment_seconds
            )));
        }
        if !(self.max_segment_seconds > self.min_segment_seconds) {
            return Err(CascadeError::InvalidConfiguration(format!(
                "maxSegmentSeconds ({}) must exceed minSegmentSeconds ({})",
                self.max_segment_seconds, self.min_segment_seconds
            )));
        }
        if !(self.pause_gap_seconds >= 0.0) {
            return Err(CascadeError::InvalidConfiguration(format!(
                "pauseGapSeconds must be >= 0, got {}",
                self.pause_gap_seconds
            )));
        }
        Ok(())
    }
}

/// Immutable unit of analysis produced by the segmenter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub segment_id: String,
    pub meeting_id: String,
    pub speaker_participant_id: String,
    pub text: String,
    pub start_offset_seconds: f64,
    pub duration_seconds: f64,
}

impl TranscriptSegment {
    /// Build a segment whose id is derived from (meeting, speaker, start offset).
    pub fn new(
        meeting_id: &str,
        speaker_participant_id: &str,
        text: String,
        start_offset_seconds: f64,
        duration_seconds: f64,
    ) -> Self {
        let start_ms = (start_offset_seconds * 1000.0).round() as i64;
        Self {
            segment_id: stable_id(&format!(
                "segment:{meeting_id}:{speaker_participant_id}:{start_ms}"
            )),
            meeting_id: meeting_id.to_string(),
            speaker_participant_id: speaker_participant_id.to_string(),
            text,
            start_offset_seconds,
            duration_seconds,
        }
    }

    pub fn end_offset_seconds(&self) -> f64 {
        self.start_offset_seconds + self.duration_seconds
    }

    /// Leading slice of the text, cut on a word boundary
    pub fn excerpt(&self, max_chars: usize) -> String {
        if self.text.chars().count() <= max_chars {
            return self.text.clone();
        }
        let mut out = String::new();
        for word in self.text.split_whitespace() {
            let needed = if out.is_empty() { word.len() } else { word.len() + 1 };
            if out.chars().count() + needed > max_chars.saturating_sub(3) {
                break;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_id_is_stable() {
        let a = TranscriptSegment::new("MTG-1", "PAR-1", "hello".into(), 12.0, 20.0);
        let b = TranscriptSegment::new("MTG-1", "PAR-1", "different text".into(), 12.0, 30.0);
        let c = TranscriptSegment::new("MTG-1", "PAR-2", "hello".into(), 12.0, 20.0);
        assert_eq!(a.segment_id, b.segment_id);
        assert_ne!(a.segment_id, c.segment_id);
    }

    #[test]
    fn test_excerpt_truncates_on_word_boundary() {
        let segment = TranscriptSegment::new(
            "MTG-1",
            "PAR-1",
            "We should anchor the budget at the two million figure".into(),
            0.0,
            15.0,
        );
        let excerpt = segment.excerpt(24);
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.chars().count() <= 24);
        assert!(excerpt.starts_with("We should anchor"));
        assert_eq!(segment.excerpt(200), segment.text);
    }

    #[test]
    fn test_utterance_covers() {
        let utterance = Utterance {
            participant_id: "PAR-1".into(),
            text: "hi".into(),
            start_time: 1.0,
            end_time: 2.0,
        };
        assert!(utterance.covers(1.0));
        assert!(utterance.covers(1.5));
        assert!(!utterance.covers(2.0));
    }

    #[test]
    fn test_segmenter_config_validation() {
        assert!(SegmenterConfig::default().validate().is_ok());
        let bad = SegmenterConfig {
            min_segment_seconds: 30.0,
            max_segment_seconds: 20.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
