use crate::models::{BiasCandidate, TranscriptSegment};

/// System prompt for the adjudication model
pub const SYSTEM_PROMPT: &str = r#"You are adjudicating a cognitive-bias flag raised on one segment of a live meeting transcript.

A fast screener has already flagged the segment for a single named bias. Your job is to decide how likely it is that the speaker is actually exhibiting that bias in this segment.

RULES:
1. Judge only the named bias. Ignore any other bias the segment may show.
2. Judge only what the speaker says in the segment. Do not speculate about intent beyond the words.
3. Hedged, questioning or self-critical statements are weaker evidence than assertive ones.
4. Quoting or describing someone else's bias is not the speaker exhibiting it.
5. Respond ONLY by calling the submit_verdict tool.

The score is a probability in [0, 1]. Scores of 0.70 and above may interrupt the speaker with a private nudge, so reserve them for clear cases."#;

/// Build the user prompt for one candidate
pub fn build_adjudication_prompt(candidate: &BiasCandidate, segment: &TranscriptSegment) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("# Bias: {}\n", candidate.bias_type));
    prompt.push_str(&format!("Screener score: {:.2}\n", candidate.stage1_score));
    prompt.push_str(&format!(
        "Speaker: {} ({:.1}s - {:.1}s)\n\n",
        segment.speaker_participant_id,
        segment.start_offset_seconds,
        segment.end_offset_seconds()
    ));

    prompt.push_str("## Segment\n");
    prompt.push_str(segment.text.trim());
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "How likely is it that the speaker is exhibiting {} here? Call submit_verdict with your score.",
        candidate.bias_type
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BiasType;

    #[test]
    fn test_prompt_names_bias_and_segment() {
        let segment = TranscriptSegment::new(
            "MTG-1",
            "PAR-3",
            "  We've already spent two million on this.  ".into(),
            30.0,
            20.0,
        );
        let candidate = BiasCandidate {
            segment_id: segment.segment_id.clone(),
            bias_type: BiasType::SunkCost,
            stage1_score: 0.78,
        };

        let prompt = build_adjudication_prompt(&candidate, &segment);
        assert!(prompt.starts_with("# Bias: Sunk Cost Fallacy\n"));
        assert!(prompt.contains("Screener score: 0.78"));
        assert!(prompt.contains("PAR-3 (30.0s - 50.0s)"));
        assert!(prompt.contains("\nWe've already spent two million on this.\n"));
    }
}
