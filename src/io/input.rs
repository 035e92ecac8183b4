use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{MeetingRecording, RecordingSet};

/// Largest accepted offset into a meeting: one week
pub const MAX_OFFSET_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

/// Either a set of meetings or a bare single meeting
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordingInput {
    Set(RecordingSet),
    Single(MeetingRecording),
}

/// Parse a recordings JSON file
pub fn parse_recordings_file(path: &Path) -> Result<RecordingSet> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_recordings_json(&content)
}

/// Parse recordings from a JSON string
pub fn parse_recordings_json(json: &str) -> Result<RecordingSet> {
    let input: RecordingInput =
        serde_json::from_str(json).context("Failed to parse recordings JSON")?;
    let set = match input {
        RecordingInput::Set(set) => set,
        RecordingInput::Single(meeting) => RecordingSet {
            meetings: vec![meeting],
        },
    };
    check_recordings(&set)?;
    Ok(set)
}

fn check_recordings(set: &RecordingSet) -> Result<()> {
    let mut seen = HashSet::new();
    for meeting in &set.meetings {
        if meeting.meeting_id.trim().is_empty() {
            anyhow::bail!("Recording with empty meetingId");
        }
        if !seen.insert(meeting.meeting_id.as_str()) {
            anyhow::bail!("Duplicate meetingId in input: {}", meeting.meeting_id);
        }
        if let Some(u) = meeting
            .utterances
            .iter()
            .find(|u| u.participant_id.trim().is_empty())
        {
            anyhow::bail!(
                "Utterance at {:.1}s in {} has no participantId",
                u.start_time,
                meeting.meeting_id
            );
        }
        for u in &meeting.utterances {
            if !valid_offset(u.start_time) || !valid_offset(u.end_time) {
                anyhow::bail!(
                    "Utterance from {} in {} has out-of-range times: {} to {}",
                    u.participant_id,
                    meeting.meeting_id,
                    u.start_time,
                    u.end_time
                );
            }
            if u.end_time < u.start_time {
                anyhow::bail!(
                    "Utterance from {} in {} ends before it starts: {} to {}",
                    u.participant_id,
                    meeting.meeting_id,
                    u.start_time,
                    u.end_time
                );
            }
        }
        for fp in &meeting.flashpoints {
            if !valid_offset(fp.start_offset_seconds)
                || !valid_offset(fp.start_offset_seconds + fp.duration_seconds)
                || fp.duration_seconds < 0.0
            {
                anyhow::bail!(
                    "Flashpoint {} in {} has out-of-range times",
                    fp.flashpoint_id,
                    meeting.meeting_id
                );
            }
        }
    }
    Ok(())
}

fn valid_offset(seconds: f64) -> bool {
    seconds.is_finite() && (0.0..=MAX_OFFSET_SECONDS).contains(&seconds)
}
