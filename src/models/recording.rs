use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Flashpoint, Utterance};

/// A captured meeting: utterances plus any externally computed flashpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecording {
    pub meeting_id: String,
    /// Wall-clock start; offsets in utterances are relative to it
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub utterances: Vec<Utterance>,
    #[serde(default)]
    pub flashpoints: Vec<Flashpoint>,
}

impl MeetingRecording {
    pub fn participants(&self) -> BTreeSet<&str> {
        self.utterances
            .iter()
            .map(|u| u.participant_id.as_str())
            .collect()
    }

    /// Participants with an utterance in progress at `offset_seconds`
    pub fn speakers_at(&self, offset_seconds: f64) -> BTreeSet<&str> {
        self.utterances
            .iter()
            .filter(|u| u.covers(offset_seconds))
            .map(|u| u.participant_id.as_str())
            .collect()
    }

    /// Offset of the last utterance end
    pub fn duration_seconds(&self) -> f64 {
        self.utterances
            .iter()
            .map(|u| u.end_time)
            .fold(0.0, f64::max)
    }
}

/// Input file: one or more recorded meetings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSet {
    pub meetings: Vec<MeetingRecording>,
}
