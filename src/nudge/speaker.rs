use std::collections::HashSet;

use dashmap::DashMap;

/// Live record of which participants are mid-utterance, per meeting.
///
/// Fed by the transcription side; read by the quota tracker at delivery time.
#[derive(Debug, Default)]
pub struct SpeakerTracker {
    speaking: DashMap<String, HashSet<String>>,
}

impl SpeakerTracker {
    pub fn set_speaking(&self, meeting_id: &str, participant_id: &str, speaking: bool) {
        let mut active = self.speaking.entry(meeting_id.to_string()).or_default();
        if speaking {
            active.insert(participant_id.to_string());
        } else {
            active.remove(participant_id);
        }
    }

    /// Replace the whole active set for a meeting
    pub fn set_active_speakers<I, S>(&self, meeting_id: &str, participants: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let active: HashSet<String> = participants.into_iter().map(Into::into).collect();
        self.speaking.insert(meeting_id.to_string(), active);
    }

    pub fn is_mid_utterance(&self, meeting_id: &str, participant_id: &str) -> bool {
        self.speaking
            .get(meeting_id)
            .is_some_and(|active| active.contains(participant_id))
    }

    pub fn clear_meeting(&self, meeting_id: &str) {
        self.speaking.remove(meeting_id);
    }
}
