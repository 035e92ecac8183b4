use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::models::SuppressionReason;
use crate::nudge::SpeakerTracker;

/// Per-participant nudge counter for one meeting session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantQuotaState {
    pub nudges_delivered_this_session: u32,
    pub max_per_session: u32,
}

/// Result of a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Suppressed(SuppressionReason),
}

type MeetingQuota = DashMap<String, ParticipantQuotaState>;

/// Keyed store of quota state, one entry per (meeting, participant).
///
/// The check-and-increment for a key runs while holding that key's entry
/// guard, so two concurrent deliveries for one participant are serialized
/// and cannot both see spare quota.
#[derive(Debug)]
pub struct NudgeQuotaTracker {
    max_per_session: u32,
    meetings: DashMap<String, Arc<MeetingQuota>>,
}

impl NudgeQuotaTracker {
    pub fn new(max_per_session: u32) -> Self {
        Self {
            max_per_session,
            meetings: DashMap::new(),
        }
    }

    /// Start tracking a meeting with every participant at zero
    pub fn open_meeting(&self, meeting_id: &str) {
        self.meetings
            .insert(meeting_id.to_string(), Arc::new(DashMap::new()));
    }

    /// Discard a meeting's quota state, returning the final counters
    pub fn close_meeting(&self, meeting_id: &str) -> Vec<(String, ParticipantQuotaState)> {
        let Some((_, quota)) = self.meetings.remove(meeting_id) else {
            return Vec::new();
        };
        let mut states: Vec<(String, ParticipantQuotaState)> = quota
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        info!("Quota state for meeting {} discarded ({} participants)", meeting_id, states.len());
        states
    }

    /// Current counter for a participant, if the meeting is tracked
    pub fn state(&self, meeting_id: &str, participant_id: &str) -> Option<ParticipantQuotaState> {
        let quota = self.meeting(meeting_id)?;
        let state = quota
            .get(participant_id)
            .map(|s| *s)
            .unwrap_or(ParticipantQuotaState {
                nudges_delivered_this_session: 0,
                max_per_session: self.max_per_session,
            });
        Some(state)
    }

    /// Attempt one delivery.
    ///
    /// The speaker check runs under the entry guard, immediately before the
    /// increment, so it reflects speaker state at delivery time.
    pub fn try_deliver(
        &self,
        meeting_id: &str,
        participant_id: &str,
        speakers: &SpeakerTracker,
    ) -> DeliveryOutcome {
        let Some(quota) = self.meeting(meeting_id) else {
            return DeliveryOutcome::Suppressed(SuppressionReason::MeetingEnded);
        };

        let mut state = quota
            .entry(participant_id.to_string())
            .or_insert(ParticipantQuotaState {
                nudges_delivered_this_session: 0,
                max_per_session: self.max_per_session,
            });

        if state.nudges_delivered_this_session >= state.max_per_session {
            debug!(
                "Nudge for {} in {} suppressed: quota {}/{}",
                participant_id, meeting_id, state.nudges_delivered_this_session, state.max_per_session
            );
            return DeliveryOutcome::Suppressed(SuppressionReason::QuotaExceeded);
        }

        if speakers.is_mid_utterance(meeting_id, participant_id) {
            debug!("Nudge for {} in {} suppressed: speaking", participant_id, meeting_id);
            return DeliveryOutcome::Suppressed(SuppressionReason::ActiveSpeakerTurn);
        }

        state.nudges_delivered_this_session += 1;
        DeliveryOutcome::Delivered
    }

    fn meeting(&self, meeting_id: &str) -> Option<Arc<MeetingQuota>> {
        // Clone out so the outer shard lock is released before touching the inner map
        self.meetings.get(meeting_id).map(|q| Arc::clone(q.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_third_nudge_exceeds_quota() {
        let tracker = NudgeQuotaTracker::new(2);
        let speakers = SpeakerTracker::default();
        tracker.open_meeting("MTG-1");

        assert_eq!(tracker.try_deliver("MTG-1", "PAR-1", &speakers), DeliveryOutcome::Delivered);
        assert_eq!(tracker.try_deliver("MTG-1", "PAR-1", &speakers), DeliveryOutcome::Delivered);
        assert_eq!(
            tracker.try_deliver("MTG-1", "PAR-1", &speakers),
            DeliveryOutcome::Suppressed(SuppressionReason::QuotaExceeded)
        );
        assert_eq!(
            tracker.state("MTG-1", "PAR-1").unwrap().nudges_delivered_this_session,
            2
        );
        // Other participants are unaffected
        assert_eq!(tracker.try_deliver("MTG-1", "PAR-2", &speakers), DeliveryOutcome::Delivered);
    }

    #[test]
    fn test_active_speaker_suppressed_without_consuming_quota() {
        let tracker = NudgeQuotaTracker::new(2);
        let speakers = SpeakerTracker::default();
        tracker.open_meeting("MTG-1");
        speakers.set_speaking("MTG-1", "PAR-1", true);

        assert_eq!(
            tracker.try_deliver("MTG-1", "PAR-1", &speakers),
            DeliveryOutcome::Suppressed(SuppressionReason::ActiveSpeakerTurn)
        );
        assert_eq!(
            tracker.state("MTG-1", "PAR-1").unwrap().nudges_delivered_this_session,
            0
        );

        speakers.set_speaking("MTG-1", "PAR-1", false);
        assert_eq!(tracker.try_deliver("MTG-1", "PAR-1", &speakers), DeliveryOutcome::Delivered);
    }

    #[test]
    fn test_closed_meeting_suppresses_and_discards() {
        let tracker = NudgeQuotaTracker::new(2);
        let speakers = SpeakerTracker::default();
        tracker.open_meeting("MTG-1");
        tracker.try_deliver("MTG-1", "PAR-1", &speakers);

        let states = tracker.close_meeting("MTG-1");
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].1.nudges_delivered_this_session, 1);
        assert!(tracker.state("MTG-1", "PAR-1").is_none());
        assert_eq!(
            tracker.try_deliver("MTG-1", "PAR-1", &speakers),
            DeliveryOutcome::Suppressed(SuppressionReason::MeetingEnded)
        );
    }

    #[test]
    fn test_concurrent_deliveries_never_over_deliver() {
        let tracker = Arc::new(NudgeQuotaTracker::new(2));
        let speakers = Arc::new(SpeakerTracker::default());
        tracker.open_meeting("MTG-1");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let speakers = Arc::clone(&speakers);
                std::thread::spawn(move || tracker.try_deliver("MTG-1", "PAR-1", &speakers))
            })
            .collect();

        let delivered = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| *o == DeliveryOutcome::Delivered)
            .count();

        assert_eq!(delivered, 2);
        assert_eq!(
            tracker.state("MTG-1", "PAR-1").unwrap().nudges_delivered_this_session,
            2
        );
    }
}
