use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{stable_id, BiasType, Severity};

/// Final action recorded on a bias event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BiasAction {
    NudgeSent,
    LoggedForReport,
    Suppressed,
    Unresolved,
}

impl fmt::Display for BiasAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BiasAction::NudgeSent => "nudge-sent",
            BiasAction::LoggedForReport => "logged-for-report",
            BiasAction::Suppressed => "suppressed",
            BiasAction::Unresolved => "unresolved",
        };
        f.write_str(name)
    }
}

/// Durable, immutable record of one detection decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasEvent {
    pub event_id: String,
    pub meeting_id: String,
    pub participant_id: String,
    pub segment_id: String,
    pub bias_type: BiasType,
    pub transcript_excerpt: String,
    pub stage1_score: f64,
    pub stage2_score: Option<f64>,
    pub confidence_score: f64,
    pub severity: Severity,
    pub action: BiasAction,
    pub stage2_timed_out: bool,
    pub segment_start_offset_seconds: f64,
    pub segment_duration_seconds: f64,
    pub created_at: DateTime<Utc>,
}

impl BiasEvent {
    /// Deterministic id for a (segment, bias type) pair
    pub fn derive_id(segment_id: &str, bias_type: BiasType) -> String {
        stable_id(&format!("event:{segment_id}:{}", bias_type.slug()))
    }
}

/// Delivery status of a nudge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeStatus {
    Delivered,
    Suppressed,
}

/// Why a routed nudge was withheld
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuppressionReason {
    /// The participant already received the per-session maximum
    QuotaExceeded,
    /// The participant is mid-utterance at delivery time
    ActiveSpeakerTurn,
    /// The meeting ended before the nudge could be delivered
    MeetingEnded,
}

impl SuppressionReason {
    pub fn describe(self) -> &'static str {
        match self {
            SuppressionReason::QuotaExceeded => "Nudge quota reached for this participant",
            SuppressionReason::ActiveSpeakerTurn => {
                "Active speaker turn; delivery withheld to avoid disruption"
            }
            SuppressionReason::MeetingEnded => "Meeting ended before delivery",
        }
    }
}

impl fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuppressionReason::QuotaExceeded => "quota-exceeded",
            SuppressionReason::ActiveSpeakerTurn => "active-speaker-turn",
            SuppressionReason::MeetingEnded => "meeting-ended",
        };
        f.write_str(name)
    }
}

/// Delivery attempt tied 1:1 to a bias event routed as a live-nudge candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeRecord {
    pub nudge_id: String,
    pub bias_event_id: String,
    pub meeting_id: String,
    pub participant_id: String,
    pub text: String,
    pub status: NudgeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppression_reason: Option<SuppressionReason>,
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl NudgeRecord {
    pub fn derive_id(bias_event_id: &str) -> String {
        stable_id(&format!("nudge:{bias_event_id}"))
    }

    pub fn is_delivered(&self) -> bool {
        self.status == NudgeStatus::Delivered
    }
}

/// Externally computed high-tension window, correlated by time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashpoint {
    pub flashpoint_id: String,
    pub start_offset_seconds: f64,
    pub duration_seconds: f64,
    #[serde(default)]
    pub tension_peak: f64,
}

impl Flashpoint {
    /// Whether this window overlaps `[start, start + duration)`
    pub fn overlaps(&self, start: f64, duration: f64) -> bool {
        let end = start + duration;
        let fp_end = self.start_offset_seconds + self.duration_seconds;
        self.start_offset_seconds < end && start < fp_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_depends_on_segment_and_type() {
        let a = BiasEvent::derive_id("seg-1", BiasType::Anchoring);
        assert_eq!(a, BiasEvent::derive_id("seg-1", BiasType::Anchoring));
        assert_ne!(a, BiasEvent::derive_id("seg-1", BiasType::Groupthink));
        assert_ne!(a, BiasEvent::derive_id("seg-2", BiasType::Anchoring));
    }

    #[test]
    fn test_action_wire_names() {
        assert_eq!(
            serde_json::to_string(&BiasAction::NudgeSent).unwrap(),
            "\"nudge-sent\""
        );
        assert_eq!(
            serde_json::to_string(&BiasAction::LoggedForReport).unwrap(),
            "\"logged-for-report\""
        );
        assert_eq!(
            serde_json::to_string(&SuppressionReason::QuotaExceeded).unwrap(),
            "\"quota-exceeded\""
        );
        assert_eq!(SuppressionReason::ActiveSpeakerTurn.to_string(), "active-speaker-turn");
    }

    #[test]
    fn test_flashpoint_overlap() {
        let fp = Flashpoint {
            flashpoint_id: "FLP-1".into(),
            start_offset_seconds: 100.0,
            duration_seconds: 30.0,
            tension_peak: 0.8,
        };
        assert!(fp.overlaps(90.0, 20.0));
        assert!(fp.overlaps(120.0, 60.0));
        assert!(!fp.overlaps(130.0, 10.0));
        assert!(!fp.overlaps(50.0, 50.0));
    }
}
