use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::CascadeConfig;
use crate::pipeline::MeetingReport;

/// Machine-readable output: every meeting's decisions and summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReport {
    pub generated_at: DateTime<Utc>,
    /// Configuration the run used
    pub config: CascadeConfig,
    pub meetings: Vec<MeetingReport>,
}

impl EventReport {
    pub fn new(config: CascadeConfig, mut meetings: Vec<MeetingReport>) -> Self {
        meetings.sort_by(|a, b| a.summary.meeting_id.cmp(&b.summary.meeting_id));
        Self {
            generated_at: Utc::now(),
            config,
            meetings,
        }
    }

    pub fn total_events(&self) -> usize {
        self.meetings.iter().map(|m| m.summary.bias_events).sum()
    }

    pub fn total_nudges_sent(&self) -> usize {
        self.meetings.iter().map(|m| m.summary.nudges_sent).sum()
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

/// Human-readable per-meeting bias report
pub struct HumanReport<'a> {
    report: &'a EventReport,
}

impl<'a> HumanReport<'a> {
    pub fn new(report: &'a EventReport) -> Self {
        Self { report }
    }

    pub fn format(&self) -> String {
        let mut output = String::new();

        for meeting in &self.report.meetings {
            let summary = &meeting.summary;
            output.push_str(&format!("Meeting {}\n", summary.meeting_id));
            output.push_str(&"=".repeat(8 + summary.meeting_id.len()));
            output.push('\n');
            output.push_str(&format!(
                "Segments: {} ({} screening failures)\n",
                summary.segments_processed, summary.screening_failures
            ));
            output.push_str(&format!(
                "Events: {} | nudges sent: {} | suppressed: {} | report only: {} | unresolved: {}\n",
                summary.bias_events,
                summary.nudges_sent,
                summary.nudges_suppressed,
                summary.logged_for_report,
                summary.unresolved
            ));
            if let Some(avg) = summary.average_confidence {
                output.push_str(&format!("Average confidence: {:.2}\n", avg));
            }
            output.push('\n');

            for decision in &meeting.decisions {
                let event = &decision.event;
                output.push_str(&format!(
                    "[{}] {}: {} ({}, {:.2}) {}\n",
                    format_timestamp(event.segment_start_offset_seconds),
                    event.participant_id,
                    event.bias_type,
                    event.severity,
                    event.confidence_score,
                    event.action
                ));
                output.push_str(&indent(&wrap_text(&event.transcript_excerpt, 76)));
                output.push('\n');

                if let Some(nudge) = &decision.nudge {
                    if nudge.is_delivered() {
                        output.push_str(&format!("    > {}\n", nudge.text));
                    } else if let Some(reason) = nudge.suppression_reason {
                        output.push_str(&format!("    (nudge withheld: {})\n", reason.describe()));
                    }
                }
                if let Some(flashpoint) = &decision.flashpoint_id {
                    output.push_str(&format!("    during flashpoint {}\n", flashpoint));
                }
                output.push('\n');
            }
        }

        output
    }

    /// Write to a text file
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}

/// Format an offset in seconds as MM:SS
fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Wrap text at approximately the given width
fn wrap_text(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        if line_len + word.len() + 1 > width && line_len > 0 {
            result.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            result.push(' ');
            line_len += 1;
        }
        result.push_str(word);
        line_len += word.len();
    }

    result
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::EmittedDecision;
    use crate::models::{BiasAction, BiasEvent, BiasType, NudgeRecord, NudgeStatus, Severity, SuppressionReason};
    use crate::pipeline::MeetingSummary;

    fn summary(meeting_id: &str) -> MeetingSummary {
        MeetingSummary {
            meeting_id: meeting_id.into(),
            segments_processed: 3,
            screening_failures: 0,
            bias_events: 1,
            nudges_sent: 0,
            nudges_suppressed: 1,
            logged_for_report: 0,
            unresolved: 0,
            discarded: 2,
            flashpoint_correlated: 1,
            average_confidence: Some(0.84),
            quota: vec![],
        }
    }

    fn decision() -> EmittedDecision {
        let event_id = BiasEvent::derive_id("seg-1", BiasType::SunkCost);
        EmittedDecision {
            event: BiasEvent {
                event_id: event_id.clone(),
                meeting_id: "MTG-1".into(),
                participant_id: "PAR-1".into(),
                segment_id: "seg-1".into(),
                bias_type: BiasType::SunkCost,
                transcript_excerpt: "We've already invested two million.".into(),
                stage1_score: 0.78,
                stage2_score: Some(0.84),
                confidence_score: 0.84,
                severity: Severity::High,
                action: BiasAction::Suppressed,
                stage2_timed_out: false,
                segment_start_offset_seconds: 754.2,
                segment_duration_seconds: 20.0,
                created_at: Utc::now(),
            },
            nudge: Some(NudgeRecord {
                nudge_id: NudgeRecord::derive_id(&event_id),
                bias_event_id: event_id,
                meeting_id: "MTG-1".into(),
                participant_id: "PAR-1".into(),
                text: "Consider it fresh.".into(),
                status: NudgeStatus::Suppressed,
                suppression_reason: Some(SuppressionReason::QuotaExceeded),
                latency_ms: 12,
                created_at: Utc::now(),
            }),
            flashpoint_id: Some("FLP-7".into()),
        }
    }

    fn report() -> EventReport {
        EventReport::new(
            CascadeConfig::default(),
            vec![
                MeetingReport {
                    summary: summary("MTG-2"),
                    decisions: vec![],
                },
                MeetingReport {
                    summary: summary("MTG-1"),
                    decisions: vec![decision()],
                },
            ],
        )
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.9), "01:05");
        assert_eq!(format_timestamp(754.2), "12:34");
    }

    #[test]
    fn test_wrap_text() {
        let text = "This is a test of the text wrapping function that should wrap at 20 chars";
        let wrapped = wrap_text(text, 20);
        for line in wrapped.lines() {
            assert!(line.len() <= 20);
        }
    }

    #[test]
    fn test_human_report() {
        let report = report();
        let text = HumanReport::new(&report).format();
        assert!(text.starts_with("Meeting MTG-1\n"));
        assert!(text.contains("[12:34] PAR-1: Sunk Cost Fallacy (high, 0.84) suppressed\n"));
        assert!(text.contains("(nudge withheld: Nudge quota reached for this participant)"));
        assert!(text.contains("during flashpoint FLP-7"));
    }

    #[test]
    fn test_human_report_shows_delivered_nudge() {
        let mut sent = decision();
        sent.event.action = BiasAction::NudgeSent;
        if let Some(nudge) = sent.nudge.as_mut() {
            nudge.status = NudgeStatus::Delivered;
            nudge.suppression_reason = None;
        }
        let report = EventReport::new(
            CascadeConfig::default(),
            vec![MeetingReport {
                summary: summary("MTG-1"),
                decisions: vec![sent],
            }],
        );
        let text = HumanReport::new(&report).format();
        assert!(text.contains("    > Consider it fresh.\n"));
        assert!(!text.contains("nudge withheld"));
    }

    #[test]
    fn test_write_json() {
        let report = report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["meetings"][0]["summary"]["meetingId"], "MTG-1");
        assert_eq!(
            value["meetings"][0]["decisions"][0]["nudge"]["suppressionReason"],
            "quota-exceeded"
        );
        assert_eq!(value["config"]["stage2TopK"], 3);
        assert_eq!(report.total_events(), 2);
    }
}
