use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CascadeError, CascadeResult};
use crate::models::SegmenterConfig;

/// Runtime configuration for the detection cascade.
///
/// Keys are camelCase on disk so a config file written for the presentation
/// layer can be read here unchanged. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CascadeConfig {
    /// Minimum Stage-1 score for a candidate to be shortlisted
    pub shortlist_floor: f64,
    /// Number of shortlisted candidates per segment sent to Stage 2
    pub stage2_top_k: usize,
    /// Per-candidate Stage-2 deadline in milliseconds
    pub stage2_deadline_ms: u64,
    /// Outer bound on a single Stage-1 screening call
    pub stage1_timeout_ms: u64,
    /// Confidence at or above which a live nudge is attempted
    pub live_nudge_threshold: f64,
    /// Confidence at or above which an event is kept for the report
    pub report_threshold: f64,
    /// Live nudges a participant may receive in one meeting
    pub max_nudges_per_participant_per_session: u32,
    /// Segment boundary settings
    pub segmenter: SegmenterConfig,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            shortlist_floor: 0.50,
            stage2_top_k: 3,
            stage2_deadline_ms: 1_500,
            stage1_timeout_ms: 1_000,
            live_nudge_threshold: 0.70,
            report_threshold: 0.55,
            max_nudges_per_participant_per_session: 2,
            segmenter: SegmenterConfig::default(),
        }
    }
}

impl CascadeConfig {
    /// Reject out-of-range or contradictory settings.
    pub fn validate(&self) -> CascadeResult<()> {
        for (name, value) in [
            ("shortlistFloor", self.shortlist_floor),
            ("liveNudgeThreshold", self.live_nudge_threshold),
            ("reportThreshold", self.report_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CascadeError::InvalidConfiguration(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.report_threshold > self.live_nudge_threshold {
            return Err(CascadeError::InvalidConfiguration(format!(
                "reportThreshold ({}) must not exceed liveNudgeThreshold ({})",
                self.report_threshold, self.live_nudge_threshold
            )));
        }
        if self.shortlist_floor > self.report_threshold {
            return Err(CascadeError::InvalidConfiguration(format!(
                "shortlistFloor ({}) must not exceed reportThreshold ({})",
                self.shortlist_floor, self.report_threshold
            )));
        }
        if self.stage2_top_k == 0 {
            return Err(CascadeError::InvalidConfiguration(
                "stage2TopK must be >= 1".to_string(),
            ));
        }
        if self.stage2_deadline_ms == 0 {
            return Err(CascadeError::InvalidConfiguration(
                "stage2DeadlineMs must be > 0".to_string(),
            ));
        }
        if self.stage1_timeout_ms == 0 {
            return Err(CascadeError::InvalidConfiguration(
                "stage1TimeoutMs must be > 0".to_string(),
            ));
        }
        self.segmenter.validate()
    }

    pub fn stage2_deadline(&self) -> Duration {
        Duration::from_millis(self.stage2_deadline_ms)
    }

    pub fn stage1_timeout(&self) -> Duration {
        Duration::from_millis(self.stage1_timeout_ms)
    }

    /// Parse and validate a JSON config string.
    pub fn from_json(json: &str) -> CascadeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn from_file(path: &Path) -> CascadeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}
