use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed catalog of bias types screened in Stage 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BiasType {
    #[serde(rename = "Anchoring Bias")]
    Anchoring,
    #[serde(rename = "Confirmation Bias")]
    Confirmation,
    #[serde(rename = "Groupthink")]
    Groupthink,
    #[serde(rename = "Availability Heuristic")]
    Availability,
    #[serde(rename = "Sunk Cost Fallacy")]
    SunkCost,
    #[serde(rename = "Authority Bias")]
    Authority,
    #[serde(rename = "Recency Bias")]
    Recency,
    #[serde(rename = "Bandwagon Effect")]
    Bandwagon,
    #[serde(rename = "Status Quo Bias")]
    StatusQuo,
    #[serde(rename = "Framing Effect")]
    Framing,
    #[serde(rename = "Overconfidence Bias")]
    Overconfidence,
    #[serde(rename = "Planning Fallacy")]
    PlanningFallacy,
}

impl BiasType {
    pub const ALL: [BiasType; 12] = [
        BiasType::Anchoring,
        BiasType::Confirmation,
        BiasType::Groupthink,
        BiasType::Availability,
        BiasType::SunkCost,
        BiasType::Authority,
        BiasType::Recency,
        BiasType::Bandwagon,
        BiasType::StatusQuo,
        BiasType::Framing,
        BiasType::Overconfidence,
        BiasType::PlanningFallacy,
    ];

    /// Display name, matching the serialized form
    pub fn name(self) -> &'static str {
        match self {
            BiasType::Anchoring => "Anchoring Bias",
            BiasType::Confirmation => "Confirmation Bias",
            BiasType::Groupthink => "Groupthink",
            BiasType::Availability => "Availability Heuristic",
            BiasType::SunkCost => "Sunk Cost Fallacy",
            BiasType::Authority => "Authority Bias",
            BiasType::Recency => "Recency Bias",
            BiasType::Bandwagon => "Bandwagon Effect",
            BiasType::StatusQuo => "Status Quo Bias",
            BiasType::Framing => "Framing Effect",
            BiasType::Overconfidence => "Overconfidence Bias",
            BiasType::PlanningFallacy => "Planning Fallacy",
        }
    }

    /// Short machine key, used in derived ids
    pub fn slug(self) -> &'static str {
        match self {
            BiasType::Anchoring => "anchoring",
            BiasType::Confirmation => "confirmation",
            BiasType::Groupthink => "groupthink",
            BiasType::Availability => "availability",
            BiasType::SunkCost => "sunk_cost",
            BiasType::Authority => "authority",
            BiasType::Recency => "recency",
            BiasType::Bandwagon => "bandwagon",
            BiasType::StatusQuo => "status_quo",
            BiasType::Framing => "framing",
            BiasType::Overconfidence => "overconfidence",
            BiasType::PlanningFallacy => "planning_fallacy",
        }
    }
}

impl fmt::Display for BiasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage-1 output for one (segment, bias type) pair that cleared the shortlist floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasCandidate {
    pub segment_id: String,
    pub bias_type: BiasType,
    pub stage1_score: f64,
}

/// Severity band derived from the final confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const MEDIUM_FLOOR: f64 = 0.625;
    pub const HIGH_FLOOR: f64 = 0.70;
    pub const CRITICAL_FLOOR: f64 = 0.85;

    /// Monotonic banding; anything under the medium floor (including
    /// sub-report scores kept only because Stage 2 timed out) is low.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= Self::CRITICAL_FLOOR {
            Severity::Critical
        } else if confidence >= Self::HIGH_FLOOR {
            Severity::High
        } else if confidence >= Self::MEDIUM_FLOOR {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}
