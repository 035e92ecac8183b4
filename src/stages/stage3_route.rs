use serde::{Deserialize, Serialize};

use crate::config::CascadeConfig;
use crate::stages::AdjudicatedCandidate;

/// Where a scored candidate goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutingDecision {
    LiveNudgeCandidate,
    ReportOnly,
    Discard,
    Unresolved,
}

/// Confidence thresholds used for routing.
///
/// Bands are inclusive below and exclusive above, so every score lands in
/// exactly one band. A timed-out Stage 2 overrides the bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Router {
    pub report_threshold: f64,
    pub live_nudge_threshold: f64,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            report_threshold: 0.55,
            live_nudge_threshold: 0.70,
        }
    }
}

impl Router {
    pub fn from_config(config: &CascadeConfig) -> Self {
        Self {
            report_threshold: config.report_threshold,
            live_nudge_threshold: config.live_nudge_threshold,
        }
    }

    /// Total and side-effect free. NaN falls through to `Discard`.
    pub fn route(&self, confidence: f64, stage2_timed_out: bool) -> RoutingDecision {
        if stage2_timed_out {
            RoutingDecision::Unresolved
        } else if confidence >= self.live_nudge_threshold {
            RoutingDecision::LiveNudgeCandidate
        } else if confidence >= self.report_threshold {
            RoutingDecision::ReportOnly
        } else {
            RoutingDecision::Discard
        }
    }
}

/// Route with the default 0.55 / 0.70 thresholds
pub fn route(confidence: f64, stage2_timed_out: bool) -> RoutingDecision {
    Router::default().route(confidence, stage2_timed_out)
}

/// The scores a candidate is finally judged on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedScore {
    pub stage1_score: f64,
    pub stage2_score: Option<f64>,
    /// The score that produced the routing decision
    pub confidence_score: f64,
    pub stage2_timed_out: bool,
}

impl ResolvedScore {
    /// Stage-2 score when it completed, otherwise the Stage-1 score
    pub fn from_adjudicated(adjudicated: &AdjudicatedCandidate) -> Self {
        let stage1_score = adjudicated.candidate.stage1_score;
        let stage2_score = adjudicated.adjudication.score();
        Self {
            stage1_score,
            stage2_score,
            confidence_score: stage2_score.unwrap_or(stage1_score),
            stage2_timed_out: adjudicated.adjudication.timed_out(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BiasCandidate, BiasType};
    use crate::stages::Adjudication;

    #[test]
    fn test_route_boundaries() {
        assert_eq!(route(0.5499, false), RoutingDecision::Discard);
        assert_eq!(route(0.55, false), RoutingDecision::ReportOnly);
        assert_eq!(route(0.6999, false), RoutingDecision::ReportOnly);
        assert_eq!(route(0.70, false), RoutingDecision::LiveNudgeCandidate);
        assert_eq!(route(1.0, false), RoutingDecision::LiveNudgeCandidate);
        assert_eq!(route(0.0, false), RoutingDecision::Discard);
    }

    #[test]
    fn test_route_bands_over_full_range() {
        for step in 0..=1000 {
            let c = step as f64 / 1000.0;
            let expected = if c < 0.55 {
                RoutingDecision::Discard
            } else if c < 0.70 {
                RoutingDecision::ReportOnly
            } else {
                RoutingDecision::LiveNudgeCandidate
            };
            assert_eq!(route(c, false), expected, "confidence {c}");
        }
    }

    #[test]
    fn test_timeout_always_unresolved() {
        for c in [0.0, 0.3, 0.55, 0.69, 0.70, 0.82, 1.0, f64::NAN] {
            assert_eq!(route(c, true), RoutingDecision::Unresolved);
        }
    }

    #[test]
    fn test_nan_discarded() {
        assert_eq!(route(f64::NAN, false), RoutingDecision::Discard);
    }

    #[test]
    fn test_custom_thresholds() {
        let router = Router {
            report_threshold: 0.6,
            live_nudge_threshold: 0.9,
        };
        assert_eq!(router.route(0.85, false), RoutingDecision::ReportOnly);
        assert_eq!(router.route(0.9, false), RoutingDecision::LiveNudgeCandidate);
    }

    fn adjudicated(adjudication: Adjudication) -> AdjudicatedCandidate {
        AdjudicatedCandidate {
            candidate: BiasCandidate {
                segment_id: "seg".into(),
                bias_type: BiasType::Anchoring,
                stage1_score: 0.82,
            },
            adjudication,
        }
    }

    #[test]
    fn test_resolved_score_fallbacks() {
        let completed = ResolvedScore::from_adjudicated(&adjudicated(Adjudication::Completed(0.6)));
        assert_eq!(completed.confidence_score, 0.6);
        assert_eq!(completed.stage2_score, Some(0.6));

        let timed_out = ResolvedScore::from_adjudicated(&adjudicated(Adjudication::TimedOut));
        assert_eq!(timed_out.confidence_score, 0.82);
        assert_eq!(timed_out.stage2_score, None);
        assert!(timed_out.stage2_timed_out);

        let skipped = ResolvedScore::from_adjudicated(&adjudicated(Adjudication::NotAttempted));
        assert_eq!(skipped.confidence_score, 0.82);
        assert!(!skipped.stage2_timed_out);
    }
}
