use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{CascadeError, CascadeResult};
use crate::models::{BiasCandidate, BiasType, TranscriptSegment};

/// Fast, low-cost scorer run once per segment across the whole catalog.
///
/// Implementations return one score per bias type they evaluated. Scores
/// must be reproducible for identical segment text.
pub trait Screener: Send + Sync + 'static {
    fn screen(
        &self,
        segment: &TranscriptSegment,
    ) -> impl Future<Output = anyhow::Result<Vec<(BiasType, f64)>>> + Send;
}

/// Configuration for Stage 1
#[derive(Debug, Clone)]
pub struct Stage1Config {
    /// Candidates scoring below this are dropped
    pub shortlist_floor: f64,
    /// Outer bound on the screening call
    pub timeout: Duration,
}

impl Default for Stage1Config {
    fn default() -> Self {
        Self {
            shortlist_floor: 0.50,
            timeout: Duration::from_millis(1_000),
        }
    }
}

/// Whether the screener produced usable scores
#[derive(Debug, Clone, PartialEq)]
pub enum ScreeningStatus {
    Screened,
    Failed(String),
}

/// Result of Stage 1 for one segment
#[derive(Debug, Clone)]
pub struct Stage1Result {
    pub segment_id: String,
    /// Shortlisted candidates, highest score first
    pub candidates: Vec<BiasCandidate>,
    /// Number of bias types scored
    pub types_scored: usize,
    pub status: ScreeningStatus,
}

impl Stage1Result {
    pub fn failed(segment_id: &str, reason: impl Into<String>) -> Self {
        Self {
            segment_id: segment_id.to_string(),
            candidates: Vec::new(),
            types_scored: 0,
            status: ScreeningStatus::Failed(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ScreeningStatus::Failed(_))
    }

    /// The shortlist, or the screening failure as an error
    pub fn into_candidates(self) -> CascadeResult<Vec<BiasCandidate>> {
        match self.status {
            ScreeningStatus::Screened => Ok(self.candidates),
            ScreeningStatus::Failed(reason) => Err(CascadeError::Screening {
                segment_id: self.segment_id,
                reason,
            }),
        }
    }
}

/// Execute Stage 1: fast screen
///
/// A screener error or timeout is local to the segment: it is logged and
/// the segment yields no candidates.
pub async fn execute_stage1<S: Screener>(
    screener: &S,
    segment: &TranscriptSegment,
    config: &Stage1Config,
) -> Stage1Result {
    let scores = match tokio::time::timeout(config.timeout, screener.screen(segment)).await {
        Ok(Ok(scores)) => scores,
        Ok(Err(e)) => {
            warn!("Segment {} screening failed: {}", segment.segment_id, e);
            return Stage1Result::failed(&segment.segment_id, e.to_string());
        }
        Err(_) => {
            warn!(
                "Segment {} screening exceeded {}ms",
                segment.segment_id,
                config.timeout.as_millis()
            );
            return Stage1Result::failed(&segment.segment_id, "screening timed out");
        }
    };

    let types_scored = scores.len();
    let candidates = shortlist(&segment.segment_id, scores, config.shortlist_floor);

    info!(
        "Stage 1: segment {} scored {} types, {} shortlisted",
        segment.segment_id,
        types_scored,
        candidates.len()
    );

    Stage1Result {
        segment_id: segment.segment_id.clone(),
        candidates,
        types_scored,
        status: ScreeningStatus::Screened,
    }
}

/// Keep scores at or above the floor, highest first, one per bias type.
///
/// Non-finite scores are dropped. A type scored more than once keeps its
/// highest score. Ties fall back to catalog order so the ranking is stable.
pub fn shortlist(segment_id: &str, scores: Vec<(BiasType, f64)>, floor: f64) -> Vec<BiasCandidate> {
    let mut best: BTreeMap<BiasType, f64> = BTreeMap::new();
    for (bias_type, score) in scores {
        if !score.is_finite() {
            debug!("Dropping non-finite {} score", bias_type);
            continue;
        }
        let score = score.clamp(0.0, 1.0);
        best.entry(bias_type)
            .and_modify(|kept| *kept = kept.max(score))
            .or_insert(score);
    }

    let mut candidates: Vec<BiasCandidate> = best
        .into_iter()
        .filter(|(_, score)| *score >= floor)
        .map(|(bias_type, score)| BiasCandidate {
            segment_id: segment_id.to_string(),
            bias_type,
            stage1_score: score,
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.stage1_score
            .total_cmp(&a.stage1_score)
            .then(a.bias_type.cmp(&b.bias_type))
    });
    candidates
}
