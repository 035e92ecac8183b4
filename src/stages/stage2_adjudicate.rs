use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{BiasCandidate, TranscriptSegment};

/// Slower, higher-precision scorer invoked on shortlisted candidates.
///
/// Implementations never enforce their own deadline; the caller always
/// bounds the call and drops the future when the deadline passes.
pub trait Adjudicator: Send + Sync + 'static {
    fn adjudicate(
        &self,
        candidate: &BiasCandidate,
        segment: &TranscriptSegment,
    ) -> impl Future<Output = anyhow::Result<f64>> + Send;
}

/// Outcome of Stage 2 for one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjudication {
    /// Returned a score before the deadline
    Completed(f64),
    /// Attempted but no certified score before the deadline or cancellation
    TimedOut,
    /// Ranked below top-K; resolved at the Stage-1 score
    NotAttempted,
}

impl Adjudication {
    pub fn score(&self) -> Option<f64> {
        match self {
            Adjudication::Completed(score) => Some(*score),
            _ => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, Adjudication::TimedOut)
    }
}

/// A shortlisted candidate paired with its Stage-2 outcome
#[derive(Debug, Clone, PartialEq)]
pub struct AdjudicatedCandidate {
    pub candidate: BiasCandidate,
    pub adjudication: Adjudication,
}

/// Configuration for Stage 2
#[derive(Debug, Clone)]
pub struct Stage2Config {
    /// Candidates per segment sent for adjudication
    pub top_k: usize,
    /// Independent deadline for each adjudication
    pub deadline: Duration,
}

impl Default for Stage2Config {
    fn default() -> Self {
        Self {
            top_k: 3,
            deadline: Duration::from_millis(1_500),
        }
    }
}

/// Pair each ranked candidate with whether it falls inside the top-K
pub fn plan_stage2(candidates: &[BiasCandidate], top_k: usize) -> Vec<(BiasCandidate, bool)> {
    candidates
        .iter()
        .enumerate()
        .map(|(rank, candidate)| (candidate.clone(), rank < top_k))
        .collect()
}

/// Execute Stage 2: adjudication
///
/// Every planned attempt runs as its own task under its own deadline and a
/// child of `cancel`. A slow sibling never delays or cancels another.
/// Results come back in plan order once every task has settled.
pub async fn execute_stage2<A: Adjudicator>(
    adjudicator: &Arc<A>,
    segment: &TranscriptSegment,
    plan: Vec<(BiasCandidate, bool)>,
    config: &Stage2Config,
    cancel: &CancellationToken,
) -> Vec<AdjudicatedCandidate> {
    let mut outcomes: Vec<Adjudication> = plan
        .iter()
        .map(|(_, attempt)| {
            if *attempt {
                Adjudication::TimedOut
            } else {
                Adjudication::NotAttempted
            }
        })
        .collect();

    let mut tasks = JoinSet::new();
    let shared_segment = Arc::new(segment.clone());

    for (index, (candidate, attempt)) in plan.iter().enumerate() {
        if !attempt {
            continue;
        }
        let adjudicator = Arc::clone(adjudicator);
        let segment = Arc::clone(&shared_segment);
        let candidate = candidate.clone();
        let token = cancel.child_token();
        let deadline = config.deadline;

        tasks.spawn(async move {
            let outcome =
                adjudicate_with_deadline(adjudicator.as_ref(), &candidate, &segment, deadline, &token)
                    .await;
            (index, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = outcome,
            // The slot keeps its TimedOut default
            Err(e) => warn!("Adjudication task for segment {} failed: {}", segment.segment_id, e),
        }
    }

    let attempted = plan.iter().filter(|(_, attempt)| *attempt).count();
    let timed_out = outcomes.iter().filter(|o| o.timed_out()).count();
    info!(
        "Stage 2: segment {} adjudicated {} of {} candidates, {} timed out",
        segment.segment_id,
        attempted,
        plan.len(),
        timed_out
    );

    plan.into_iter()
        .zip(outcomes)
        .map(|((candidate, _), adjudication)| AdjudicatedCandidate {
            candidate,
            adjudication,
        })
        .collect()
}

/// Run one adjudication bounded by `deadline` and `cancel`.
///
/// Errors and non-finite scores cannot be certified and resolve the same
/// way as a timeout. A result arriving after the deadline is dropped.
pub async fn adjudicate_with_deadline<A: Adjudicator>(
    adjudicator: &A,
    candidate: &BiasCandidate,
    segment: &TranscriptSegment,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Adjudication {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(
                "Adjudication of {} on {} cancelled",
                candidate.bias_type, candidate.segment_id
            );
            Adjudication::TimedOut
        }
        result = tokio::time::timeout(deadline, adjudicator.adjudicate(candidate, segment)) => {
            match result {
                Ok(Ok(score)) if score.is_finite() => {
                    debug!(
                        "Adjudicated {} on {}: {:.2}",
                        candidate.bias_type, candidate.segment_id, score
                    );
                    Adjudication::Completed(score.clamp(0.0, 1.0))
                }
                Ok(Ok(score)) => {
                    warn!(
                        "Adjudicator returned non-finite score {} for {}",
                        score, candidate.bias_type
                    );
                    Adjudication::TimedOut
                }
                Ok(Err(e)) => {
                    warn!(
                        "Adjudication of {} on {} failed: {}",
                        candidate.bias_type, candidate.segment_id, e
                    );
                    Adjudication::TimedOut
                }
                Err(_) => {
                    warn!(
                        "Adjudication of {} on {} exceeded {}ms",
                        candidate.bias_type,
                        candidate.segment_id,
                        deadline.as_millis()
                    );
                    Adjudication::TimedOut
                }
            }
        }
    }
}
