pub mod adjudicator;
pub mod lexicon;
pub mod screener;

pub use adjudicator::*;
pub use screener::*;

use crate::llm::LlmAdjudicator;
use crate::models::{BiasCandidate, TranscriptSegment};
use crate::stages::Adjudicator;

/// Stage-2 backend chosen at startup
pub enum AdjudicatorBackend {
    Contextual(ContextualAdjudicator),
    Llm(LlmAdjudicator),
}

impl Adjudicator for AdjudicatorBackend {
    async fn adjudicate(
        &self,
        candidate: &BiasCandidate,
        segment: &TranscriptSegment,
    ) -> anyhow::Result<f64> {
        match self {
            AdjudicatorBackend::Contextual(a) => a.adjudicate(candidate, segment).await,
            AdjudicatorBackend::Llm(a) => a.adjudicate(candidate, segment).await,
        }
    }
}
