use crate::models::{BiasCandidate, BiasType, TranscriptSegment};
use crate::stages::Adjudicator;

use super::lexicon::{count_markers, matched_cues, normalize, HEDGES, INTENSIFIERS};

/// Stage-2 adjudicator that re-reads the segment for context the screener ignores.
///
/// Starts from the Stage-1 score and adjusts it: intensifiers and
/// corroborating cues raise it, hedges and questions lower it.
#[derive(Debug, Clone)]
pub struct ContextualAdjudicator {
    pub intensifier_boost: f64,
    pub hedge_penalty: f64,
    pub question_penalty: f64,
    /// Added when two or more distinct cues for the bias appear
    pub corroboration_boost: f64,
}

impl Default for ContextualAdjudicator {
    fn default() -> Self {
        Self {
            intensifier_boost: 0.04,
            hedge_penalty: 0.06,
            question_penalty: 0.05,
            corroboration_boost: 0.06,
        }
    }
}

impl ContextualAdjudicator {
    pub fn assess(&self, bias_type: BiasType, stage1_score: f64, text: &str) -> f64 {
        let normalized = normalize(text);
        let intensifiers = count_markers(&normalized, INTENSIFIERS) as f64;
        let hedges = count_markers(&normalized, HEDGES) as f64;

        let mut score = stage1_score + intensifiers * self.intensifier_boost
            - hedges * self.hedge_penalty;
        if text.contains('?') {
            score -= self.question_penalty;
        }
        if matched_cues(bias_type, &normalized).count() >= 2 {
            score += self.corroboration_boost;
        }
        score.clamp(0.0, 1.0)
    }
}

impl Adjudicator for ContextualAdjudicator {
    async fn adjudicate(
        &self,
        candidate: &BiasCandidate,
        segment: &TranscriptSegment,
    ) -> anyhow::Result<f64> {
        Ok(self.assess(candidate.bias_type, candidate.stage1_score, &segment.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hedges_lower_score() {
        let adj = ContextualAdjudicator::default();
        let score = adj.assess(BiasType::Anchoring, 0.60, "Maybe we could anchor on that, perhaps.");
        assert!((score - 0.48).abs() < 1e-9);
    }

    #[test]
    fn test_intensifiers_and_corroboration_raise_score() {
        let adj = ContextualAdjudicator::default();
        let score = adj.assess(
            BiasType::SunkCost,
            0.75,
            "We've clearly already invested too much, we've come this far.",
        );
        // one intensifier, two cues
        assert!((score - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_question_and_clamp() {
        let adj = ContextualAdjudicator::default();
        assert!((adj.assess(BiasType::Groupthink, 0.70, "Do we all agree?") - 0.65).abs() < 1e-9);
        assert_eq!(adj.assess(BiasType::Groupthink, 0.02, "Maybe? Perhaps? Possibly?"), 0.0);
        assert_eq!(
            adj.assess(BiasType::Overconfidence, 0.99, "Definitely, absolutely, certainly, no doubt."),
            1.0
        );
    }
}
