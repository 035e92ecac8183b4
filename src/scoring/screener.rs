use tracing::debug;

use crate::models::{BiasType, TranscriptSegment};
use crate::stages::Screener;

use super::lexicon::{matched_cues, normalize};

/// Stage-1 screener scoring every bias type from cue phrases.
///
/// Deterministic: identical text always yields identical scores.
#[derive(Debug, Clone)]
pub struct LexicalScreener {
    /// Score for a bias type with no matching cue
    pub base_score: f64,
    /// Upper bound on any score
    pub ceiling: f64,
}

impl Default for LexicalScreener {
    fn default() -> Self {
        Self {
            base_score: 0.20,
            ceiling: 0.95,
        }
    }
}

impl LexicalScreener {
    /// One score per bias type in catalog order
    pub fn score_text(&self, text: &str) -> Vec<(BiasType, f64)> {
        let normalized = normalize(text);
        BiasType::ALL
            .iter()
            .map(|&bias_type| {
                let cue_weight: f64 = matched_cues(bias_type, &normalized).map(|c| c.weight).sum();
                (bias_type, (self.base_score + cue_weight).min(self.ceiling))
            })
            .collect()
    }
}

impl Screener for LexicalScreener {
    async fn screen(&self, segment: &TranscriptSegment) -> anyhow::Result<Vec<(BiasType, f64)>> {
        let scores = self.score_text(&segment.text);
        debug!(
            "Screened {}: {} types above base",
            segment.segment_id,
            scores.iter().filter(|(_, s)| *s > self.base_score).count()
        );
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_of(scores: &[(BiasType, f64)], bias: BiasType) -> f64 {
        scores.iter().find(|(b, _)| *b == bias).map(|(_, s)| *s).unwrap()
    }

    #[test]
    fn test_scores_every_type() {
        let scores = LexicalScreener::default().score_text("Nothing notable here.");
        assert_eq!(scores.len(), BiasType::ALL.len());
        assert!(scores.iter().all(|(_, s)| (*s - 0.20).abs() < 1e-9));
    }

    #[test]
    fn test_cues_raise_score() {
        let scores = LexicalScreener::default()
            .score_text("This is the way we've always done it. Why change now?");
        assert!((score_of(&scores, BiasType::StatusQuo) - 0.95).abs() < 1e-9);
        assert!((score_of(&scores, BiasType::Anchoring) - 0.20).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_capped() {
        let screener = LexicalScreener::default();
        let scores = screener.score_text(
            "Guaranteed, no doubt, it cannot fail, I'm a hundred percent sure, absolutely certain.",
        );
        assert_eq!(score_of(&scores, BiasType::Overconfidence), screener.ceiling);
    }

    #[tokio::test]
    async fn test_screen_is_deterministic() {
        let screener = LexicalScreener::default();
        let segment = TranscriptSegment::new("MTG-1", "PAR-1", "We all agree, no objections.".into(), 0.0, 20.0);
        let a = screener.screen(&segment).await.unwrap();
        let b = screener.screen(&segment).await.unwrap();
        assert_eq!(a, b);
        assert!((score_of(&a, BiasType::Groupthink) - 0.90).abs() < 1e-9);
    }
}
