use tracing::debug;

use crate::models::{BiasCandidate, TranscriptSegment};
use crate::stages::Adjudicator;

use super::{build_adjudication_prompt, AnthropicClient, SYSTEM_PROMPT};

/// Stage-2 adjudicator backed by the Anthropic messages API.
///
/// The Stage-2 deadline bounds each call; a slow or failed request resolves
/// as a timed-out adjudication upstream.
pub struct LlmAdjudicator {
    client: AnthropicClient,
}

impl LlmAdjudicator {
    pub fn new(client: AnthropicClient) -> Self {
        Self { client }
    }
}

impl Adjudicator for LlmAdjudicator {
    async fn adjudicate(
        &self,
        candidate: &BiasCandidate,
        segment: &TranscriptSegment,
    ) -> anyhow::Result<f64> {
        let prompt = build_adjudication_prompt(candidate, segment);
        let verdict = self.client.send_with_tool(SYSTEM_PROMPT, &prompt).await?;
        debug!(
            "{} scored {} on {} at {:.2}: {}",
            self.client.model(),
            candidate.bias_type,
            segment.segment_id,
            verdict.score,
            verdict.rationale
        );
        Ok(verdict.score)
    }
}
