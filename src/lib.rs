pub mod config;
pub mod emit;
pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod nudge;
pub mod pipeline;
pub mod scoring;
pub mod stages;

pub use config::CascadeConfig;
pub use emit::{EmittedDecision, EventEmitter};
pub use error::{CascadeError, CascadeResult};
pub use io::{parse_recordings_file, parse_recordings_json, EventReport, HumanReport};
pub use llm::{AnthropicClient, AnthropicConfig, LlmAdjudicator};
pub use models::{
    BiasAction, BiasCandidate, BiasEvent, BiasType, Flashpoint, MeetingRecording, NudgeRecord,
    NudgeStatus, RecordingSet, SegmenterConfig, Severity, SuppressionReason, TranscriptSegment,
    Utterance,
};
pub use nudge::{NudgeQuotaTracker, SpeakerTracker};
pub use pipeline::{Cascade, Decision, MeetingReport, MeetingSummary, SegmentOutcome};
pub use scoring::{AdjudicatorBackend, ContextualAdjudicator, LexicalScreener};
pub use stages::{
    execute_stage1, execute_stage2, plan_stage2, route, segment_transcript, Adjudication,
    Adjudicator, Router, RoutingDecision, Screener, Segmenter, Stage1Config, Stage2Config,
};
