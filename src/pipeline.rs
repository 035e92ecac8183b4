use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CascadeConfig;
use crate::emit::{EmittedDecision, EventEmitter};
use crate::error::{CascadeError, CascadeResult};
use crate::models::{
    BiasAction, BiasEvent, BiasType, Flashpoint, MeetingRecording, NudgeRecord, NudgeStatus,
    Severity, SuppressionReason, TranscriptSegment,
};
use crate::nudge::{nudge_text, DeliveryOutcome, NudgeQuotaTracker, ParticipantQuotaState, SpeakerTracker};
use crate::stages::{
    execute_stage1, execute_stage2, plan_stage2, segment_transcript, AdjudicatedCandidate,
    Adjudicator, ResolvedScore, Router, RoutingDecision, ScreeningStatus, Screener, Stage1Config,
    Stage1Result, Stage2Config,
};

/// Longest transcript excerpt stored on an event
const EXCERPT_CHARS: usize = 200;

/// The routed outcome for one (segment, bias type) pair
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub bias_type: BiasType,
    pub routing: RoutingDecision,
    /// `None` when the candidate was discarded
    pub event: Option<BiasEvent>,
    pub nudge: Option<NudgeRecord>,
    pub flashpoint_id: Option<String>,
}

/// Everything the pipeline decided for one segment
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub segment_id: String,
    pub meeting_id: String,
    pub screening: ScreeningStatus,
    /// Decisions in Stage-1 rank order
    pub decisions: Vec<Decision>,
}

impl SegmentOutcome {
    fn screening_failed(segment: &TranscriptSegment, stage1: Stage1Result) -> Self {
        Self {
            segment_id: segment.segment_id.clone(),
            meeting_id: segment.meeting_id.clone(),
            screening: stage1.status,
            decisions: Vec::new(),
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &BiasEvent> {
        self.decisions.iter().filter_map(|d| d.event.as_ref())
    }

    pub fn event_for(&self, bias_type: BiasType) -> Option<&BiasEvent> {
        self.events().find(|e| e.bias_type == bias_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantQuota {
    pub participant_id: String,
    pub nudges_delivered: u32,
    pub max_per_session: u32,
}

/// Per-meeting totals reported when a meeting ends
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummary {
    pub meeting_id: String,
    pub segments_processed: usize,
    pub screening_failures: usize,
    pub bias_events: usize,
    pub nudges_sent: usize,
    pub nudges_suppressed: usize,
    pub logged_for_report: usize,
    pub unresolved: usize,
    pub discarded: usize,
    pub flashpoint_correlated: usize,
    pub average_confidence: Option<f64>,
    pub quota: Vec<ParticipantQuota>,
}

/// Final state of a meeting: its summary and every decision that produced an event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingReport {
    pub summary: MeetingSummary,
    pub decisions: Vec<EmittedDecision>,
}

impl MeetingReport {
    pub fn events(&self) -> impl Iterator<Item = &BiasEvent> {
        self.decisions.iter().map(|d| &d.event)
    }

    pub fn nudges(&self) -> impl Iterator<Item = &NudgeRecord> {
        self.decisions.iter().filter_map(|d| d.nudge.as_ref())
    }
}

#[derive(Debug, Default)]
struct DecisionLog {
    order: Vec<Decision>,
    index: HashMap<String, usize>,
}

/// State owned by one live meeting
#[derive(Debug)]
struct MeetingSession {
    meeting_id: String,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    /// Held shared by every in-flight segment; `end_meeting` takes it exclusively
    in_flight: RwLock<()>,
    decisions: Mutex<DecisionLog>,
    segments_processed: AtomicUsize,
    screening_failures: AtomicUsize,
}

/// `at` moved by `millis`, saturating at the representable range
fn shift_millis(at: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
    TimeDelta::try_milliseconds(millis)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(if millis < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

impl MeetingSession {
    fn new(meeting_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            meeting_id: meeting_id.to_string(),
            started_at,
            cancel: CancellationToken::new(),
            in_flight: RwLock::new(()),
            decisions: Mutex::new(DecisionLog::default()),
            segments_processed: AtomicUsize::new(0),
            screening_failures: AtomicUsize::new(0),
        }
    }

    fn at_offset(&self, offset_seconds: f64) -> DateTime<Utc> {
        shift_millis(self.started_at, (offset_seconds * 1000.0).round() as i64)
    }

    fn log(&self) -> MutexGuard<'_, DecisionLog> {
        self.decisions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recorded(&self, event_id: &str) -> Option<Decision> {
        let log = self.log();
        log.index.get(event_id).map(|&i| log.order[i].clone())
    }

    fn record(&self, event_id: String, decision: Decision) {
        let mut log = self.log();
        if log.index.contains_key(&event_id) {
            return;
        }
        let position = log.order.len();
        log.order.push(decision);
        log.index.insert(event_id, position);
    }

    fn report(&self, quota: Vec<(String, ParticipantQuotaState)>) -> MeetingReport {
        let log = self.log();
        let mut summary = MeetingSummary {
            meeting_id: self.meeting_id.clone(),
            segments_processed: self.segments_processed.load(Ordering::Relaxed),
            screening_failures: self.screening_failures.load(Ordering::Relaxed),
            bias_events: 0,
            nudges_sent: 0,
            nudges_suppressed: 0,
            logged_for_report: 0,
            unresolved: 0,
            discarded: 0,
            flashpoint_correlated: 0,
            average_confidence: None,
            quota: quota
                .into_iter()
                .map(|(participant_id, state)| ParticipantQuota {
                    participant_id,
                    nudges_delivered: state.nudges_delivered_this_session,
                    max_per_session: state.max_per_session,
                })
                .collect(),
        };

        let mut decisions = Vec::new();
        let mut confidence_total = 0.0;

        for decision in &log.order {
            let Some(event) = &decision.event else {
                summary.discarded += 1;
                continue;
            };
            summary.bias_events += 1;
            confidence_total += event.confidence_score;
            match event.action {
                BiasAction::NudgeSent => summary.nudges_sent += 1,
                BiasAction::Suppressed => summary.nudges_suppressed += 1,
                BiasAction::LoggedForReport => summary.logged_for_report += 1,
                BiasAction::Unresolved => summary.unresolved += 1,
            }
            if decision.flashpoint_id.is_some() {
                summary.flashpoint_correlated += 1;
            }
            decisions.push(EmittedDecision {
                event: event.clone(),
                nudge: decision.nudge.clone(),
                flashpoint_id: decision.flashpoint_id.clone(),
            });
        }

        if summary.bias_events > 0 {
            summary.average_confidence = Some(confidence_total / summary.bias_events as f64);
        }

        MeetingReport { summary, decisions }
    }
}

/// The detection cascade: session lifecycle plus per-segment orchestration.
///
/// Segments from different meetings may be processed concurrently through a
/// shared `Cascade`. Within a meeting, callers preserve per-speaker order by
/// awaiting each segment before submitting that speaker's next one.
pub struct Cascade<S, A> {
    config: CascadeConfig,
    router: Router,
    stage1: Stage1Config,
    stage2: Stage2Config,
    screener: Arc<S>,
    adjudicator: Arc<A>,
    quota: NudgeQuotaTracker,
    speakers: SpeakerTracker,
    emitter: EventEmitter,
    sessions: DashMap<String, Arc<MeetingSession>>,
}

impl<S: Screener, A: Adjudicator> Cascade<S, A> {
    /// Build a cascade; invalid configuration is fatal.
    pub fn new(config: CascadeConfig, screener: S, adjudicator: A) -> CascadeResult<Self> {
        config.validate()?;
        Ok(Self {
            router: Router::from_config(&config),
            stage1: Stage1Config {
                shortlist_floor: config.shortlist_floor,
                timeout: config.stage1_timeout(),
            },
            stage2: Stage2Config {
                top_k: config.stage2_top_k,
                deadline: config.stage2_deadline(),
            },
            quota: NudgeQuotaTracker::new(config.max_nudges_per_participant_per_session),
            speakers: SpeakerTracker::default(),
            emitter: EventEmitter::default(),
            sessions: DashMap::new(),
            screener: Arc::new(screener),
            adjudicator: Arc::new(adjudicator),
            config,
        })
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EmittedDecision> {
        self.emitter.subscribe()
    }

    pub fn speakers(&self) -> &SpeakerTracker {
        &self.speakers
    }

    pub fn quota(&self) -> &NudgeQuotaTracker {
        &self.quota
    }

    pub fn is_active(&self, meeting_id: &str) -> bool {
        self.sessions.contains_key(meeting_id)
    }

    /// Open a meeting session; quota counters start at zero.
    pub fn start_meeting(&self, meeting_id: &str, started_at: DateTime<Utc>) -> CascadeResult<()> {
        match self.sessions.entry(meeting_id.to_string()) {
            Entry::Occupied(_) => Err(CascadeError::MeetingAlreadyActive(meeting_id.to_string())),
            Entry::Vacant(slot) => {
                self.quota.open_meeting(meeting_id);
                slot.insert(Arc::new(MeetingSession::new(meeting_id, started_at)));
                info!("Meeting {} started at {}", meeting_id, started_at);
                Ok(())
            }
        }
    }

    pub fn register_flashpoint(&self, meeting_id: &str, flashpoint: Flashpoint) -> CascadeResult<()> {
        if !self.is_active(meeting_id) {
            return Err(CascadeError::MeetingNotActive(meeting_id.to_string()));
        }
        self.emitter.register_flashpoint(meeting_id, flashpoint);
        Ok(())
    }

    /// Close a meeting session.
    ///
    /// In-flight adjudications are cancelled and resolve as timed out; this
    /// waits for every in-flight segment to finish before discarding quota,
    /// speaker, flashpoint and decision-log state. Published event ids stay
    /// deduplicated.
    pub async fn end_meeting(&self, meeting_id: &str) -> CascadeResult<MeetingReport> {
        let Some((_, session)) = self.sessions.remove(meeting_id) else {
            return Err(CascadeError::MeetingNotActive(meeting_id.to_string()));
        };

        session.cancel.cancel();
        let _drained = session.in_flight.write().await;

        let quota = self.quota.close_meeting(meeting_id);
        self.speakers.clear_meeting(meeting_id);
        let released = self.emitter.take_meeting(meeting_id);
        debug!("Released {} logged decisions for {}", released.len(), meeting_id);
        let report = session.report(quota);

        info!(
            "Meeting {} ended: {} events, {} nudges sent, {} suppressed, {} unresolved",
            meeting_id,
            report.summary.bias_events,
            report.summary.nudges_sent,
            report.summary.nudges_suppressed,
            report.summary.unresolved
        );

        Ok(report)
    }

    /// Run one segment through screen, adjudicate, route, deliver and emit.
    pub async fn process_segment(&self, segment: &TranscriptSegment) -> CascadeResult<SegmentOutcome> {
        let session = self
            .sessions
            .get(&segment.meeting_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| CascadeError::MeetingNotActive(segment.meeting_id.clone()))?;

        let _in_flight = session.in_flight.read().await;
        if session.cancel.is_cancelled() {
            return Err(CascadeError::MeetingNotActive(segment.meeting_id.clone()));
        }

        let detected_at = Instant::now();
        session.segments_processed.fetch_add(1, Ordering::Relaxed);

        let stage1 = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => {
                Stage1Result::failed(&segment.segment_id, "meeting ended")
            }
            result = execute_stage1(self.screener.as_ref(), segment, &self.stage1) => result,
        };

        if stage1.is_failed() {
            session.screening_failures.fetch_add(1, Ordering::Relaxed);
            return Ok(SegmentOutcome::screening_failed(segment, stage1));
        }

        // Pairs already decided in this session are replays: reuse the decision
        let mut recorded: HashMap<BiasType, Decision> = HashMap::new();
        let mut fresh = Vec::new();
        for (candidate, attempt) in plan_stage2(&stage1.candidates, self.stage2.top_k) {
            let event_id = BiasEvent::derive_id(&segment.segment_id, candidate.bias_type);
            match session.recorded(&event_id) {
                Some(decision) => {
                    debug!("Replayed {} on {}", candidate.bias_type, segment.segment_id);
                    recorded.insert(candidate.bias_type, decision);
                }
                None => fresh.push((candidate, attempt)),
            }
        }

        let adjudicated = if fresh.is_empty() {
            Vec::new()
        } else {
            execute_stage2(&self.adjudicator, segment, fresh, &self.stage2, &session.cancel).await
        };

        for candidate in &adjudicated {
            let mut decision = self.decide(&session, segment, candidate, detected_at);
            if let Some(event) = &decision.event {
                decision.flashpoint_id = match self.emitter.emit(event.clone(), decision.nudge.clone()) {
                    Some(emitted) => emitted.flashpoint_id,
                    None => self.emitter.correlate(event),
                };
            }
            let event_id = BiasEvent::derive_id(&segment.segment_id, decision.bias_type);
            session.record(event_id, decision.clone());
            recorded.insert(decision.bias_type, decision);
        }

        let decisions = stage1
            .candidates
            .iter()
            .filter_map(|c| recorded.remove(&c.bias_type))
            .collect();

        Ok(SegmentOutcome {
            segment_id: segment.segment_id.clone(),
            meeting_id: segment.meeting_id.clone(),
            screening: stage1.status,
            decisions,
        })
    }

    /// Resolve, route and (for live-nudge candidates) attempt delivery.
    fn decide(
        &self,
        session: &MeetingSession,
        segment: &TranscriptSegment,
        adjudicated: &AdjudicatedCandidate,
        detected_at: Instant,
    ) -> Decision {
        let bias_type = adjudicated.candidate.bias_type;
        let resolved = ResolvedScore::from_adjudicated(adjudicated);
        let routing = self
            .router
            .route(resolved.confidence_score, resolved.stage2_timed_out);
        let event_id = BiasEvent::derive_id(&segment.segment_id, bias_type);
        let created_at = session.at_offset(segment.end_offset_seconds());

        let (action, nudge) = match routing {
            RoutingDecision::Discard => {
                debug!(
                    "Discarded {} on {} at {:.2}",
                    bias_type, segment.segment_id, resolved.confidence_score
                );
                return Decision {
                    bias_type,
                    routing,
                    event: None,
                    nudge: None,
                    flashpoint_id: None,
                };
            }
            RoutingDecision::Unresolved => (BiasAction::Unresolved, None),
            RoutingDecision::ReportOnly => (BiasAction::LoggedForReport, None),
            RoutingDecision::LiveNudgeCandidate => {
                let outcome = if session.cancel.is_cancelled() {
                    DeliveryOutcome::Suppressed(SuppressionReason::MeetingEnded)
                } else {
                    self.quota.try_deliver(
                        &segment.meeting_id,
                        &segment.speaker_participant_id,
                        &self.speakers,
                    )
                };
                let latency_ms = detected_at.elapsed().as_millis() as u64;

                let (action, status, suppression_reason) = match outcome {
                    DeliveryOutcome::Delivered => {
                        info!(
                            "Nudge sent to {} for {} ({}ms)",
                            segment.speaker_participant_id, bias_type, latency_ms
                        );
                        (BiasAction::NudgeSent, NudgeStatus::Delivered, None)
                    }
                    DeliveryOutcome::Suppressed(reason) => {
                        warn!(
                            "Nudge to {} for {} suppressed: {}",
                            segment.speaker_participant_id, bias_type, reason
                        );
                        (BiasAction::Suppressed, NudgeStatus::Suppressed, Some(reason))
                    }
                };

                let nudge = NudgeRecord {
                    nudge_id: NudgeRecord::derive_id(&event_id),
                    bias_event_id: event_id.clone(),
                    meeting_id: segment.meeting_id.clone(),
                    participant_id: segment.speaker_participant_id.clone(),
                    text: nudge_text(bias_type).to_string(),
                    status,
                    suppression_reason,
                    latency_ms,
                    created_at: shift_millis(created_at, i64::try_from(latency_ms).unwrap_or(i64::MAX)),
                };
                (action, Some(nudge))
            }
        };

        let event = BiasEvent {
            event_id,
            meeting_id: segment.meeting_id.clone(),
            participant_id: segment.speaker_participant_id.clone(),
            segment_id: segment.segment_id.clone(),
            bias_type,
            transcript_excerpt: segment.excerpt(EXCERPT_CHARS),
            stage1_score: resolved.stage1_score,
            stage2_score: resolved.stage2_score,
            confidence_score: resolved.confidence_score,
            severity: Severity::from_confidence(resolved.confidence_score),
            action,
            stage2_timed_out: resolved.stage2_timed_out,
            segment_start_offset_seconds: segment.start_offset_seconds,
            segment_duration_seconds: segment.duration_seconds,
            created_at,
        };

        Decision {
            bias_type,
            routing,
            event: Some(event),
            nudge,
            flashpoint_id: None,
        }
    }

    /// Replay a recorded meeting through a fresh session, in segment-end order.
    ///
    /// Speaker activity is taken from the recording at each segment's end,
    /// which is when its nudges would be delivered.
    pub async fn replay_meeting(&self, recording: &MeetingRecording) -> CascadeResult<MeetingReport> {
        let started_at = recording.started_at.unwrap_or_else(Utc::now);
        self.start_meeting(&recording.meeting_id, started_at)?;
        for flashpoint in &recording.flashpoints {
            self.emitter
                .register_flashpoint(&recording.meeting_id, flashpoint.clone());
        }

        let segments = segment_transcript(
            &recording.meeting_id,
            &recording.utterances,
            &self.config.segmenter,
        );
        info!(
            "Replaying meeting {}: {} utterances, {} segments",
            recording.meeting_id,
            recording.utterances.len(),
            segments.len()
        );

        for segment in &segments {
            self.speakers.set_active_speakers(
                &recording.meeting_id,
                recording.speakers_at(segment.end_offset_seconds()),
            );
            if let Err(err) = self.process_segment(segment).await {
                warn!("Replay of {} aborted: {}", recording.meeting_id, err);
                if let Err(end_err) = self.end_meeting(&recording.meeting_id).await {
                    // Closed elsewhere; only the speaker set written above remains
                    debug!("Meeting {} already closed: {}", recording.meeting_id, end_err);
                    self.speakers.clear_meeting(&recording.meeting_id);
                }
                return Err(err);
            }
        }

        self.end_meeting(&recording.meeting_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::Utterance;

    /// Scores every segment identically
    struct FixedScreener(Vec<(BiasType, f64)>);

    impl Screener for FixedScreener {
        async fn screen(&self, _segment: &TranscriptSegment) -> anyhow::Result<Vec<(BiasType, f64)>> {
            Ok(self.0.clone())
        }
    }

    /// Returns the Stage-1 score plus a fixed offset after a delay
    struct OffsetAdjudicator {
        offset: f64,
        delay_ms: u64,
    }

    impl Adjudicator for OffsetAdjudicator {
        async fn adjudicate(
            &self,
            candidate: &crate::models::BiasCandidate,
            _segment: &TranscriptSegment,
        ) -> anyhow::Result<f64> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(candidate.stage1_score + self.offset)
        }
    }

    fn cascade(scores: Vec<(BiasType, f64)>, offset: f64, delay_ms: u64) -> Cascade<FixedScreener, OffsetAdjudicator> {
        Cascade::new(
            CascadeConfig::default(),
            FixedScreener(scores),
            OffsetAdjudicator { offset, delay_ms },
        )
        .unwrap()
    }

    fn segment(meeting: &str, participant: &str, start: f64) -> TranscriptSegment {
        TranscriptSegment::new(meeting, participant, "some words".into(), start, 20.0)
    }

    #[tokio::test]
    async fn test_unknown_meeting_rejected() {
        let cascade = cascade(vec![], 0.0, 0);
        let result = cascade.process_segment(&segment("MTG-X", "PAR-1", 0.0)).await;
        assert!(matches!(result, Err(CascadeError::MeetingNotActive(_))));
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let cascade = cascade(vec![], 0.0, 0);
        cascade.start_meeting("MTG-1", Utc::now()).unwrap();
        assert!(matches!(
            cascade.start_meeting("MTG-1", Utc::now()),
            Err(CascadeError::MeetingAlreadyActive(_))
        ));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let config = CascadeConfig {
            report_threshold: 0.9,
            ..Default::default()
        };
        let result = Cascade::new(
            config,
            FixedScreener(vec![]),
            OffsetAdjudicator { offset: 0.0, delay_ms: 0 },
        );
        assert!(matches!(result, Err(CascadeError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_report_only_and_discard() {
        let cascade = cascade(
            vec![(BiasType::Groupthink, 0.65), (BiasType::Recency, 0.52)],
            0.0,
            0,
        );
        cascade.start_meeting("MTG-1", Utc::now()).unwrap();
        let outcome = cascade.process_segment(&segment("MTG-1", "PAR-1", 0.0)).await.unwrap();

        assert_eq!(outcome.decisions.len(), 2);
        let groupthink = outcome.event_for(BiasType::Groupthink).unwrap();
        assert_eq!(groupthink.action, BiasAction::LoggedForReport);
        assert!(outcome.decisions[0].nudge.is_none());
        assert_eq!(outcome.decisions[1].routing, RoutingDecision::Discard);
        assert!(outcome.event_for(BiasType::Recency).is_none());
    }

    #[tokio::test]
    async fn test_replayed_segment_reuses_decision_and_quota() {
        let cascade = cascade(vec![(BiasType::Anchoring, 0.80)], 0.04, 0);
        cascade.start_meeting("MTG-1", Utc::now()).unwrap();
        let seg = segment("MTG-1", "PAR-1", 0.0);

        let first = cascade.process_segment(&seg).await.unwrap();
        let second = cascade.process_segment(&seg).await.unwrap();

        assert_eq!(first.decisions, second.decisions);
        assert_eq!(
            cascade.quota().state("MTG-1", "PAR-1").unwrap().nudges_delivered_this_session,
            1
        );
        assert_eq!(cascade.emitter().meeting_log("MTG-1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_meeting_flushes_in_flight_as_timed_out() {
        let cascade = Arc::new(cascade(vec![(BiasType::SunkCost, 0.80)], 0.0, 60_000));
        cascade.start_meeting("MTG-1", Utc::now()).unwrap();

        let worker = Arc::clone(&cascade);
        let handle = tokio::spawn(async move {
            worker.process_segment(&segment("MTG-1", "PAR-1", 0.0)).await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let report = cascade.end_meeting("MTG-1").await.unwrap();
        let outcome = handle.await.unwrap().unwrap();

        let event = outcome.event_for(BiasType::SunkCost).unwrap();
        assert!(event.stage2_timed_out);
        assert_eq!(event.action, BiasAction::Unresolved);
        assert_eq!(report.summary.unresolved, 1);
        assert!(!cascade.is_active("MTG-1"));
    }

    #[tokio::test]
    async fn test_far_offset_saturates_timestamp() {
        let cascade = cascade(vec![(BiasType::Anchoring, 0.80)], 0.04, 0);
        cascade.start_meeting("MTG-1", Utc::now()).unwrap();
        let outcome = cascade
            .process_segment(&segment("MTG-1", "PAR-1", 1e14))
            .await
            .unwrap();

        let event = outcome.event_for(BiasType::Anchoring).unwrap();
        assert_eq!(event.created_at, DateTime::<Utc>::MAX_UTC);
        let nudge = outcome.decisions[0].nudge.as_ref().unwrap();
        assert_eq!(nudge.created_at, DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test]
    async fn test_restarted_meeting_starts_clean() {
        let cascade = cascade(vec![(BiasType::Groupthink, 0.65)], 0.0, 0);
        cascade.start_meeting("MTG-1", Utc::now()).unwrap();
        cascade
            .register_flashpoint(
                "MTG-1",
                Flashpoint {
                    flashpoint_id: "FLP-1".into(),
                    start_offset_seconds: 0.0,
                    duration_seconds: 600.0,
                    tension_peak: 0.7,
                },
            )
            .unwrap();
        let first = cascade.process_segment(&segment("MTG-1", "PAR-1", 0.0)).await.unwrap();
        assert_eq!(first.decisions[0].flashpoint_id.as_deref(), Some("FLP-1"));
        cascade.end_meeting("MTG-1").await.unwrap();
        assert!(cascade.emitter().meeting_log("MTG-1").is_empty());

        cascade.start_meeting("MTG-1", Utc::now()).unwrap();
        let second = cascade.process_segment(&segment("MTG-1", "PAR-2", 60.0)).await.unwrap();
        assert!(second.decisions[0].flashpoint_id.is_none());
        assert_eq!(cascade.emitter().meeting_log("MTG-1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_cut_short_closes_meeting() {
        let cascade = Arc::new(cascade(vec![(BiasType::SunkCost, 0.80)], 0.0, 60_000));
        let recording = MeetingRecording {
            meeting_id: "MTG-3".into(),
            started_at: Some(Utc::now()),
            utterances: vec![
                Utterance {
                    participant_id: "PAR-1".into(),
                    text: "we already paid for it".into(),
                    start_time: 0.0,
                    end_time: 20.0,
                },
                Utterance {
                    participant_id: "PAR-2".into(),
                    text: "too late to stop now".into(),
                    start_time: 25.0,
                    end_time: 45.0,
                },
            ],
            flashpoints: vec![],
        };

        let worker = Arc::clone(&cascade);
        let handle = tokio::spawn(async move { worker.replay_meeting(&recording).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        cascade.end_meeting("MTG-3").await.unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(CascadeError::MeetingNotActive(_))));
        assert!(!cascade.is_active("MTG-3"));
        assert!(cascade.quota().state("MTG-3", "PAR-1").is_none());
        assert!(cascade.emitter().meeting_log("MTG-3").is_empty());
    }

    #[tokio::test]
    async fn test_replay_meeting_reports_summary() {
        let cascade = cascade(vec![(BiasType::Overconfidence, 0.75)], 0.05, 0);
        let recording = MeetingRecording {
            meeting_id: "MTG-9".into(),
            started_at: Some(Utc::now()),
            utterances: vec![
                Utterance {
                    participant_id: "PAR-1".into(),
                    text: "this definitely cannot fail".into(),
                    start_time: 0.0,
                    end_time: 20.0,
                },
                Utterance {
                    participant_id: "PAR-2".into(),
                    text: "no doubt at all".into(),
                    start_time: 25.0,
                    end_time: 45.0,
                },
            ],
            flashpoints: vec![Flashpoint {
                flashpoint_id: "FLP-1".into(),
                start_offset_seconds: 30.0,
                duration_seconds: 10.0,
                tension_peak: 0.8,
            }],
        };

        let report = cascade.replay_meeting(&recording).await.unwrap();
        assert_eq!(report.summary.segments_processed, 2);
        assert_eq!(report.summary.nudges_sent, 2);
        assert_eq!(report.summary.flashpoint_correlated, 1);
        assert_eq!(report.nudges().count(), 2);
        assert!((report.summary.average_confidence.unwrap() - 0.80).abs() < 1e-9);
    }
}
