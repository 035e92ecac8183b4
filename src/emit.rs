use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{BiasEvent, Flashpoint, NudgeRecord};

/// One published pipeline decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedDecision {
    pub event: BiasEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nudge: Option<NudgeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flashpoint_id: Option<String>,
}

#[derive(Debug, Default)]
struct EmitterState {
    seen: HashSet<String>,
    log: Vec<EmittedDecision>,
    flashpoints: HashMap<String, Vec<Flashpoint>>,
}

/// Append-only output feed.
///
/// Push consumers subscribe to a broadcast channel; poll consumers read the
/// per-meeting log. Each event id is published at most once, so replaying a
/// segment is invisible downstream.
#[derive(Debug)]
pub struct EventEmitter {
    tx: broadcast::Sender<EmittedDecision>,
    state: Mutex<EmitterState>,
}

impl EventEmitter {
    /// `capacity` is the number of decisions a slow subscriber may lag behind
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            state: Mutex::new(EmitterState::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EmittedDecision> {
        self.tx.subscribe()
    }

    pub fn register_flashpoint(&self, meeting_id: &str, flashpoint: Flashpoint) {
        let mut state = self.lock();
        state
            .flashpoints
            .entry(meeting_id.to_string())
            .or_default()
            .push(flashpoint);
    }

    /// First registered flashpoint overlapping the event's segment
    pub fn correlate(&self, event: &BiasEvent) -> Option<String> {
        let state = self.lock();
        find_flashpoint(&state, event)
    }

    /// Publish a decision. Returns `None` when the event id was already published.
    pub fn emit(&self, event: BiasEvent, nudge: Option<NudgeRecord>) -> Option<EmittedDecision> {
        let mut state = self.lock();
        if !state.seen.insert(event.event_id.clone()) {
            debug!("Event {} already emitted, skipping", event.event_id);
            return None;
        }

        let flashpoint_id = find_flashpoint(&state, &event);
        let decision = EmittedDecision {
            event,
            nudge,
            flashpoint_id,
        };
        state.log.push(decision.clone());
        // Sent under the lock so channel order matches log order
        let _ = self.tx.send(decision.clone());
        Some(decision)
    }

    /// Published decisions for a meeting, in emission order
    pub fn meeting_log(&self, meeting_id: &str) -> Vec<EmittedDecision> {
        self.lock()
            .log
            .iter()
            .filter(|d| d.event.meeting_id == meeting_id)
            .cloned()
            .collect()
    }

    /// Remove and return a meeting's log and flashpoints. Ids stay marked as
    /// emitted so a later replay is still deduplicated.
    pub fn take_meeting(&self, meeting_id: &str) -> Vec<EmittedDecision> {
        let mut state = self.lock();
        state.flashpoints.remove(meeting_id);
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.log)
            .into_iter()
            .partition(|d| d.event.meeting_id == meeting_id);
        state.log = kept;
        taken
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EmitterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

fn find_flashpoint(state: &EmitterState, event: &BiasEvent) -> Option<String> {
    state.flashpoints.get(&event.meeting_id).and_then(|fps| {
        fps.iter()
            .find(|fp| fp.overlaps(event.segment_start_offset_seconds, event.segment_duration_seconds))
            .map(|fp| fp.flashpoint_id.clone())
    })
}
