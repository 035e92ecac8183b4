use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::models::{SegmenterConfig, TranscriptSegment, Utterance};

/// Speech accumulated for one participant that has not yet become a segment
#[derive(Debug, Clone)]
struct SpeakerBuffer {
    words: Vec<String>,
    start: f64,
    end: f64,
}

impl SpeakerBuffer {
    fn from_piece(piece: &Utterance) -> Self {
        Self {
            words: piece.text.split_whitespace().map(str::to_string).collect(),
            start: piece.start_time,
            end: piece.end_time,
        }
    }

    fn duration(&self) -> f64 {
        self.end - self.start
    }

    fn append(&mut self, piece: &Utterance) {
        self.words
            .extend(piece.text.split_whitespace().map(str::to_string));
        self.end = self.end.max(piece.end_time);
    }
}

/// Stage 0: slices per-participant utterances into bounded analysis segments.
///
/// Each participant's speech is buffered independently. A buffer becomes a
/// segment once it is at least `min_segment_seconds` long and the speaker
/// pauses for `pause_gap_seconds`, or when taking the next utterance would
/// push it past `max_segment_seconds`. Short buffers wait for the same
/// speaker's next utterance. `finish` flushes whatever is left.
#[derive(Debug)]
pub struct Segmenter {
    meeting_id: String,
    config: SegmenterConfig,
    buffers: HashMap<String, SpeakerBuffer>,
}

impl Segmenter {
    pub fn new(meeting_id: impl Into<String>, config: SegmenterConfig) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            config,
            buffers: HashMap::new(),
        }
    }

    /// Drop all buffered speech so the segmenter can be reused for a new run
    pub fn reset(&mut self) {
        self.buffers.clear();
    }

    /// Feed one utterance; returns the segments it closed, in order.
    pub fn push(&mut self, utterance: &Utterance) -> Vec<TranscriptSegment> {
        let mut emitted = Vec::new();

        if utterance.text.trim().is_empty() {
            return emitted;
        }

        if !utterance.start_time.is_finite() || !utterance.end_time.is_finite() {
            warn!(
                "Utterance from {} has non-finite times, skipping",
                utterance.participant_id
            );
            return emitted;
        }

        let mut utterance = utterance.clone();
        if utterance.end_time < utterance.start_time {
            warn!(
                "Utterance from {} ends before it starts ({} < {}), clamping",
                utterance.participant_id, utterance.end_time, utterance.start_time
            );
            utterance.end_time = utterance.start_time;
        }

        for piece in split_long_utterance(&utterance, self.config.max_segment_seconds) {
            if let Some(segment) = self.push_piece(&piece) {
                emitted.push(segment);
            }
        }

        emitted
    }

    fn push_piece(&mut self, piece: &Utterance) -> Option<TranscriptSegment> {
        let Some(buffer) = self.buffers.get_mut(&piece.participant_id) else {
            self.buffers
                .insert(piece.participant_id.clone(), SpeakerBuffer::from_piece(piece));
            return None;
        };

        let gap = piece.start_time - buffer.end;
        let merged_duration = piece.end_time.max(buffer.end) - buffer.start;
        let long_enough = buffer.duration() >= self.config.min_segment_seconds;
        let paused = gap >= self.config.pause_gap_seconds;
        let overflows = merged_duration > self.config.max_segment_seconds;

        if (long_enough && paused) || overflows {
            let closed = std::mem::replace(buffer, SpeakerBuffer::from_piece(piece));
            return Some(self.to_segment(&piece.participant_id, closed));
        }

        buffer.append(piece);
        None
    }

    /// Flush every buffered partial as a final (possibly short) segment
    pub fn finish(&mut self) -> Vec<TranscriptSegment> {
        let buffers: Vec<(String, SpeakerBuffer)> = self.buffers.drain().collect();
        let mut flushed: Vec<TranscriptSegment> = buffers
            .into_iter()
            .map(|(participant, buffer)| self.to_segment(&participant, buffer))
            .collect();
        flushed.sort_by(|a, b| a.start_offset_seconds.total_cmp(&b.start_offset_seconds));
        flushed
    }

    fn to_segment(&self, participant_id: &str, buffer: SpeakerBuffer) -> TranscriptSegment {
        let segment = TranscriptSegment::new(
            &self.meeting_id,
            participant_id,
            buffer.words.join(" "),
            buffer.start,
            buffer.duration(),
        );
        debug!(
            "Segment {} for {}: {:.1}s at {:.1}s",
            segment.segment_id, participant_id, segment.duration_seconds, segment.start_offset_seconds
        );
        segment
    }

    /// Lazily segment an ordered utterance stream.
    pub fn segments<I>(self, utterances: I) -> Segments<I::IntoIter>
    where
        I: IntoIterator<Item = Utterance>,
    {
        Segments {
            segmenter: self,
            source: utterances.into_iter(),
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

/// Iterator returned by [`Segmenter::segments`]
pub struct Segments<I> {
    segmenter: Segmenter,
    source: I,
    pending: VecDeque<TranscriptSegment>,
    finished: bool,
}

impl<I> Iterator for Segments<I>
where
    I: Iterator<Item = Utterance>,
{
    type Item = TranscriptSegment;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(segment) = self.pending.pop_front() {
                return Some(segment);
            }
            if self.finished {
                return None;
            }
            match self.source.next() {
                Some(utterance) => self.pending.extend(self.segmenter.push(&utterance)),
                None => {
                    self.pending.extend(self.segmenter.finish());
                    self.finished = true;
                }
            }
        }
    }
}

/// Segment a recorded utterance list and order the result by segment end,
/// which is when each segment becomes available for detection.
pub fn segment_transcript(
    meeting_id: &str,
    utterances: &[Utterance],
    config: &SegmenterConfig,
) -> Vec<TranscriptSegment> {
    let mut ordered = utterances.to_vec();
    ordered.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut segments: Vec<TranscriptSegment> = Segmenter::new(meeting_id, config.clone())
        .segments(ordered)
        .collect();
    segments.sort_by(|a, b| a.end_offset_seconds().total_cmp(&b.end_offset_seconds()));
    segments
}

/// Split an utterance longer than `ceiling` into equal-duration pieces,
/// distributing its words evenly. Never more pieces than words.
fn split_long_utterance(utterance: &Utterance, ceiling: f64) -> Vec<Utterance> {
    let duration = utterance.duration_seconds();
    if duration <= ceiling || ceiling <= 0.0 {
        return vec![utterance.clone()];
    }

    let words: Vec<&str> = utterance.text.split_whitespace().collect();
    let pieces = ((duration / ceiling).ceil() as usize).min(words.len().max(1));
    let piece_duration = duration / pieces as f64;
    let words_per_piece = words.len().div_ceil(pieces).max(1);

    (0..pieces)
        .filter_map(|i| {
            let first = i * words_per_piece;
            if first >= words.len() {
                return None;
            }
            let last = (first + words_per_piece).min(words.len());
            Some(Utterance {
                participant_id: utterance.participant_id.clone(),
                text: words[first..last].join(" "),
                start_time: utterance.start_time + piece_duration * i as f64,
                end_time: utterance.start_time + piece_duration * (i + 1) as f64,
            })
        })
        .collect()
}
