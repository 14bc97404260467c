//! C4: the Speaker-Order Scheduler (§4.3). A pure, deterministic ordering
//! filter over `AudioQ`'s output — it holds no knowledge of turns, queues,
//! or transport, only the case table and flush algorithm from the spec.

use parlance_core::{AudioChunk, SpeakerIndex};
use std::collections::{HashMap, VecDeque};

pub struct Scheduler {
    current_speaker_index: SpeakerIndex,
    buffers: HashMap<SpeakerIndex, VecDeque<AudioChunk>>,
    max_buffered: Option<usize>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self { current_speaker_index: 0, buffers: HashMap::new(), max_buffered: None }
    }

    /// Open Question #2: cap per-speaker buffered chunks. Default is
    /// unbounded; exceeding the cap logs a warning rather than applying
    /// backpressure (the spec does not mandate blocking here).
    pub fn with_max_buffered(mut self, max: usize) -> Self {
        self.max_buffered = Some(max);
        self
    }

    pub fn current_speaker_index(&self) -> SpeakerIndex {
        self.current_speaker_index
    }

    /// Feeds one chunk; returns the chunks released as a consequence, in
    /// release order (possibly empty, possibly more than one due to flush).
    pub fn feed(&mut self, chunk: AudioChunk) -> Vec<AudioChunk> {
        let mut released = Vec::new();
        if chunk.speaker_index < self.current_speaker_index {
            // Case E: late arrival after interrupt/advance, discard silently.
            tracing::debug!(
                speaker_index = chunk.speaker_index,
                current = self.current_speaker_index,
                "scheduler dropping late chunk"
            );
            return released;
        }
        if chunk.speaker_index == self.current_speaker_index {
            let is_final = chunk.is_final;
            released.push(chunk);
            if is_final {
                self.current_speaker_index += 1;
                self.flush(&mut released);
            }
            return released;
        }
        // Case C/D: c.speaker_index > current.
        let buf = self.buffers.entry(chunk.speaker_index).or_default();
        if let Some(max) = self.max_buffered {
            if buf.len() >= max {
                tracing::warn!(
                    speaker_index = chunk.speaker_index,
                    cap = max,
                    "scheduler per-speaker buffer exceeded cap"
                );
            }
        }
        buf.push_back(chunk);
        released
    }

    fn flush(&mut self, released: &mut Vec<AudioChunk>) {
        loop {
            let Some(buf) = self.buffers.get_mut(&self.current_speaker_index) else {
                break;
            };
            let mut advanced = false;
            while let Some(c) = buf.pop_front() {
                let is_final = c.is_final;
                released.push(c);
                if is_final {
                    advanced = true;
                    break;
                }
            }
            let empty = buf.is_empty();
            if empty {
                self.buffers.remove(&self.current_speaker_index);
            }
            if advanced {
                self.current_speaker_index += 1;
            } else {
                break;
            }
        }
    }

    /// Resets to the initial state — called on interrupt (§9).
    pub fn reset(&mut self) {
        self.current_speaker_index = 0;
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_core::{CharacterId, MessageId};

    fn chunk(speaker: SpeakerIndex, sentence: u32, idx: u32, is_final: bool) -> AudioChunk {
        AudioChunk {
            payload: if is_final { Vec::new() } else { vec![idx as u8] },
            sentence_index: sentence,
            chunk_index: idx,
            message_id: MessageId::new(),
            character_id: CharacterId(format!("char-{speaker}")),
            character_name: format!("Character {speaker}"),
            speaker_index: speaker,
            is_final,
        }
    }

    #[test]
    fn case_a_releases_current_speaker_immediately() {
        let mut sched = Scheduler::new();
        let released = sched.feed(chunk(0, 0, 0, false));
        assert_eq!(released.len(), 1);
        assert_eq!(sched.current_speaker_index(), 0);
    }

    #[test]
    fn case_b_releases_and_advances() {
        let mut sched = Scheduler::new();
        let released = sched.feed(chunk(0, 0, 0, true));
        assert_eq!(released.len(), 1);
        assert_eq!(sched.current_speaker_index(), 1);
    }

    #[test]
    fn case_c_and_d_buffer_future_speakers() {
        let mut sched = Scheduler::new();
        assert!(sched.feed(chunk(1, 0, 0, false)).is_empty());
        assert!(sched.feed(chunk(1, 0, 1, true)).is_empty());
        assert_eq!(sched.current_speaker_index(), 0);
    }

    #[test]
    fn case_e_discards_late_chunks() {
        let mut sched = Scheduler::new();
        sched.feed(chunk(0, 0, 0, true)); // advances to speaker 1
        let released = sched.feed(chunk(0, 1, 0, false));
        assert!(released.is_empty());
        assert_eq!(sched.current_speaker_index(), 1);
    }

    #[test]
    fn flush_releases_buffered_speakers_in_order() {
        let mut sched = Scheduler::new();
        // speaker 1's two chunks arrive early, buffered.
        sched.feed(chunk(1, 0, 0, false));
        sched.feed(chunk(1, 0, 1, true));
        // speaker 0 finishes, triggering a flush that releases speaker 1 too.
        let released = sched.feed(chunk(0, 0, 0, true));
        assert_eq!(released.len(), 3);
        assert_eq!(released[0].speaker_index, 0);
        assert_eq!(released[1].speaker_index, 1);
        assert_eq!(released[2].speaker_index, 1);
        assert_eq!(sched.current_speaker_index(), 2);
    }

    #[test]
    fn flush_stops_when_next_speaker_still_in_flight() {
        let mut sched = Scheduler::new();
        // speaker 1 has one chunk buffered but no sentinel yet: still in flight.
        sched.feed(chunk(1, 0, 0, false));
        let released = sched.feed(chunk(0, 0, 0, true));
        assert_eq!(released.len(), 2); // speaker 0 sentinel + speaker 1's one chunk
        assert_eq!(sched.current_speaker_index(), 1);
    }

    #[test]
    fn is_deterministic_for_the_same_input_sequence() {
        let inputs = vec![chunk(0, 0, 0, false), chunk(1, 0, 0, false), chunk(0, 0, 1, true), chunk(1, 0, 1, true)];
        let run = |inputs: &[AudioChunk]| {
            let mut sched = Scheduler::new();
            let mut order = Vec::new();
            for c in inputs {
                for r in sched.feed(c.clone()) {
                    order.push((r.speaker_index, r.sentence_index, r.chunk_index));
                }
            }
            order
        };
        assert_eq!(run(&inputs), run(&inputs));
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut sched = Scheduler::new();
        sched.feed(chunk(0, 0, 0, true));
        sched.feed(chunk(1, 0, 0, false));
        sched.reset();
        assert_eq!(sched.current_speaker_index(), 0);
        let released = sched.feed(chunk(0, 0, 0, false));
        assert_eq!(released.len(), 1);
    }
}
