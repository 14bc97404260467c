//! C1: the three typed bounded SPSC queues (§4.1).

use parlance_core::{AudioChunk, BoundedQueue, Sentence};

/// Recommended default capacity from §4.1 (32-128 items); overridable via
/// `parlance-config`'s `Settings`.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Finalized user messages from the STT collaborator or a `user_message`
/// client event (§4.5).
pub type IngressQ = BoundedQueue<String>;

/// Segmented sentences plus end-of-speaker sentinels, produced by the Turn
/// Orchestrator and consumed by the TTS Worker.
pub type SentenceQ = BoundedQueue<Sentence>;

/// Audio chunks plus end-of-speaker sentinels, produced by the TTS Worker
/// and consumed by the Audio Streamer.
pub type AudioQ = BoundedQueue<AudioChunk>;

pub fn new_ingress_q(capacity: usize) -> IngressQ {
    IngressQ::new(capacity)
}

pub fn new_sentence_q(capacity: usize) -> SentenceQ {
    SentenceQ::new(capacity)
}

pub fn new_audio_q(capacity: usize) -> AudioQ {
    AudioQ::new(capacity)
}
