//! The streaming pipeline: bounded queues (C1), the TTS Worker (C2), the
//! Audio Streamer and Speaker-Order Scheduler (C3/C4), and the sentence
//! segmenter used by the Turn Orchestrator.

pub mod audio_streamer;
pub mod error;
pub mod queues;
pub mod scheduler;
pub mod segmenter;
pub mod tts_worker;

pub use audio_streamer::{AudioStreamer, ResetHandle, SuppressFlag};
pub use error::PipelineError;
pub use queues::{AudioQ, IngressQ, SentenceQ, DEFAULT_QUEUE_CAPACITY};
pub use scheduler::Scheduler;
pub use segmenter::SentenceSegmenter;
pub use tts_worker::TtsWorker;
