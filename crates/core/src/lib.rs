//! Core types for the conversation streaming core.
//!
//! This crate has no knowledge of transport, LLM vendor, or TTS vendor
//! specifics — it defines the shapes that flow through the pipeline
//! (`types`), the bounded queue primitive the pipeline is built from
//! (`queue`), the traits external collaborators implement (`traits`), and
//! the crate-wide error type (`error`).

pub mod error;
pub mod queue;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use queue::BoundedQueue;
pub use traits::{CharacterCatalog, GenerateRequest, LanguageModel, TextToSpeech, TransportSink};
pub use types::{
    AudioChunk, Character, CharacterId, MessageId, Sentence, SpeakerIndex, TurnId, TurnState,
    VoiceDescriptor,
};
