//! Data model: Character reference, Turn, Sentence record, Audio chunk.
//!
//! Field names follow the wire vocabulary directly — `character_id`,
//! `message_id`, `speaker_index` — because these records are emitted to the
//! client largely verbatim by the server crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier for a character, supplied by the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub String);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque voice descriptor, passed through to the TTS collaborator verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor(pub String);

/// A character reference as returned by the external catalog when parsing
/// an addressed user message. Opaque to the core beyond these three fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub voice: VoiceDescriptor,
}

/// Monotonically increasing turn number, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// 0-based order of a character within a turn (Glossary: Speaker index).
pub type SpeakerIndex = u32;

/// Unique identifier for one character's reply within one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Turn lifecycle state (§3, §4.4 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Llm,
    Tts,
    Streaming,
    Complete,
    Cancelled,
}

/// Produced by the Turn Orchestrator, consumed by the TTS Worker.
///
/// `is_final == true` marks the end-of-speaker sentinel: `text` is empty and
/// no further `Sentence` for this `speaker_index` will appear in this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub sentence_index: u32,
    pub message_id: MessageId,
    pub character_id: CharacterId,
    pub character_name: String,
    pub voice: VoiceDescriptor,
    pub speaker_index: SpeakerIndex,
    pub is_final: bool,
}

impl Sentence {
    /// Builds the end-of-speaker sentinel for a given speaker (§4.2).
    pub fn sentinel(
        sentence_index: u32,
        message_id: MessageId,
        character_id: CharacterId,
        character_name: String,
        voice: VoiceDescriptor,
        speaker_index: SpeakerIndex,
    ) -> Self {
        Self {
            text: String::new(),
            sentence_index,
            message_id,
            character_id,
            character_name,
            voice,
            speaker_index,
            is_final: true,
        }
    }
}

/// Produced by the TTS Worker, consumed by the Audio Streamer / Scheduler.
///
/// `is_final == true` marks the end-of-speaker sentinel: `payload` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioChunk {
    #[serde(with = "serde_bytes_as_vec")]
    pub payload: Vec<u8>,
    pub sentence_index: u32,
    pub chunk_index: u32,
    pub message_id: MessageId,
    pub character_id: CharacterId,
    pub character_name: String,
    pub speaker_index: SpeakerIndex,
    pub is_final: bool,
}

impl AudioChunk {
    pub fn sentinel(
        sentence_index: u32,
        message_id: MessageId,
        character_id: CharacterId,
        character_name: String,
        speaker_index: SpeakerIndex,
    ) -> Self {
        Self {
            payload: Vec::new(),
            sentence_index,
            chunk_index: 0,
            message_id,
            character_id,
            character_name,
            speaker_index,
            is_final: true,
        }
    }
}

// Audio payloads are never serialized to JSON directly (they travel as raw
// binary frames, §6), but `Serialize`/`Deserialize` on the struct is useful
// for tests and in-process fakes, so keep the byte vector plain.
mod serde_bytes_as_vec {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        serde::Deserialize::deserialize(d)
    }
}
