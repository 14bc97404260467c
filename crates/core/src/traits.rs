//! Collaborator traits: the contracts the core consumes without knowing the
//! concrete vendor behind them (§1 out-of-scope list).
//!
//! Shaped after `crates/core/src/traits/speech.rs` in the teacher repo —
//! `async_trait` methods returning a boxed stream for the incremental case,
//! a plain async method for the one-shot case.

use crate::error::Result;
use crate::types::{Character, VoiceDescriptor};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// One turn's worth of context handed to the LLM collaborator. Prompt
/// construction and conversation history are the collaborator's concern;
/// the core only needs to hand over enough for it to produce a stream.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub character: Character,
    pub user_message: String,
    /// Opaque passthrough of the inbound `model_settings` message (§6).
    pub model_settings: Option<serde_json::Value>,
}

/// The external LLM provider: a prompt in, a token stream out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns a lazy stream of text deltas. The stream ending (including
    /// immediately, with zero items) means the character's reply is done;
    /// an `Err` item signals a mid-stream error (§7) and also ends the
    /// stream.
    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<BoxStream<'static, Result<String>>>;
}

/// The external TTS engine: text + voice descriptor in, a lazy byte
/// sequence of PCM chunks out.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize_stream(
        &self,
        text: &str,
        voice: &VoiceDescriptor,
    ) -> Result<BoxStream<'static, Result<Vec<u8>>>>;

    /// Sample rate advertised in `audio_stream_start` (§6); typically 24000.
    fn sample_rate(&self) -> u32 {
        24_000
    }
}

/// The external character catalog: parses an inbound user message into the
/// ordered list of addressed characters (§4.4 step 2).
#[async_trait]
pub trait CharacterCatalog: Send + Sync {
    async fn parse_addressed(&self, message: &str) -> Result<Vec<Character>>;
}

/// The client delivery transport, reduced to the two primitives the core
/// needs (§9 "Source-pattern substitutions": `{ send_json, send_binary }`).
/// A send failure is a client disconnect (§7) — the caller tears the
/// session down rather than retrying.
#[async_trait]
pub trait TransportSink: Send + Sync {
    async fn send_json(&self, value: serde_json::Value) -> Result<()>;
    async fn send_binary(&self, data: Vec<u8>) -> Result<()>;
}
