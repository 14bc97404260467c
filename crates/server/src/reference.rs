//! Trivial in-process collaborator implementations (SPEC_FULL.md §B): stand-ins
//! for the externally-scoped LLM/TTS/catalog, wired by default so the server
//! is independently runnable. Production deployments swap these for real
//! backends behind the same traits — `parlance_llm::OllamaLanguageModel` is
//! one such real backend already available for `LanguageModel`.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parlance_core::{
    Character, CharacterCatalog, CharacterId, GenerateRequest, LanguageModel, Result,
    TextToSpeech, VoiceDescriptor,
};

/// Matches `@name` mentions against a fixed roster, in order of first
/// appearance in the message. A message addressing nobody in the roster
/// yields an empty list (§8 "zero-character address" boundary case).
pub struct RosterCatalog {
    roster: Vec<Character>,
}

impl RosterCatalog {
    pub fn new(roster: Vec<Character>) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl CharacterCatalog for RosterCatalog {
    async fn parse_addressed(&self, message: &str) -> Result<Vec<Character>> {
        let lower = message.to_lowercase();
        let mut mentions: Vec<(usize, &Character)> = Vec::new();
        for character in &self.roster {
            let mention = format!("@{}", character.name.to_lowercase());
            if let Some(pos) = lower.find(&mention) {
                mentions.push((pos, character));
            }
        }
        // Speaker index follows the order mentions occur in the message
        // (Glossary: "order of mentions in the user message"), not roster
        // construction order.
        mentions.sort_by_key(|(pos, _)| *pos);
        Ok(mentions.into_iter().map(|(_, character)| character.clone()).collect())
    }
}

/// Echoes the user's message back as a single sentence, split into
/// word-sized token deltas to exercise the streaming path the same way a
/// real LLM backend's NDJSON stream would.
#[derive(Default)]
pub struct EchoLanguageModel;

#[async_trait]
impl LanguageModel for EchoLanguageModel {
    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let reply = format!("You said: {}", request.user_message.trim());
        let tokens: Vec<String> =
            reply.split_inclusive(' ').map(|w| w.to_string()).collect();
        Ok(stream::iter(tokens.into_iter().map(Ok)).boxed())
    }
}

/// Synthesizes one fixed-size silent PCM chunk per word in the sentence.
/// Stands in for a real vocoder; the chunk framing and sentinel protocol
/// are exercised identically to a real TTS backend.
pub struct SilentTts {
    samples_per_chunk: usize,
}

impl SilentTts {
    pub fn new() -> Self {
        Self { samples_per_chunk: 2_400 } // 100ms @ 24kHz
    }
}

impl Default for SilentTts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextToSpeech for SilentTts {
    async fn synthesize_stream(
        &self,
        text: &str,
        _voice: &VoiceDescriptor,
    ) -> Result<BoxStream<'static, Result<Vec<u8>>>> {
        let chunk_count = text.split_whitespace().count().max(1);
        let payload = vec![0u8; self.samples_per_chunk * 2]; // 16-bit PCM
        Ok(stream::iter((0..chunk_count).map(move |_| Ok(payload.clone()))).boxed())
    }

    fn sample_rate(&self) -> u32 {
        24_000
    }
}

pub fn default_roster() -> Vec<Character> {
    vec![
        Character {
            id: CharacterId("ava".into()),
            name: "Ava".into(),
            voice: VoiceDescriptor("ava-default".into()),
        },
        Character {
            id: CharacterId("bo".into()),
            name: "Bo".into(),
            voice: VoiceDescriptor("bo-default".into()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn addressed_characters_are_ordered_by_mention_position_not_roster_order() {
        let catalog = RosterCatalog::new(default_roster());
        let addressed = catalog.parse_addressed("@Bo @Ava hi both of you").await.unwrap();
        let names: Vec<&str> = addressed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bo", "Ava"]);
    }

    #[tokio::test]
    async fn addressed_characters_in_roster_order_stay_in_roster_order() {
        let catalog = RosterCatalog::new(default_roster());
        let addressed = catalog.parse_addressed("@Ava @Bo hi both of you").await.unwrap();
        let names: Vec<&str> = addressed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ava", "Bo"]);
    }

    #[tokio::test]
    async fn message_addressing_nobody_yields_empty_list() {
        let catalog = RosterCatalog::new(default_roster());
        let addressed = catalog.parse_addressed("hello there").await.unwrap();
        assert!(addressed.is_empty());
    }
}
