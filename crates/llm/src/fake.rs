//! An in-memory `LanguageModel` for tests, following the mock-collaborator
//! pattern in the teacher's `crates/core/src/traits/speech.rs` (`MockStt`).

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use parlance_core::{CharacterId, GenerateRequest, LanguageModel, Result};

/// Replays a fixed sequence of token deltas per character id. Characters
/// with no configured response produce an immediately-empty stream (the
/// "zero-token character reply" boundary case, §8).
#[derive(Default)]
pub struct FakeLanguageModel {
    responses: Mutex<HashMap<String, Vec<String>>>,
}

impl FakeLanguageModel {
    pub fn new() -> Self {
        Self { responses: Mutex::new(HashMap::new()) }
    }

    pub fn with_response(self, character_id: &CharacterId, tokens: Vec<&str>) -> Self {
        self.responses
            .lock()
            .insert(character_id.0.clone(), tokens.into_iter().map(String::from).collect());
        self
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let tokens = self
            .responses
            .lock()
            .get(&request.character.id.0)
            .cloned()
            .unwrap_or_default();
        Ok(stream::iter(tokens.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_core::{Character, VoiceDescriptor};
    use futures::StreamExt;

    #[tokio::test]
    async fn replays_configured_tokens() {
        let char_a = Character {
            id: CharacterId("a".into()),
            name: "A".into(),
            voice: VoiceDescriptor("voice-a".into()),
        };
        let llm = FakeLanguageModel::new().with_response(&char_a.id, vec!["Hi", ". "]);
        let mut stream = llm
            .generate_stream(GenerateRequest {
                character: char_a,
                user_message: "hello".into(),
                model_settings: None,
            })
            .await
            .unwrap();
        let mut collected = Vec::new();
        while let Some(tok) = stream.next().await {
            collected.push(tok.unwrap());
        }
        assert_eq!(collected, vec!["Hi".to_string(), ". ".to_string()]);
    }

    #[tokio::test]
    async fn unconfigured_character_yields_empty_stream() {
        let char_b = Character {
            id: CharacterId("b".into()),
            name: "B".into(),
            voice: VoiceDescriptor("voice-b".into()),
        };
        let llm = FakeLanguageModel::new();
        let mut stream = llm
            .generate_stream(GenerateRequest {
                character: char_b,
                user_message: "hello".into(),
                model_settings: None,
            })
            .await
            .unwrap();
        assert!(stream.next().await.is_none());
    }
}
