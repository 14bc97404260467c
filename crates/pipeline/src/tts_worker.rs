//! C2: the TTS Worker. A single long-lived task, unaware of turns, that
//! loops on `SentenceQ.get` and drives the external `TextToSpeech`
//! collaborator.

use std::sync::Arc;

use futures::StreamExt;
use parlance_core::{AudioChunk, TextToSpeech};

use crate::queues::{AudioQ, SentenceQ};

pub struct TtsWorker<T: TextToSpeech> {
    engine: Arc<T>,
    sentence_q: SentenceQ,
    audio_q: AudioQ,
}

impl<T: TextToSpeech + 'static> TtsWorker<T> {
    pub fn new(engine: Arc<T>, sentence_q: SentenceQ, audio_q: AudioQ) -> Self {
        Self { engine, sentence_q, audio_q }
    }

    /// Runs until `SentenceQ` is closed (session teardown). Never stopped
    /// or restarted per-turn — interrupts are implemented purely by
    /// draining queues (§4.2, §5).
    pub async fn run(self) {
        tracing::info!("tts worker started");
        loop {
            let sentence = match self.sentence_q.get().await {
                Ok(s) => s,
                Err(_) => {
                    tracing::info!("tts worker stopping: sentence queue closed");
                    break;
                }
            };
            self.handle_sentence(sentence).await;
        }
    }

    async fn handle_sentence(&self, sentence: parlance_core::Sentence) {
        if sentence.is_final {
            let chunk = AudioChunk::sentinel(
                sentence.sentence_index,
                sentence.message_id,
                sentence.character_id,
                sentence.character_name,
                sentence.speaker_index,
            );
            if self.audio_q.put(chunk).await.is_err() {
                tracing::error!("audio queue closed while emitting end-of-speaker sentinel");
            }
            return;
        }

        let stream = match self.engine.synthesize_stream(&sentence.text, &sentence.voice).await {
            Ok(stream) => stream,
            Err(err) => {
                // Transient per-sentence TTS error (§7): log and skip. No
                // exception propagates, no premature sentinel is emitted —
                // the orchestrator's own speaker-final sentinel still
                // arrives and advances the scheduler.
                tracing::warn!(
                    error = %err,
                    sentence_index = sentence.sentence_index,
                    message_id = %sentence.message_id,
                    "tts synthesis failed, skipping sentence"
                );
                return;
            }
        };

        tokio::pin!(stream);
        let mut chunk_index = 0u32;
        while let Some(item) = stream.next().await {
            match item {
                Ok(payload) => {
                    let chunk = AudioChunk {
                        payload,
                        sentence_index: sentence.sentence_index,
                        chunk_index,
                        message_id: sentence.message_id,
                        character_id: sentence.character_id.clone(),
                        character_name: sentence.character_name.clone(),
                        speaker_index: sentence.speaker_index,
                        is_final: false,
                    };
                    chunk_index += 1;
                    if self.audio_q.put(chunk).await.is_err() {
                        tracing::error!("audio queue closed mid-sentence");
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        sentence_index = sentence.sentence_index,
                        "tts chunk error mid-sentence, skipping remainder"
                    );
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use parlance_core::{Character, CharacterId, MessageId, Result, Sentence, VoiceDescriptor};

    struct FakeTts {
        chunks_per_sentence: usize,
        fail_text: Option<&'static str>,
    }

    #[async_trait]
    impl TextToSpeech for FakeTts {
        async fn synthesize_stream(
            &self,
            text: &str,
            _voice: &VoiceDescriptor,
        ) -> Result<BoxStream<'static, Result<Vec<u8>>>> {
            if self.fail_text == Some(text) {
                return Err(parlance_core::Error::TextToSpeech("boom".into()));
            }
            let n = self.chunks_per_sentence;
            Ok(stream::iter((0..n).map(|i| Ok(vec![i as u8]))).boxed())
        }
    }

    fn sentence(text: &str, idx: u32, is_final: bool) -> Sentence {
        Sentence {
            text: text.to_string(),
            sentence_index: idx,
            message_id: MessageId::new(),
            character_id: CharacterId("a".into()),
            character_name: "A".into(),
            voice: VoiceDescriptor("voice-a".into()),
            speaker_index: 0,
            is_final,
        }
    }

    #[tokio::test]
    async fn emits_chunks_then_sentinel_on_final() {
        let engine = Arc::new(FakeTts { chunks_per_sentence: 3, fail_text: None });
        let sentence_q = SentenceQ::new(8);
        let audio_q = AudioQ::new(8);
        let worker = TtsWorker::new(engine, sentence_q.clone(), audio_q.clone());
        let handle = tokio::spawn(worker.run());

        sentence_q.put(sentence("Hi.", 0, false)).await.unwrap();
        sentence_q
            .put(Sentence { is_final: true, ..sentence("", 1, true) })
            .await
            .unwrap();

        let mut chunks = Vec::new();
        for _ in 0..4 {
            chunks.push(audio_q.get().await.unwrap());
        }
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[2].chunk_index, 2);
        assert!(chunks[3].is_final);
        drop(sentence_q);
        let _ = handle.await;
    }

    #[tokio::test]
    async fn tts_failure_is_skipped_not_propagated() {
        let engine = Arc::new(FakeTts { chunks_per_sentence: 2, fail_text: Some("bad.") });
        let sentence_q = SentenceQ::new(8);
        let audio_q = AudioQ::new(8);
        let worker = TtsWorker::new(engine, sentence_q.clone(), audio_q.clone());
        tokio::spawn(worker.run());

        sentence_q.put(sentence("bad.", 0, false)).await.unwrap();
        sentence_q.put(sentence("ok.", 1, false)).await.unwrap();

        // only the second sentence's chunks should appear; no sentinel was
        // fabricated for the failed one.
        let first = audio_q.get().await.unwrap();
        assert_eq!(first.sentence_index, 1);
        assert_eq!(first.chunk_index, 0);
    }
}
