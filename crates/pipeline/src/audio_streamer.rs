//! C3: the Audio Streamer. A single long-lived task that loops on
//! `AudioQ.get`, passes each chunk through the Speaker-Order Scheduler, and
//! emits the framed lifecycle events the scheduler's releases imply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parlance_core::{AudioChunk, MessageId, TransportSink};
use serde_json::json;

use crate::error::PipelineError;
use crate::queues::AudioQ;
use crate::scheduler::Scheduler;

/// A courtesy barge-in primitive (§4.3): when set, PCM payload emission is
/// skipped for the current speaker's remaining chunks (metadata and
/// lifecycle messages are still emitted). Cleared automatically on the next
/// `audio_stream_stop`. Not triggered by any default handler; an external
/// policy may clone this handle and set it.
#[derive(Clone, Default)]
pub struct SuppressFlag(Arc<AtomicBool>);

impl SuppressFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A handle that lets a component other than the streamer's own task (the
/// interrupt handler) request the reset described in §9 ("Avoiding hidden
/// shared state": scheduler state lives inside the streamer task and is
/// reset by observing a flag, not by reaching in from outside). The
/// streamer applies a pending reset before processing its next chunk; since
/// queue drain happens synchronously before `interrupt_ack` (§5), there is
/// never a chunk in flight when the reset is observed.
#[derive(Clone, Default)]
pub struct ResetHandle(Arc<AtomicBool>);

impl ResetHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

pub struct AudioStreamer {
    audio_q: AudioQ,
    transport: Arc<dyn TransportSink>,
    scheduler: Scheduler,
    sample_rate: u32,
    current_message_id: Option<MessageId>,
    suppress: SuppressFlag,
    reset_handle: ResetHandle,
}

impl AudioStreamer {
    pub fn new(audio_q: AudioQ, transport: Arc<dyn TransportSink>, sample_rate: u32) -> Self {
        Self {
            audio_q,
            transport,
            scheduler: Scheduler::new(),
            sample_rate,
            current_message_id: None,
            suppress: SuppressFlag::new(),
            reset_handle: ResetHandle::new(),
        }
    }

    pub fn suppress_flag(&self) -> SuppressFlag {
        self.suppress.clone()
    }

    pub fn reset_handle(&self) -> ResetHandle {
        self.reset_handle.clone()
    }

    /// Resets scheduler and streamer-local state to the initial state, used
    /// on interrupt (§5, §9).
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.current_message_id = None;
        self.suppress.clear();
    }

    /// Runs until `AudioQ` is closed. A transport send failure is treated as
    /// a disconnect (§7) and escalates to the caller for session teardown.
    pub async fn run(mut self) -> Result<(), PipelineError> {
        tracing::info!("audio streamer started");
        loop {
            if self.reset_handle.take() {
                self.reset();
            }
            let chunk = match self.audio_q.get().await {
                Ok(c) => c,
                Err(_) => {
                    tracing::info!("audio streamer stopping: audio queue closed");
                    return Ok(());
                }
            };
            for released in self.scheduler.feed(chunk) {
                self.emit(released).await?;
            }
        }
    }

    async fn emit(&mut self, chunk: AudioChunk) -> Result<(), PipelineError> {
        if chunk.is_final {
            self.transport
                .send_json(json!({
                    "type": "audio_stream_stop",
                    "data": {
                        "character_id": chunk.character_id.0,
                        "character_name": chunk.character_name,
                        "message_id": chunk.message_id.0,
                        "speaker_index": chunk.speaker_index,
                    }
                }))
                .await
                .map_err(|e| PipelineError::TransportSend(e.to_string()))?;
            self.current_message_id = None;
            self.suppress.clear();
            return Ok(());
        }

        if self.current_message_id != Some(chunk.message_id) {
            self.transport
                .send_json(json!({
                    "type": "audio_stream_start",
                    "data": {
                        "character_id": chunk.character_id.0,
                        "character_name": chunk.character_name,
                        "message_id": chunk.message_id.0,
                        "speaker_index": chunk.speaker_index,
                        "sample_rate": self.sample_rate,
                    }
                }))
                .await
                .map_err(|e| PipelineError::TransportSend(e.to_string()))?;
            self.current_message_id = Some(chunk.message_id);
        }

        self.transport
            .send_json(json!({
                "type": "audio_chunk",
                "data": {
                    "character_id": chunk.character_id.0,
                    "character_name": chunk.character_name,
                    "message_id": chunk.message_id.0,
                    "speaker_index": chunk.speaker_index,
                    "sentence_index": chunk.sentence_index,
                    "chunk_index": chunk.chunk_index,
                }
            }))
            .await
            .map_err(|e| PipelineError::TransportSend(e.to_string()))?;

        if !self.suppress.is_set() {
            self.transport
                .send_binary(chunk.payload)
                .await
                .map_err(|e| PipelineError::TransportSend(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use parlance_core::{CharacterId, Error, Result};

    #[derive(Default, Clone)]
    struct RecordingTransport {
        json: Arc<Mutex<Vec<serde_json::Value>>>,
        binary_count: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl TransportSink for RecordingTransport {
        async fn send_json(&self, value: serde_json::Value) -> Result<()> {
            self.json.lock().push(value);
            Ok(())
        }
        async fn send_binary(&self, _data: Vec<u8>) -> Result<()> {
            *self.binary_count.lock() += 1;
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl TransportSink for FailingTransport {
        async fn send_json(&self, _value: serde_json::Value) -> Result<()> {
            Err(Error::Transport("closed".into()))
        }
        async fn send_binary(&self, _data: Vec<u8>) -> Result<()> {
            Err(Error::Transport("closed".into()))
        }
    }

    fn chunk(speaker: u32, chunk_index: u32, is_final: bool, message_id: MessageId) -> AudioChunk {
        AudioChunk {
            payload: if is_final { Vec::new() } else { vec![1, 2, 3] },
            sentence_index: 0,
            chunk_index,
            message_id,
            character_id: CharacterId("a".into()),
            character_name: "A".into(),
            speaker_index: speaker,
            is_final,
        }
    }

    #[tokio::test]
    async fn emits_start_chunk_stop_lifecycle() {
        let audio_q = AudioQ::new(8);
        let transport = RecordingTransport::default();
        let mut streamer = AudioStreamer::new(audio_q.clone(), Arc::new(transport.clone()), 24000);

        let mid = MessageId::new();
        audio_q.put(chunk(0, 0, false, mid)).await.unwrap();
        audio_q.put(chunk(0, 0, true, mid)).await.unwrap();
        drop(audio_q);

        streamer.run().await.unwrap();

        let events = transport.json.lock();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["type"], "audio_stream_start");
        assert_eq!(events[1]["type"], "audio_chunk");
        assert_eq!(events[2]["type"], "audio_stream_stop");
        assert_eq!(*transport.binary_count.lock(), 1);
    }

    #[tokio::test]
    async fn suppress_flag_skips_binary_but_keeps_metadata() {
        let audio_q = AudioQ::new(8);
        let transport = RecordingTransport::default();
        let mut streamer = AudioStreamer::new(audio_q.clone(), Arc::new(transport.clone()), 24000);
        let suppress = streamer.suppress_flag();
        suppress.set();

        let mid = MessageId::new();
        audio_q.put(chunk(0, 0, false, mid)).await.unwrap();
        audio_q.put(chunk(0, 0, true, mid)).await.unwrap();
        drop(audio_q);

        streamer.run().await.unwrap();
        assert_eq!(*transport.binary_count.lock(), 0);
        assert!(!suppress.is_set()); // cleared by the stop event
    }

    #[tokio::test]
    async fn transport_failure_escalates() {
        let audio_q = AudioQ::new(8);
        let mut streamer = AudioStreamer::new(audio_q.clone(), Arc::new(FailingTransport), 24000);
        audio_q.put(chunk(0, 0, false, MessageId::new())).await.unwrap();
        let result = streamer.run().await;
        assert!(result.is_err());
    }
}
