//! One WebSocket connection's worth of pipeline: the three queues, the
//! long-lived TTS Worker and Audio Streamer tasks, and the Turn
//! Orchestrator, wired together per connection (§4, §5).

use std::sync::Arc;
use std::time::Duration;

use parlance_core::{CharacterCatalog, LanguageModel, TextToSpeech, TransportSink};
use parlance_pipeline::{
    queues::{new_audio_q, new_ingress_q, new_sentence_q},
    AudioStreamer, ResetHandle, TtsWorker,
};
use parlance_turn::{InterruptHandle, ModelSettingsHandle, TurnOrchestrator};
use tokio::task::JoinHandle;

pub struct Session {
    ingress_q: parlance_pipeline::IngressQ,
    sentence_q: parlance_pipeline::SentenceQ,
    audio_q: parlance_pipeline::AudioQ,
    interrupt_handle: InterruptHandle,
    model_settings_handle: ModelSettingsHandle,
    reset_handle: ResetHandle,
    shutdown_timeout: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    pub fn spawn<C, L, T>(
        queue_capacity: usize,
        shutdown_timeout: Duration,
        catalog: Arc<C>,
        llm: Arc<L>,
        tts: Arc<T>,
        transport: Arc<dyn TransportSink>,
    ) -> Self
    where
        C: CharacterCatalog + 'static,
        L: LanguageModel + 'static,
        T: TextToSpeech + 'static,
    {
        let ingress_q = new_ingress_q(queue_capacity);
        let sentence_q = new_sentence_q(queue_capacity);
        let audio_q = new_audio_q(queue_capacity);

        let sample_rate = tts.sample_rate();
        let tts_worker = TtsWorker::new(tts, sentence_q.clone(), audio_q.clone());
        let tts_task = tokio::spawn(tts_worker.run());

        let streamer = AudioStreamer::new(audio_q.clone(), Arc::clone(&transport), sample_rate);
        let reset_handle = streamer.reset_handle();
        let streamer_task = tokio::spawn(async move {
            if let Err(err) = streamer.run().await {
                tracing::warn!(error = %err, "audio streamer exited with error");
            }
        });

        let orchestrator =
            TurnOrchestrator::new(ingress_q.clone(), sentence_q.clone(), catalog, llm, transport);
        let interrupt_handle = orchestrator.interrupt_handle();
        let model_settings_handle = orchestrator.model_settings_handle();
        let orchestrator_task = tokio::spawn(orchestrator.run());

        Self {
            ingress_q,
            sentence_q,
            audio_q,
            interrupt_handle,
            model_settings_handle,
            reset_handle,
            shutdown_timeout,
            tasks: vec![tts_task, streamer_task, orchestrator_task],
        }
    }

    pub async fn submit_user_message(&self, text: String) {
        if self.ingress_q.put(text).await.is_err() {
            tracing::warn!("ingress queue closed, dropping user message");
        }
    }

    /// Forwards an inbound `model_settings { … }` event (§6) to the
    /// orchestrator; takes effect on the next turn.
    pub fn set_model_settings(&self, settings: serde_json::Value) {
        self.model_settings_handle.set(settings);
    }

    /// The client interrupt protocol (§5): cancel the orchestrator's
    /// in-flight turn, drain all three queues synchronously, and request
    /// the Audio Streamer reset its scheduler state. The orchestrator
    /// itself emits `interrupt_ack` once it observes the cancellation; if
    /// no turn was in flight, nothing was cancelled and no ack is owed.
    pub async fn interrupt(&self) {
        self.interrupt_handle.interrupt();
        self.ingress_q.drain();
        self.sentence_q.drain();
        self.audio_q.drain();
        self.reset_handle.request();
    }

    /// Drops the producer-side queue handles so the long-lived workers
    /// observe closed queues and exit, then waits up to the configured
    /// graceful-shutdown window for them to do so.
    pub async fn shutdown(self) {
        drop(self.ingress_q);
        drop(self.sentence_q);
        drop(self.audio_q);
        let join_all = futures::future::join_all(self.tasks);
        if tokio::time::timeout(self.shutdown_timeout, join_all).await.is_err() {
            tracing::warn!("session workers did not exit within the graceful shutdown window");
        }
    }
}
