//! C5: the Turn Orchestrator (§4.4). A single long-lived task that drives
//! the ingress FIFO, one turn at a time, and is the sole producer for
//! `SentenceQ`.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use parlance_core::{
    CharacterCatalog, Error, GenerateRequest, LanguageModel, MessageId, Sentence, SpeakerIndex,
    TransportSink, TurnId, TurnState,
};
use parlance_pipeline::{IngressQ, SentenceQ, SentenceSegmenter};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::TurnError;

/// Lets the transport layer cancel whatever turn is currently in flight.
/// A no-op if the orchestrator is between turns (Idle) — there is nothing
/// to cancel, and the next ingress message starts a fresh token.
#[derive(Clone)]
pub struct InterruptHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.token.lock().cancel();
    }
}

/// Observes the orchestrator's current turn state (invariant 5: at most one
/// turn in `Llm` at a time — true by construction, since `run` processes
/// the ingress FIFO strictly sequentially on one task).
#[derive(Clone, Default)]
pub struct StateHandle(Arc<Mutex<TurnState>>);

/// Lets the transport layer forward an inbound `model_settings { … }` event
/// (§6) to the orchestrator after it has been moved into its own task.
#[derive(Clone)]
pub struct ModelSettingsHandle(Arc<Mutex<Option<serde_json::Value>>>);

impl ModelSettingsHandle {
    pub fn set(&self, settings: serde_json::Value) {
        *self.0.lock() = Some(settings);
    }
}

impl StateHandle {
    pub fn get(&self) -> TurnState {
        *self.0.lock()
    }

    /// Applies a transition per the §4.4 state diagram; rejects and logs
    /// anything off that diagram instead of silently overwriting the state.
    pub(crate) fn set(&self, next: TurnState) {
        let mut state = self.0.lock();
        if !Self::is_valid_transition(*state, next) {
            let err = Error::InvalidTransition { from: *state, to: next };
            tracing::error!(error = %err, "rejected invalid turn state transition");
            return;
        }
        *state = next;
    }

    fn is_valid_transition(from: TurnState, to: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (from, to),
            (Idle, Llm)
                | (Llm, Tts)
                | (Llm, Complete)
                | (Llm, Cancelled)
                // Zero-character address or a catalog failure (§8) ends the
                // turn immediately with nothing to stream or cancel.
                | (Llm, Idle)
                | (Tts, Streaming)
                | (Tts, Complete)
                | (Tts, Cancelled)
                | (Streaming, Complete)
                | (Streaming, Cancelled)
                | (Complete, Idle)
                | (Cancelled, Idle)
        )
    }
}

pub struct TurnOrchestrator<C, L> {
    ingress_q: IngressQ,
    sentence_q: SentenceQ,
    catalog: Arc<C>,
    llm: Arc<L>,
    transport: Arc<dyn TransportSink>,
    turn_counter: u64,
    cancel_token: Arc<Mutex<CancellationToken>>,
    state: StateHandle,
    model_settings: Arc<Mutex<Option<serde_json::Value>>>,
}

impl<C, L> TurnOrchestrator<C, L>
where
    C: CharacterCatalog + 'static,
    L: LanguageModel + 'static,
{
    pub fn new(
        ingress_q: IngressQ,
        sentence_q: SentenceQ,
        catalog: Arc<C>,
        llm: Arc<L>,
        transport: Arc<dyn TransportSink>,
    ) -> Self {
        Self {
            ingress_q,
            sentence_q,
            catalog,
            llm,
            transport,
            turn_counter: 0,
            cancel_token: Arc::new(Mutex::new(CancellationToken::new())),
            state: StateHandle::default(),
            model_settings: Arc::new(Mutex::new(None)),
        }
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle { token: Arc::clone(&self.cancel_token) }
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    pub fn model_settings_handle(&self) -> ModelSettingsHandle {
        ModelSettingsHandle(Arc::clone(&self.model_settings))
    }

    /// Inbound `model_settings { … }` (§6): passed opaquely to the LLM
    /// collaborator on the next turn.
    pub fn set_model_settings(&self, settings: serde_json::Value) {
        *self.model_settings.lock() = Some(settings);
    }

    /// Runs until `IngressQ` is closed (session teardown).
    pub async fn run(mut self) {
        tracing::info!("turn orchestrator started");
        loop {
            let message = match self.ingress_q.get().await {
                Ok(m) => m,
                Err(_) => {
                    tracing::info!("turn orchestrator stopping: ingress queue closed");
                    return;
                }
            };
            self.process_turn(message).await;
        }
    }

    async fn process_turn(&mut self, message: String) {
        self.turn_counter += 1;
        let turn_id = TurnId(self.turn_counter);
        let token = CancellationToken::new();
        *self.cancel_token.lock() = token.clone();
        self.state.set(TurnState::Llm);
        tracing::info!(turn = %turn_id, "turn started");

        let characters = match self.catalog.parse_addressed(&message).await {
            Ok(chars) => chars,
            Err(err) => {
                tracing::warn!(turn = %turn_id, error = %err, "character catalog failed");
                self.state.set(TurnState::Idle);
                return;
            }
        };

        if characters.is_empty() {
            tracing::info!(turn = %turn_id, "message addressed zero characters");
            self.state.set(TurnState::Idle);
            return;
        }

        let model_settings = self.model_settings.lock().clone();

        for (idx, character) in characters.into_iter().enumerate() {
            let speaker_index = idx as SpeakerIndex;
            if token.is_cancelled() {
                // Cancelled before or between characters (§8): still a
                // single ack, and no speaker-final sentinels are enqueued
                // for yet-to-start speakers.
                self.emit_interrupt_ack().await;
                self.state.set(TurnState::Cancelled);
                self.state.set(TurnState::Idle);
                tracing::info!(turn = %turn_id, "turn cancelled before character started");
                return;
            }
            let cancelled = self
                .stream_character(&message, character, speaker_index, &model_settings, &token)
                .await;
            if cancelled {
                self.emit_interrupt_ack().await;
                self.state.set(TurnState::Cancelled);
                self.state.set(TurnState::Idle);
                tracing::info!(turn = %turn_id, "turn cancelled");
                return;
            }
        }

        self.state.set(TurnState::Complete);
        self.state.set(TurnState::Idle);
        tracing::info!(turn = %turn_id, "turn complete");
    }

    /// Streams one character's reply. Returns `true` if cancellation was
    /// observed and the caller should abandon the turn.
    async fn stream_character(
        &self,
        user_message: &str,
        character: parlance_core::Character,
        speaker_index: SpeakerIndex,
        model_settings: &Option<serde_json::Value>,
        token: &CancellationToken,
    ) -> bool {
        let message_id = MessageId::new();
        if self
            .send_json(json!({
                "type": "text_stream_start",
                "data": {
                    "character_id": character.id.0,
                    "character_name": character.name,
                    "message_id": message_id.0,
                }
            }))
            .await
            .is_err()
        {
            return true;
        }

        let request = GenerateRequest {
            character: character.clone(),
            user_message: user_message.to_string(),
            model_settings: model_settings.clone(),
        };

        let mut token_stream = match tokio::select! {
            biased;
            _ = token.cancelled() => return true,
            result = self.llm.generate_stream(request) => result,
        } {
            Ok(s) => s,
            Err(err) => {
                // LLM stream error before any tokens (§7): truncate with
                // whatever (empty) text has accumulated so far.
                tracing::warn!(error = %err, character = %character.id, "llm stream failed to start");
                futures::stream::empty().boxed()
            }
        };

        let mut segmenter = SentenceSegmenter::new();
        let mut sentence_index = 0u32;
        let mut accumulated = String::new();

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return true,
                next = token_stream.next() => {
                    match next {
                        None => break,
                        Some(Ok(delta)) => {
                            accumulated.push_str(&delta);
                            for sentence_text in segmenter.push_fragment(&delta) {
                                if self
                                    .enqueue_sentence(
                                        &sentence_text,
                                        sentence_index,
                                        message_id,
                                        &character,
                                        speaker_index,
                                        token,
                                    )
                                    .await
                                {
                                    return true;
                                }
                                sentence_index += 1;
                            }
                        }
                        Some(Err(err)) => {
                            // LLM stream error mid-character (§7): the
                            // current reply is truncated, not abandoned.
                            tracing::warn!(error = %err, character = %character.id, "llm stream error mid-character");
                            break;
                        }
                    }
                }
            }
        }

        if let Some(residue) = segmenter.flush() {
            if self
                .enqueue_sentence(&residue, sentence_index, message_id, &character, speaker_index, token)
                .await
            {
                return true;
            }
            sentence_index += 1;
        }

        let sentinel = Sentence::sentinel(
            sentence_index,
            message_id,
            character.id.clone(),
            character.name.clone(),
            character.voice.clone(),
            speaker_index,
        );
        if tokio::select! {
            biased;
            _ = token.cancelled() => true,
            res = self.sentence_q.put(sentinel) => res.is_err(),
        } {
            return true;
        }

        if self
            .send_json(json!({
                "type": "text_chunk",
                "data": {
                    "character_id": character.id.0,
                    "character_name": character.name,
                    "message_id": message_id.0,
                    "text": "",
                    "is_final": true,
                }
            }))
            .await
            .is_err()
        {
            return true;
        }

        self.send_json(json!({
            "type": "text_stream_stop",
            "data": {
                "character_id": character.id.0,
                "character_name": character.name,
                "message_id": message_id.0,
                "text": accumulated,
            }
        }))
        .await
        .is_err()
    }

    #[allow(clippy::too_many_arguments)]
    async fn enqueue_sentence(
        &self,
        text: &str,
        sentence_index: u32,
        message_id: MessageId,
        character: &parlance_core::Character,
        speaker_index: SpeakerIndex,
        token: &CancellationToken,
    ) -> bool {
        let sentence = Sentence {
            text: text.to_string(),
            sentence_index,
            message_id,
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            voice: character.voice.clone(),
            speaker_index,
            is_final: false,
        };
        let put_failed = tokio::select! {
            biased;
            _ = token.cancelled() => return true,
            res = self.sentence_q.put(sentence) => res.is_err(),
        };
        if put_failed {
            return true;
        }
        self.send_json(json!({
            "type": "text_chunk",
            "data": {
                "character_id": character.id.0,
                "character_name": character.name,
                "message_id": message_id.0,
                "text": text,
                "is_final": false,
            }
        }))
        .await
        .is_err()
    }

    async fn emit_interrupt_ack(&self) {
        let _ = self.send_json(json!({"type": "interrupt_ack", "data": {}})).await;
    }

    async fn send_json(&self, value: serde_json::Value) -> Result<(), TurnError> {
        self.transport.send_json(value).await.map_err(TurnError::from)
    }
}
