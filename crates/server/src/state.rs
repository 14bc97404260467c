//! Shared application state: settings and the collaborator implementations
//! handed to every session's Turn Orchestrator / TTS Worker.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use parlance_config::Settings;
use parlance_core::{CharacterCatalog, LanguageModel, TextToSpeech};
use uuid::Uuid;

use crate::reference::{default_roster, EchoLanguageModel, RosterCatalog, SilentTts};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub catalog: Arc<dyn CharacterCatalog>,
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Arc<dyn TextToSpeech>,
    /// Session ids minted by `POST /sessions` awaiting their WebSocket
    /// upgrade. Not a durable session registry — multi-user routing and
    /// distributed session state are explicitly out of scope.
    pending_sessions: Arc<Mutex<HashSet<Uuid>>>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            catalog: Arc::new(RosterCatalog::new(default_roster())),
            llm: Arc::new(EchoLanguageModel),
            tts: Arc::new(SilentTts::new()),
            pending_sessions: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn mint_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.pending_sessions.lock().insert(id);
        id
    }

    /// Consumes a pending session id on WebSocket upgrade. Returns `false`
    /// for an unknown or already-connected id.
    pub fn claim_session(&self, id: Uuid) -> bool {
        self.pending_sessions.lock().remove(&id)
    }
}
