use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type. Collaborator crates (`parlance-llm`,
/// `parlance-pipeline`, `parlance-turn`, `parlance-server`) define their own
/// error enum and bridge into this one at the boundary, the same way the
/// teacher's `AgentError` bridges `PipelineError`/`LlmError`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("queue closed unexpectedly")]
    QueueClosed,

    #[error("character catalog error: {0}")]
    Catalog(String),

    #[error("language model error: {0}")]
    LanguageModel(String),

    #[error("text-to-speech error: {0}")]
    TextToSpeech(String),

    #[error("transport send failed: {0}")]
    Transport(String),

    #[error("invalid turn state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: crate::types::TurnState, to: crate::types::TurnState },
}
