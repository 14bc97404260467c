use thiserror::Error;

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("character catalog error: {0}")]
    Catalog(String),

    #[error("sentence queue closed")]
    QueueClosed,

    #[error("client transport send failed: {0}")]
    Transport(String),
}

impl From<parlance_core::Error> for TurnError {
    fn from(err: parlance_core::Error) -> Self {
        match err {
            parlance_core::Error::QueueClosed => TurnError::QueueClosed,
            parlance_core::Error::Transport(msg) => TurnError::Transport(msg),
            parlance_core::Error::Catalog(msg) => TurnError::Catalog(msg),
            other => TurnError::Transport(other.to_string()),
        }
    }
}
