use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline queue closed")]
    QueueClosed,

    #[error("client transport send failed: {0}")]
    TransportSend(String),
}

impl From<parlance_core::Error> for PipelineError {
    fn from(err: parlance_core::Error) -> Self {
        match err {
            parlance_core::Error::QueueClosed => PipelineError::QueueClosed,
            parlance_core::Error::Transport(msg) => PipelineError::TransportSend(msg),
            other => PipelineError::TransportSend(other.to_string()),
        }
    }
}
