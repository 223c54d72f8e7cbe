use thiserror::Error;

/// Failure of the signaling event source below the dispatcher.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Event source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event source protocol error: {0}")]
    Protocol(String),
}
