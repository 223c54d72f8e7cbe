use callcap_core::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EslError {
    #[error("Event socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Command '{command}' rejected: {reply}")]
    CommandRejected { command: String, reply: String },

    #[error("Unexpected {0} frame")]
    UnexpectedFrame(String),

    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Event socket closed")]
    Closed,
}

impl From<EslError> for SourceError {
    fn from(err: EslError) -> Self {
        match err {
            EslError::Io(e) => SourceError::Io(e),
            other => SourceError::Protocol(other.to_string()),
        }
    }
}
