use thiserror::Error;

use callcap_capture::CaptureError;
use callcap_config::ConfigError;
use callcap_esl::EslError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Capture setup error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Event socket error: {0}")]
    Connect(#[from] EslError),

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for EngineError {
    fn from(err: serde_yaml::Error) -> Self {
        EngineError::Scenario(err.to_string())
    }
}
