use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Network interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("Failed to list capture devices: {0}")]
    DeviceList(#[from] pcap::Error),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Capture process exited immediately ({0})")]
    ExitedEarly(ExitStatus),

    #[error("Capture is already running")]
    AlreadyRunning,

    #[error("Unknown capture protocol: {0}")]
    UnknownProtocol(String),
}
