// callcap-config/src/capture.rs
//! Packet capture configuration.
//!
//! Defines where and how the per-call capture processes are launched:
//! - Transport protocol used in the port filter
//! - Network interface carrying the media
//! - Output directory for the pcap files

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Packet capture configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CaptureConfig {
    /// Transport protocol of the media stream (udp, tcp).
    #[validate(custom(function = validation::validate_protocol))]
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Network interface for live capture.
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Directory the pcap files are written to. Created if absent.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Capture tool executable.
    #[serde(default = "default_tcpdump")]
    pub tcpdump: PathBuf,

    /// Log the full capture command line of every launch.
    #[serde(default)]
    pub debug: bool,
}

fn default_protocol() -> String {
    "udp".into()
}

fn default_interface() -> String {
    "bond0".into()
}

fn default_directory() -> PathBuf {
    PathBuf::from("./pcap")
}

fn default_tcpdump() -> PathBuf {
    PathBuf::from("tcpdump")
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            interface: default_interface(),
            directory: default_directory(),
            tcpdump: default_tcpdump(),
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capture_config_is_valid() {
        CaptureConfig::default()
            .validate()
            .expect("Default capture config should be valid");
    }

    #[test]
    fn rejects_unknown_protocol() {
        let config = CaptureConfig {
            protocol: "icmp".into(),
            ..CaptureConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
