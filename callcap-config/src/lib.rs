//! # callcap Configuration System
//!
//! Layered configuration for the call capture daemon.
//!
//! ## Features
//! - **Unified Configuration**: one struct for the switch connection, capture
//!   parameters, monitored numbers, run loop and telemetry
//! - **Validation**: every section is checked before the daemon starts; an
//!   empty number list or a malformed interface name is fatal
//! - **Environment Awareness**: YAML files, `CALLCAP_*` variables and command
//!   line overrides are merged in that order

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{providers::Serialized, Figment};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod capture;
mod error;
mod esl;
mod monitor;
mod provider;
mod runtime;
mod telemetry;
mod validation;

pub use capture::CaptureConfig;
pub use error::ConfigError;
pub use esl::EslConfig;
pub use monitor::MonitorConfig;
pub use provider::{ConfigProvider, LayeredProvider};
pub use runtime::RuntimeConfig;
pub use telemetry::TelemetryConfig;

/// Top‑level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct CallcapConfig {
    /// Switch event socket connection.
    #[validate(nested)]
    #[serde(default)]
    pub esl: EslConfig,

    /// Packet capture parameters.
    #[validate(nested)]
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Monitored numbers.
    #[validate(nested)]
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Run loop parameters.
    #[validate(nested)]
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Logging configuration.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl CallcapConfig {
    /// Load configuration from default files and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&LayeredProvider::new())
    }

    /// Load configuration from a specific path for testing/validation.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_from(&LayeredProvider::with_file(path))
    }

    /// Load from `provider` and validate.
    pub fn load_from<P: ConfigProvider>(provider: &P) -> Result<Self, ConfigError> {
        Self::finish(provider.load()?)
    }

    /// Load from `provider`, then merge `overrides` on top (typically the
    /// command line), then validate.
    ///
    /// `overrides` must serialize to a partial config: absent fields keep the
    /// value from the lower layers.
    pub fn load_with<P, O>(provider: &P, overrides: O) -> Result<Self, ConfigError>
    where
        P: ConfigProvider,
        O: Serialize,
    {
        Self::finish(provider.load()?.merge(Serialized::defaults(overrides)))
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
