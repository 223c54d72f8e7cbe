//! Switch event-socket connection settings.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// FreeSWITCH event socket (ESL) connection parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct EslConfig {
    /// Switch host name or address.
    #[validate(length(min = 1))]
    #[serde(default = "default_host")]
    pub host: String,

    /// Event socket port.
    #[validate(range(min = 1))]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Event socket password.
    #[validate(length(min = 1))]
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    8021
}

fn default_password() -> String {
    "ClueCon".into()
}

impl Default for EslConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: default_password(),
        }
    }
}
