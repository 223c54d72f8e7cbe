//! Run-loop parameters.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Controls how long the event loop runs before shutting down on its own.
#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RuntimeConfig {
    /// Overall run timeout in seconds. Unset means run until disconnect or signal.
    #[validate(range(min = 1))]
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl RuntimeConfig {
    pub fn timeout(&self) -> Option<std::time::Duration> {
        self.timeout_secs.map(std::time::Duration::from_secs)
    }
}
