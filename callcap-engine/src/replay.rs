//! Offline scenario replay.
//!
//! A scenario is a YAML document listing signaling events as header maps:
//!
//! ```yaml
//! name: monitored inbound call
//! events:
//!   - Event-Name: CHANNEL_CREATE
//!     Unique-ID: L1
//!     Caller-Direction: inbound
//!     Caller-Caller-ID-Number: 111
//! ```
//!
//! Scalar values of any YAML type are taken as their string form.

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::Value;

use callcap_core::events::{EventSource, SignalEvent};
use callcap_core::SourceError;

use crate::engine::EngineError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub events: Vec<BTreeMap<String, Value>>,
}

impl Scenario {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let file = File::open(path.as_ref())?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, EngineError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_events(&self) -> Result<Vec<SignalEvent>, EngineError> {
        self.events
            .iter()
            .enumerate()
            .map(|(index, headers)| {
                headers
                    .iter()
                    .map(|(name, value)| {
                        scalar_to_string(value)
                            .map(|value| (name.clone(), value))
                            .ok_or_else(|| {
                                EngineError::Scenario(format!(
                                    "event {}: header {} is not a scalar",
                                    index, name
                                ))
                            })
                    })
                    .collect::<Result<SignalEvent, _>>()
            })
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// An in-memory event source. Ends after its last event unless held open,
/// in which case it waits until disconnected.
#[derive(Debug, Default)]
pub struct ScenarioSource {
    events: VecDeque<SignalEvent>,
    hold_open: bool,
    disconnected: bool,
}

impl ScenarioSource {
    pub fn new(events: Vec<SignalEvent>) -> Self {
        Self {
            events: events.into(),
            ..Self::default()
        }
    }

    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

#[async_trait]
impl EventSource for ScenarioSource {
    async fn next_event(&mut self) -> Result<Option<SignalEvent>, SourceError> {
        if self.disconnected {
            return Ok(None);
        }
        match self.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn disconnect(&mut self) {
        self.events.clear();
        self.disconnected = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callcap_core::events::{headers, EventKind};
    use std::io::Write;

    const SCENARIO: &str = r#"
name: linked call
events:
  - Event-Name: CHANNEL_CREATE
    Unique-ID: L1
    Caller-Direction: inbound
    Caller-Caller-ID-Number: 111
    Caller-Destination-Number: "222"
  - Event-Name: CHANNEL_ANSWER
    Unique-ID: L1
    variable_local_media_port: 30000
    variable_rtp_secure_media: false
    variable_sip_h_X-Empty: ~
"#;

    #[test]
    fn scalars_become_header_strings() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        assert_eq!(scenario.name.as_deref(), Some("linked call"));

        let events = scenario.to_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::ChannelCreate);
        assert_eq!(events[0].header(headers::CALLER_NUMBER), Some("111"));
        assert_eq!(events[1].header(headers::LOCAL_MEDIA_PORT), Some("30000"));
        assert_eq!(events[1].header("variable_rtp_secure_media"), Some("false"));
        assert_eq!(events[1].header("variable_sip_h_X-Empty"), Some(""));
    }

    #[test]
    fn nested_values_are_rejected() {
        let scenario = Scenario::from_yaml(
            "events:\n  - Event-Name: CHANNEL_CREATE\n    Unique-ID: [L1, L2]\n",
        )
        .unwrap();
        let err = scenario.to_events().unwrap_err();
        assert!(err.to_string().contains("Unique-ID"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        let scenario = Scenario::load_from_file(file.path()).unwrap();
        assert_eq!(scenario.events.len(), 2);
    }

    #[tokio::test]
    async fn source_drains_then_disconnects() {
        let events = Scenario::from_yaml(SCENARIO).unwrap().to_events().unwrap();
        let mut source = ScenarioSource::new(events);
        assert!(source.next_event().await.unwrap().is_some());
        source.disconnect().await;
        source.disconnect().await;
        assert!(source.next_event().await.unwrap().is_none());
        assert!(source.is_disconnected());
    }
}
