//! ## callcap-core::events
//! **Signaling events addressed by header name**
//!
//! Events are read-only maps from header name to value. Only the headers
//! listed in [`headers`] are interpreted; everything else is carried along.

mod source;

use std::collections::HashMap;
use std::fmt;

pub use source::EventSource;

/// Header names read by the correlator and the capture lifecycle.
pub mod headers {
    pub const EVENT_NAME: &str = "Event-Name";
    pub const UNIQUE_ID: &str = "Unique-ID";
    pub const CALLER_DIRECTION: &str = "Caller-Direction";
    pub const CALLER_NUMBER: &str = "Caller-Caller-ID-Number";
    pub const DESTINATION_NUMBER: &str = "Caller-Destination-Number";
    pub const CALLEE_NUMBER: &str = "Caller-Callee-ID-Number";
    pub const OTHER_LEG_UNIQUE_ID: &str = "Other-Leg-Unique-ID";
    pub const SESSION_ID: &str = "variable_session_id";
    pub const EVENT_DATE_LOCAL: &str = "Event-Date-Local";
    pub const LOCAL_MEDIA_IP: &str = "variable_local_media_ip";
    pub const LOCAL_MEDIA_PORT: &str = "variable_local_media_port";
    pub const REMOTE_MEDIA_IP: &str = "variable_remote_media_ip";
    pub const REMOTE_MEDIA_PORT: &str = "variable_remote_media_port";
}

/// The event kinds the dispatcher routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    ChannelCreate,
    ChannelAnswer,
    ChannelHangup,
    Other(String),
}

impl EventKind {
    /// Event names the source has to subscribe to.
    pub const SUBSCRIBED: [&'static str; 3] = ["CHANNEL_CREATE", "CHANNEL_ANSWER", "CHANNEL_HANGUP"];

    pub fn from_name(name: &str) -> Self {
        match name {
            "CHANNEL_CREATE" => EventKind::ChannelCreate,
            "CHANNEL_ANSWER" => EventKind::ChannelAnswer,
            "CHANNEL_HANGUP" => EventKind::ChannelHangup,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// Call direction as seen by the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inbound" => Some(Direction::Inbound),
            "outbound" => Some(Direction::Outbound),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signaling event. Header lookup ignores ASCII case, like the switch's
/// own client library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalEvent {
    headers: HashMap<String, String>,
}

impl SignalEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Builder form of [`SignalEvent::set_header`].
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_name(self.header(headers::EVENT_NAME).unwrap_or_default())
    }

    pub fn leg_id(&self) -> Option<&str> {
        self.header(headers::UNIQUE_ID).filter(|id| !id.is_empty())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SignalEvent {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut event = SignalEvent::new();
        for (k, v) in iter {
            event.set_header(k, v);
        }
        event
    }
}
