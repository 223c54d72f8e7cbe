//! Call records: one per tracked leg.

use std::fmt;

use callcap_capture::CaptureProcess;

use crate::events::{headers, Direction, SignalEvent};

/// Session id used when the switch did not provide one.
pub const DEFAULT_SESSION_ID: &str = "0";

/// Media addresses negotiated on answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    pub local_ip: Option<String>,
    pub local_port: Option<u16>,
    pub remote_ip: Option<String>,
    pub remote_port: Option<u16>,
}

impl MediaInfo {
    pub fn from_event(event: &SignalEvent) -> Self {
        let port = |name: &str| event.header(name).and_then(|p| p.trim().parse::<u16>().ok());
        Self {
            local_ip: event.header(headers::LOCAL_MEDIA_IP).map(str::to_string),
            local_port: port(headers::LOCAL_MEDIA_PORT),
            remote_ip: event.header(headers::REMOTE_MEDIA_IP).map(str::to_string),
            remote_port: port(headers::REMOTE_MEDIA_PORT),
        }
    }
}

pub struct CallRecord {
    pub leg_id: String,
    pub session_id: String,
    pub direction: Direction,
    pub caller_number: String,
    pub called_number: String,
    /// Digits-only local event time of the leg's creation.
    pub call_time: String,
    /// The correlated leg of the same call. Resolved through the store.
    pub sibling_leg_id: Option<String>,
    /// Present once the leg has been answered.
    pub media: Option<MediaInfo>,
    pub capture: Option<Box<dyn CaptureProcess>>,
    /// Name of the active or most recent capture.
    pub capture_name: Option<String>,
}

impl CallRecord {
    pub fn new(
        leg_id: impl Into<String>,
        session_id: impl Into<String>,
        direction: Direction,
        caller_number: impl Into<String>,
        called_number: impl Into<String>,
        call_time: impl Into<String>,
    ) -> Self {
        Self {
            leg_id: leg_id.into(),
            session_id: session_id.into(),
            direction,
            caller_number: caller_number.into(),
            called_number: called_number.into(),
            call_time: call_time.into(),
            sibling_leg_id: None,
            media: None,
            capture: None,
            capture_name: None,
        }
    }

    /// `{session}_{caller}_{called}_{direction}_{time}.pcap`. Empty fields
    /// stay in place so the field count never changes.
    pub fn capture_file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}.pcap",
            self.session_id, self.caller_number, self.called_number, self.direction, self.call_time
        )
    }

    pub fn has_active_capture(&self) -> bool {
        self.capture.is_some()
    }

    /// Stops and drops the capture, if any. Returns its name when one was
    /// running.
    pub fn stop_capture(&mut self) -> Option<String> {
        let mut capture = self.capture.take()?;
        capture.stop();
        Some(capture.name().to_string())
    }
}

impl fmt::Debug for CallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallRecord")
            .field("leg_id", &self.leg_id)
            .field("session_id", &self.session_id)
            .field("direction", &self.direction)
            .field("caller_number", &self.caller_number)
            .field("called_number", &self.called_number)
            .field("call_time", &self.call_time)
            .field("sibling_leg_id", &self.sibling_leg_id)
            .field("media", &self.media)
            .field("capture", &self.capture.as_ref().map(|c| c.name()))
            .field("capture_name", &self.capture_name)
            .finish()
    }
}

/// Strips the date/time separators from `Event-Date-Local`
/// (`2024-01-02 03:04:05` becomes `20240102030405`).
pub fn call_time(local: Option<&str>) -> String {
    local
        .unwrap_or_default()
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | ':'))
        .collect()
}
