//! Capture lifecycle.
//!
//! A tracked leg gets a capture when its media is answered and loses it on
//! hangup or shutdown. Launch failures leave the call unmonitored; nothing is
//! retried.

use std::path::PathBuf;
use std::sync::Arc;

use callcap_capture::{CaptureError, CaptureLauncher, CaptureRequest, Protocol};
use tracing::{debug, info, warn};

use crate::events::{headers, SignalEvent};
use crate::record::MediaInfo;
use crate::store::CallStore;

#[derive(Debug)]
pub enum AnswerOutcome {
    NotTracked,
    /// The answer carried no usable local media port.
    NoMediaPort { leg_id: String, raw: Option<String> },
    Started {
        leg_id: String,
        session_id: String,
        capture_name: String,
        port: u16,
    },
    Failed {
        leg_id: String,
        capture_name: String,
        error: CaptureError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HangupOutcome {
    NotTracked,
    Removed {
        leg_id: String,
        session_id: String,
        stopped_capture: Option<String>,
        /// No other leg of the call is tracked any more.
        call_ended: bool,
    },
}

/// Where and how captures are written.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub protocol: Protocol,
    pub interface: String,
    pub directory: PathBuf,
}

pub struct CaptureLifecycle {
    launcher: Arc<dyn CaptureLauncher>,
    settings: CaptureSettings,
}

impl CaptureLifecycle {
    pub fn new(launcher: Arc<dyn CaptureLauncher>, settings: CaptureSettings) -> Self {
        Self { launcher, settings }
    }

    /// Records the negotiated media and starts a capture on the local port.
    pub fn on_answer(&self, store: &mut CallStore, event: &SignalEvent) -> AnswerOutcome {
        let Some(record) = event.leg_id().and_then(|id| store.get_mut(id)) else {
            return AnswerOutcome::NotTracked;
        };

        let media = MediaInfo::from_event(event);
        let port = media.local_port;
        record.media = Some(media);

        let Some(port) = port else {
            let raw = event.header(headers::LOCAL_MEDIA_PORT).map(str::to_string);
            warn!(
                "{} no usable local media port ({:?}) on leg {}, not capturing",
                record.session_id, raw, record.leg_id
            );
            return AnswerOutcome::NoMediaPort {
                leg_id: record.leg_id.clone(),
                raw,
            };
        };

        // A re-answered leg must not leak the capture it already has.
        if let Some(previous) = record.stop_capture() {
            debug!("{} tcpdump end {} (re-answered)", record.session_id, previous);
        }

        let capture_name = record.capture_file_name();
        let request = CaptureRequest {
            protocol: self.settings.protocol,
            interface: self.settings.interface.clone(),
            output: self.settings.directory.join(&capture_name),
            port,
        };

        match self.launcher.launch(request) {
            Ok(capture) => {
                info!(
                    "{} tcpdump begin {} on {} port(src&dst) {}",
                    record.session_id, capture_name, self.settings.interface, port
                );
                record.capture = Some(capture);
                record.capture_name = Some(capture_name.clone());
                AnswerOutcome::Started {
                    leg_id: record.leg_id.clone(),
                    session_id: record.session_id.clone(),
                    capture_name,
                    port,
                }
            }
            Err(error) => {
                warn!(
                    "{} tcpdump failed {} on {} port(src&dst) {}: {}",
                    record.session_id, capture_name, self.settings.interface, port, error
                );
                AnswerOutcome::Failed {
                    leg_id: record.leg_id.clone(),
                    capture_name,
                    error,
                }
            }
        }
    }

    /// Stops the leg's capture, if any, and forgets the leg.
    pub fn on_hangup(&self, store: &mut CallStore, event: &SignalEvent) -> HangupOutcome {
        let Some(mut record) = event.leg_id().and_then(|id| store.remove(id)) else {
            return HangupOutcome::NotTracked;
        };

        let stopped_capture = record.stop_capture();
        if let Some(name) = &stopped_capture {
            info!("{} tcpdump end {}", record.session_id, name);
        }

        let call_ended = record
            .sibling_leg_id
            .as_deref()
            .map_or(true, |sibling| !store.contains(sibling));

        HangupOutcome::Removed {
            leg_id: record.leg_id,
            session_id: record.session_id,
            stopped_capture,
            call_ended,
        }
    }

    /// Shutdown sweep: stops every capture and empties the store.
    pub fn stop_all(&self, store: &mut CallStore) -> usize {
        let stopped = store.drain_captures();
        for name in &stopped {
            info!("tcpdump end {}", name);
        }
        stopped.len()
    }
}
