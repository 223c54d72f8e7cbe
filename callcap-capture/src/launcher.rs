//! The launch seam between the call lifecycle and the capture tool.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{CaptureError, CaptureHandle};

/// Transport the media port filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => f.write_str("udp"),
            Protocol::Tcp => f.write_str("tcp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            other => Err(CaptureError::UnknownProtocol(other.to_string())),
        }
    }
}

/// Everything needed to capture one media stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub protocol: Protocol,
    pub interface: String,
    pub output: PathBuf,
    pub port: u16,
}

impl CaptureRequest {
    /// Packets to or from `port` on the configured transport.
    pub fn filter(&self) -> String {
        format!(
            "{} and (src port {} or dst port {})",
            self.protocol, self.port, self.port
        )
    }

    /// The declared capture name: the output file name.
    pub fn name(&self) -> String {
        self.output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A running (or finished) capture owned by a call record.
pub trait CaptureProcess: Send {
    fn name(&self) -> &str;

    /// Request termination. Calling it again, or after the process exited on
    /// its own, does nothing.
    fn stop(&mut self);

    fn is_running(&mut self) -> bool;
}

/// Starts captures. Launch failures are returned, never panicked on.
pub trait CaptureLauncher: Send + Sync {
    fn launch(&self, request: CaptureRequest) -> Result<Box<dyn CaptureProcess>, CaptureError>;
}

/// How long a fresh capture must stay alive to count as started.
///
/// The launch runs inside event dispatch with the call store locked, so this
/// delays every following event (and the shutdown sweep) by the same amount
/// per answered leg. Keep it short.
pub const DEFAULT_START_GRACE: Duration = Duration::from_millis(10);

/// Launches one `tcpdump` per request.
#[derive(Debug, Clone)]
pub struct TcpdumpLauncher {
    program: PathBuf,
    debug: bool,
    grace: Duration,
}

impl TcpdumpLauncher {
    pub fn new<P: Into<PathBuf>>(program: P, debug: bool) -> Self {
        Self {
            program: program.into(),
            debug,
            grace: DEFAULT_START_GRACE,
        }
    }

    /// Overrides [`DEFAULT_START_GRACE`].
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl CaptureLauncher for TcpdumpLauncher {
    fn launch(&self, request: CaptureRequest) -> Result<Box<dyn CaptureProcess>, CaptureError> {
        let mut handle = CaptureHandle::new(self.program.clone(), request, self.debug)
            .with_grace(self.grace);
        handle.start()?;
        Ok(Box::new(handle))
    }
}
