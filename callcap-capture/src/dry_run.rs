//! A launcher that records captures instead of spawning them.
//!
//! Used by scenario replay, and anywhere the call state machine has to run
//! without touching the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::launcher::{CaptureLauncher, CaptureProcess, CaptureRequest};
use crate::CaptureError;

/// Shared counters of a [`DryRunLauncher`].
#[derive(Debug, Default)]
pub struct DryRunStats {
    started: AtomicUsize,
    stopped: AtomicUsize,
    requests: Mutex<Vec<CaptureRequest>>,
}

impl DryRunStats {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::Acquire)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::Acquire)
    }

    /// Every successful launch, in order.
    pub fn requests(&self) -> Vec<CaptureRequest> {
        self.requests.lock().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DryRunLauncher {
    stats: Arc<DryRunStats>,
    fail: bool,
}

impl DryRunLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose every launch fails, as if the tool were missing.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> Arc<DryRunStats> {
        self.stats.clone()
    }
}

impl CaptureLauncher for DryRunLauncher {
    fn launch(&self, request: CaptureRequest) -> Result<Box<dyn CaptureProcess>, CaptureError> {
        if self.fail {
            return Err(CaptureError::Spawn {
                program: "dry-run".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "launch disabled"),
            });
        }

        info!(
            "[dry-run] capture {} on {} filter '{}'",
            request.output.display(),
            request.interface,
            request.filter()
        );
        self.stats.started.fetch_add(1, Ordering::AcqRel);
        let name = request.name();
        self.stats.requests.lock().push(request);
        Ok(Box::new(DryRunCapture {
            name,
            stats: self.stats.clone(),
            running: true,
        }))
    }
}

struct DryRunCapture {
    name: String,
    stats: Arc<DryRunStats>,
    running: bool,
}

impl CaptureProcess for DryRunCapture {
    fn name(&self) -> &str {
        &self.name
    }

    fn stop(&mut self) {
        if std::mem::take(&mut self.running) {
            self.stats.stopped.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn is_running(&mut self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::Protocol;
    use std::path::PathBuf;

    fn request(port: u16) -> CaptureRequest {
        CaptureRequest {
            protocol: Protocol::Udp,
            interface: "eth0".into(),
            output: PathBuf::from(format!("pcap/{port}.pcap")),
            port,
        }
    }

    #[test]
    fn counts_starts_and_single_stop() {
        let launcher = DryRunLauncher::new();
        let stats = launcher.stats();

        let mut capture = launcher.launch(request(30000)).unwrap();
        assert_eq!(capture.name(), "30000.pcap");
        assert!(capture.is_running());

        capture.stop();
        capture.stop();
        assert!(!capture.is_running());
        assert_eq!(stats.started(), 1);
        assert_eq!(stats.stopped(), 1);
        assert_eq!(stats.requests()[0].port, 30000);
    }

    #[test]
    fn failing_launcher_reports_error() {
        let launcher = DryRunLauncher::failing();
        assert!(launcher.launch(request(1)).is_err());
        assert_eq!(launcher.stats().started(), 0);
    }
}
