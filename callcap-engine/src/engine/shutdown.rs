//! Runtime state machine and the shutdown sweep.
//!
//! Shutdown can be requested from the run loop (timeout, source gone) or from
//! the signal task. Whoever gets there first moves the state to
//! `ShuttingDown` and stops every capture; later requests only log.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info};

use callcap_core::lifecycle::CaptureLifecycle;
use callcap_core::store::CallStore;
use callcap_telemetry::MetricsRecorder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Initializing,
    Running,
    ShuttingDown,
    Terminated,
}

/// Why the run loop stopped pulling events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Timeout,
    Disconnected,
    SourceFailed(String),
    Signal(&'static str),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Timeout => f.write_str("timeout"),
            StopReason::Disconnected => f.write_str("event source disconnected"),
            StopReason::SourceFailed(err) => write!(f, "event source failed: {}", err),
            StopReason::Signal(name) => write!(f, "signal {}", name),
        }
    }
}

pub struct ShutdownCoordinator {
    state: Mutex<RuntimeState>,
    reason: Mutex<Option<StopReason>>,
    swept: Mutex<Option<usize>>,
    store: Arc<Mutex<CallStore>>,
    lifecycle: Arc<CaptureLifecycle>,
    metrics: MetricsRecorder,
    requested: Notify,
}

impl ShutdownCoordinator {
    pub fn new(
        store: Arc<Mutex<CallStore>>,
        lifecycle: Arc<CaptureLifecycle>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            state: Mutex::new(RuntimeState::Initializing),
            reason: Mutex::new(None),
            swept: Mutex::new(None),
            store,
            lifecycle,
            metrics,
            requested: Notify::new(),
        }
    }

    pub fn state(&self) -> RuntimeState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RuntimeState::Running
    }

    /// The reason recorded by the first shutdown request.
    pub fn reason(&self) -> Option<StopReason> {
        self.reason.lock().clone()
    }

    /// Captures stopped by the shutdown sweep, once it has run.
    pub fn stopped_at_shutdown(&self) -> Option<usize> {
        *self.swept.lock()
    }

    /// `Initializing -> Running`. Fails if shutdown was requested first.
    pub fn mark_running(&self) -> bool {
        let mut state = self.state.lock();
        if *state == RuntimeState::Initializing {
            *state = RuntimeState::Running;
            true
        } else {
            false
        }
    }

    /// Resolves once shutdown has been requested and its sweep has run.
    pub async fn requested(&self) {
        if self.swept.lock().is_some() {
            return;
        }
        self.requested.notified().await;
    }

    /// Enters `ShuttingDown` and stops every capture. Returns the number of
    /// captures stopped, or `None` when shutdown was already under way.
    pub fn shutdown(&self, reason: StopReason) -> Option<usize> {
        {
            let mut state = self.state.lock();
            if matches!(*state, RuntimeState::ShuttingDown | RuntimeState::Terminated) {
                debug!("Shutdown already in progress, ignoring {}", reason);
                return None;
            }
            *state = RuntimeState::ShuttingDown;
        }
        info!("Shutting down: {}", reason);
        *self.reason.lock() = Some(reason);

        let stopped = {
            let mut store = self.store.lock();
            self.lifecycle.stop_all(&mut store)
        };
        *self.swept.lock() = Some(stopped);
        self.metrics.record_stops(stopped);
        self.metrics.active_captures.set(0);
        info!("Stopped {} capture(s)", stopped);
        // Wake the run loop only once the sweep is complete.
        self.requested.notify_one();
        Some(stopped)
    }

    /// `ShuttingDown -> Terminated`, once the event source is closed.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        if *state == RuntimeState::ShuttingDown {
            *state = RuntimeState::Terminated;
            debug!("Runtime terminated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callcap_capture::{DryRunLauncher, Protocol};
    use callcap_core::lifecycle::CaptureSettings;
    use callcap_core::events::Direction;
    use callcap_core::record::CallRecord;

    fn coordinator(launcher: DryRunLauncher) -> (ShutdownCoordinator, Arc<Mutex<CallStore>>) {
        let store = Arc::new(Mutex::new(CallStore::new()));
        let lifecycle = Arc::new(CaptureLifecycle::new(
            Arc::new(launcher),
            CaptureSettings {
                protocol: Protocol::Udp,
                interface: "eth0".into(),
                directory: "/tmp".into(),
            },
        ));
        let metrics = MetricsRecorder::new().unwrap();
        (
            ShutdownCoordinator::new(store.clone(), lifecycle, metrics),
            store,
        )
    }

    fn record(leg: &str) -> CallRecord {
        CallRecord::new(leg, "S1", Direction::Inbound, "111", "222", "20240101120000")
    }

    #[test]
    fn state_machine_runs_forward_only() {
        let (coordinator, _) = coordinator(DryRunLauncher::new());
        assert_eq!(coordinator.state(), RuntimeState::Initializing);
        assert!(coordinator.mark_running());
        assert!(!coordinator.mark_running());
        assert!(coordinator.is_running());

        assert_eq!(coordinator.shutdown(StopReason::Timeout), Some(0));
        assert_eq!(coordinator.state(), RuntimeState::ShuttingDown);
        coordinator.finish();
        assert_eq!(coordinator.state(), RuntimeState::Terminated);
        assert_eq!(coordinator.reason(), Some(StopReason::Timeout));
        assert_eq!(coordinator.stopped_at_shutdown(), Some(0));
    }

    #[test]
    fn shutdown_before_running_blocks_start() {
        let (coordinator, _) = coordinator(DryRunLauncher::new());
        coordinator.shutdown(StopReason::Signal("SIGINT"));
        assert!(!coordinator.mark_running());
    }

    #[test]
    fn second_shutdown_is_a_noop() {
        let (coordinator, store) = coordinator(DryRunLauncher::new());
        coordinator.mark_running();
        store.lock().insert(record("L1")).unwrap();

        assert_eq!(coordinator.shutdown(StopReason::Signal("SIGTERM")), Some(0));
        assert!(store.lock().is_empty());
        assert_eq!(coordinator.shutdown(StopReason::Signal("SIGINT")), None);
        assert_eq!(coordinator.reason(), Some(StopReason::Signal("SIGTERM")));
    }

    #[tokio::test]
    async fn requested_resolves_after_shutdown() {
        let (coordinator, _) = coordinator(DryRunLauncher::new());
        coordinator.mark_running();
        coordinator.shutdown(StopReason::Disconnected);
        tokio::time::timeout(std::time::Duration::from_secs(1), coordinator.requested())
            .await
            .unwrap();
    }
}
