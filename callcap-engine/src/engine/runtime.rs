//! The event loop: pulls one event at a time until timeout, disconnect or a
//! shutdown request, then runs the shutdown sweep.

use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::Signal;
use parking_lot::Mutex;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use callcap_capture::CaptureLauncher;
use callcap_core::correlator::LegCorrelator;
use callcap_core::events::EventSource;
use callcap_core::lifecycle::{CaptureLifecycle, CaptureSettings};
use callcap_core::store::CallStore;
use callcap_telemetry::MetricsRecorder;

use super::dispatcher::Dispatcher;
use super::shutdown::{ShutdownCoordinator, StopReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub events: u64,
    /// Captures stopped by the shutdown sweep, whoever triggered it.
    pub stopped_at_shutdown: usize,
}

pub struct CaptureRuntime {
    store: Arc<Mutex<CallStore>>,
    dispatcher: Dispatcher,
    coordinator: Arc<ShutdownCoordinator>,
}

impl CaptureRuntime {
    pub fn new<I, S>(
        numbers: I,
        launcher: Arc<dyn CaptureLauncher>,
        settings: CaptureSettings,
        metrics: MetricsRecorder,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Arc::new(Mutex::new(CallStore::new()));
        let lifecycle = Arc::new(CaptureLifecycle::new(launcher, settings));
        let coordinator = Arc::new(ShutdownCoordinator::new(
            store.clone(),
            lifecycle.clone(),
            metrics.clone(),
        ));
        let dispatcher = Dispatcher::new(
            store.clone(),
            LegCorrelator::new(numbers),
            lifecycle,
            coordinator.clone(),
            metrics,
        );
        Self {
            store,
            dispatcher,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> Arc<ShutdownCoordinator> {
        self.coordinator.clone()
    }

    pub fn store(&self) -> Arc<Mutex<CallStore>> {
        self.store.clone()
    }

    /// Runs until the source ends, the timeout elapses or shutdown is
    /// requested elsewhere. Always leaves the runtime `Terminated` with every
    /// capture stopped and the source disconnected.
    #[instrument(level = "info", name = "capture_runtime", skip_all)]
    pub async fn run<S>(&self, source: &mut S, timeout: Option<Duration>) -> RunSummary
    where
        S: EventSource + ?Sized,
    {
        let mut events = 0u64;

        let reason = if self.coordinator.mark_running() {
            info!("Running, timeout {:?}", timeout);
            let deadline = timeout.map(|t| Instant::now() + t);
            let timer = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    biased;
                    _ = self.coordinator.requested() => break None,
                    _ = &mut timer => break Some(StopReason::Timeout),
                    next = source.next_event() => match next {
                        Ok(Some(event)) => {
                            events += 1;
                            self.dispatcher.dispatch(&event);
                        }
                        Ok(None) => break Some(StopReason::Disconnected),
                        Err(err) => {
                            warn!("Event source failed: {}", err);
                            break Some(StopReason::SourceFailed(err.to_string()));
                        }
                    },
                }
            }
        } else {
            None
        };

        source.disconnect().await;
        if let Some(reason) = reason {
            self.coordinator.shutdown(reason);
        }
        self.coordinator.finish();

        let reason = self
            .coordinator
            .reason()
            .unwrap_or(StopReason::Disconnected);
        info!("Run finished after {} event(s): {}", events, reason);
        RunSummary {
            reason,
            events,
            stopped_at_shutdown: self.coordinator.stopped_at_shutdown().unwrap_or_default(),
        }
    }
}

/// Routes SIGINT, SIGTERM and SIGABRT into the shutdown path. Signals after
/// the first only hit the re-entry guard.
pub fn spawn_signal_listener(
    coordinator: Arc<ShutdownCoordinator>,
) -> std::io::Result<JoinHandle<()>> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut abort = signal(SignalKind::from_raw(Signal::SIGABRT as i32))?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = interrupt.recv() => Signal::SIGINT.as_str(),
                Some(()) = terminate.recv() => Signal::SIGTERM.as_str(),
                Some(()) = abort.recv() => Signal::SIGABRT.as_str(),
                else => break,
            };
            info!("Received {}", name);
            // The sweep takes the store lock, which the dispatcher may hold.
            let coordinator = coordinator.clone();
            let _ = tokio::task::spawn_blocking(move || {
                coordinator.shutdown(StopReason::Signal(name))
            })
            .await;
        }
    }))
}
