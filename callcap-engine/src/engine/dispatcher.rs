//! Routes signaling events to the correlator and the capture lifecycle.

use std::sync::Arc;

use opentelemetry::KeyValue;
use parking_lot::Mutex;
use tracing::{debug, trace};

use callcap_core::correlator::{Correlation, LegCorrelator};
use callcap_core::events::{EventKind, SignalEvent};
use callcap_core::lifecycle::{AnswerOutcome, CaptureLifecycle, HangupOutcome};
use callcap_core::store::CallStore;
use callcap_telemetry::{EventLogger, MetricsRecorder};

use super::shutdown::ShutdownCoordinator;

/// What became of one dispatched event.
#[derive(Debug)]
pub enum Dispatched {
    Created(Correlation),
    Answered(AnswerOutcome),
    HungUp(HangupOutcome),
    /// Not a kind the runtime acts on.
    Skipped(EventKind),
    /// Arrived after the runtime left `Running`.
    Dropped,
}

pub struct Dispatcher {
    store: Arc<Mutex<CallStore>>,
    correlator: LegCorrelator,
    lifecycle: Arc<CaptureLifecycle>,
    coordinator: Arc<ShutdownCoordinator>,
    metrics: MetricsRecorder,
}

impl Dispatcher {
    pub fn new(
        store: Arc<Mutex<CallStore>>,
        correlator: LegCorrelator,
        lifecycle: Arc<CaptureLifecycle>,
        coordinator: Arc<ShutdownCoordinator>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            store,
            correlator,
            lifecycle,
            coordinator,
            metrics,
        }
    }

    /// Applies one event. The store stays locked for the whole event, so the
    /// shutdown sweep never observes a half-applied one.
    pub fn dispatch(&self, event: &SignalEvent) -> Dispatched {
        let mut store = self.store.lock();
        if !self.coordinator.is_running() {
            trace!("Dropping {:?} event, runtime not running", event.kind());
            return Dispatched::Dropped;
        }
        self.metrics.events.inc();

        let dispatched = match event.kind() {
            EventKind::ChannelCreate => {
                let correlation = self.correlator.on_leg_created(&mut store, event);
                self.observe_created(&correlation);
                Dispatched::Created(correlation)
            }
            EventKind::ChannelAnswer => {
                let outcome = self.lifecycle.on_answer(&mut store, event);
                self.observe_answer(&outcome);
                Dispatched::Answered(outcome)
            }
            EventKind::ChannelHangup => {
                let outcome = self.lifecycle.on_hangup(&mut store, event);
                self.observe_hangup(&outcome);
                Dispatched::HungUp(outcome)
            }
            other => {
                trace!("Skipping event {:?}", other);
                Dispatched::Skipped(other)
            }
        };

        self.metrics
            .active_captures
            .set(store.active_captures() as i64);
        dispatched
    }

    fn observe_created(&self, correlation: &Correlation) {
        match correlation {
            Correlation::Tracked { leg_id, session_id } => {
                self.metrics.legs_tracked.inc();
                EventLogger::log_event(
                    "call_begin",
                    vec![
                        KeyValue::new("session_id", session_id.clone()),
                        KeyValue::new("leg_id", leg_id.clone()),
                    ],
                );
            }
            Correlation::Joined { .. } => self.metrics.legs_tracked.inc(),
            Correlation::Ignored(reason) => debug!("Leg not tracked: {:?}", reason),
        }
    }

    fn observe_answer(&self, outcome: &AnswerOutcome) {
        match outcome {
            AnswerOutcome::Started {
                leg_id,
                session_id,
                capture_name,
                port,
            } => {
                self.metrics.record_start();
                EventLogger::log_event(
                    "capture_begin",
                    vec![
                        KeyValue::new("session_id", session_id.clone()),
                        KeyValue::new("leg_id", leg_id.clone()),
                        KeyValue::new("capture", capture_name.clone()),
                        KeyValue::new("port", i64::from(*port)),
                    ],
                );
            }
            AnswerOutcome::Failed { .. } | AnswerOutcome::NoMediaPort { .. } => {
                self.metrics.capture_failures.inc()
            }
            AnswerOutcome::NotTracked => {}
        }
    }

    fn observe_hangup(&self, outcome: &HangupOutcome) {
        let HangupOutcome::Removed {
            leg_id,
            session_id,
            stopped_capture,
            call_ended,
        } = outcome
        else {
            return;
        };

        if let Some(capture) = stopped_capture {
            self.metrics.record_stops(1);
            EventLogger::log_event(
                "capture_end",
                vec![
                    KeyValue::new("session_id", session_id.clone()),
                    KeyValue::new("leg_id", leg_id.clone()),
                    KeyValue::new("capture", capture.clone()),
                ],
            );
        }
        if *call_ended {
            EventLogger::log_event(
                "call_end",
                vec![KeyValue::new("session_id", session_id.clone())],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StopReason;
    use callcap_capture::{
        CaptureError, CaptureLauncher, CaptureProcess, CaptureRequest, DryRunLauncher,
        DryRunStats, Protocol,
    };
    use callcap_core::correlator::IgnoreReason;
    use callcap_core::events::headers;
    use callcap_core::lifecycle::CaptureSettings;
    use std::sync::Barrier;
    use std::time::Duration;
    use tracing_test::traced_test;

    struct Fixture {
        dispatcher: Dispatcher,
        coordinator: Arc<ShutdownCoordinator>,
        store: Arc<Mutex<CallStore>>,
        stats: Arc<DryRunStats>,
        metrics: MetricsRecorder,
    }

    /// Blocks inside `launch` until the test is ready, then takes its time.
    struct SlowLauncher {
        inner: DryRunLauncher,
        entered: Arc<Barrier>,
        delay: Duration,
    }

    impl CaptureLauncher for SlowLauncher {
        fn launch(
            &self,
            request: CaptureRequest,
        ) -> Result<Box<dyn CaptureProcess>, CaptureError> {
            self.entered.wait();
            std::thread::sleep(self.delay);
            self.inner.launch(request)
        }
    }

    fn fixture(numbers: &[&str]) -> Fixture {
        let launcher = DryRunLauncher::new();
        let stats = launcher.stats();
        fixture_with(numbers, Arc::new(launcher), stats)
    }

    fn fixture_with(
        numbers: &[&str],
        launcher: Arc<dyn CaptureLauncher>,
        stats: Arc<DryRunStats>,
    ) -> Fixture {
        let store = Arc::new(Mutex::new(CallStore::new()));
        let lifecycle = Arc::new(CaptureLifecycle::new(
            launcher,
            CaptureSettings {
                protocol: Protocol::Udp,
                interface: "eth0".into(),
                directory: "/var/spool/pcap".into(),
            },
        ));
        let metrics = MetricsRecorder::new().unwrap();
        let coordinator = Arc::new(ShutdownCoordinator::new(
            store.clone(),
            lifecycle.clone(),
            metrics.clone(),
        ));
        coordinator.mark_running();
        let dispatcher = Dispatcher::new(
            store.clone(),
            LegCorrelator::new(numbers.iter().copied()),
            lifecycle,
            coordinator.clone(),
            metrics.clone(),
        );
        Fixture {
            dispatcher,
            coordinator,
            store,
            stats,
            metrics,
        }
    }

    fn inbound(leg: &str, caller: &str, called: &str) -> SignalEvent {
        SignalEvent::new()
            .with_header(headers::EVENT_NAME, "CHANNEL_CREATE")
            .with_header(headers::UNIQUE_ID, leg)
            .with_header(headers::CALLER_DIRECTION, "inbound")
            .with_header(headers::CALLER_NUMBER, caller)
            .with_header(headers::DESTINATION_NUMBER, called)
            .with_header(headers::SESSION_ID, "S1")
            .with_header(headers::EVENT_DATE_LOCAL, "2024-01-01 12:00:00")
    }

    fn answer(leg: &str, port: &str) -> SignalEvent {
        SignalEvent::new()
            .with_header(headers::EVENT_NAME, "CHANNEL_ANSWER")
            .with_header(headers::UNIQUE_ID, leg)
            .with_header(headers::LOCAL_MEDIA_PORT, port)
    }

    fn hangup(leg: &str) -> SignalEvent {
        SignalEvent::new()
            .with_header(headers::EVENT_NAME, "CHANNEL_HANGUP")
            .with_header(headers::UNIQUE_ID, leg)
    }

    #[traced_test]
    #[test]
    fn inbound_call_is_captured_and_released() {
        let f = fixture(&["111"]);
        f.dispatcher.dispatch(&inbound("L1", "111", "222"));
        f.dispatcher.dispatch(&answer("L1", "30000"));
        assert_eq!(f.stats.started(), 1);
        assert_eq!(f.metrics.active_captures.get(), 1);

        f.dispatcher.dispatch(&hangup("L1"));
        assert_eq!(f.stats.stopped(), 1);
        assert!(f.store.lock().is_empty());
        assert_eq!(f.metrics.captures_stopped.get(), 1);
        assert_eq!(f.metrics.active_captures.get(), 0);
        assert!(logs_contain("call_begin"));
        assert!(logs_contain("call_end"));
    }

    #[test]
    fn unmonitored_leg_never_captures() {
        let f = fixture(&["111"]);
        let created = f.dispatcher.dispatch(&inbound("L9", "555", "666"));
        assert!(matches!(
            created,
            Dispatched::Created(Correlation::Ignored(IgnoreReason::NotMonitored))
        ));
        f.dispatcher.dispatch(&answer("L9", "30000"));
        f.dispatcher.dispatch(&hangup("L9"));
        assert_eq!(f.stats.started(), 0);
        assert_eq!(f.metrics.legs_tracked.get(), 0);
        assert_eq!(f.metrics.events.get(), 3);
    }

    #[test]
    fn other_event_kinds_are_skipped() {
        let f = fixture(&["111"]);
        let event = SignalEvent::new().with_header(headers::EVENT_NAME, "HEARTBEAT");
        assert!(matches!(
            f.dispatcher.dispatch(&event),
            Dispatched::Skipped(EventKind::Other(_))
        ));
    }

    #[test]
    fn events_after_shutdown_are_dropped() {
        let f = fixture(&["111"]);
        f.coordinator.shutdown(StopReason::Signal("SIGTERM"));
        assert!(matches!(
            f.dispatcher.dispatch(&inbound("L1", "111", "222")),
            Dispatched::Dropped
        ));
        assert!(f.store.lock().is_empty());
        assert_eq!(f.metrics.events.get(), 0);
    }

    #[test]
    fn bad_media_port_counts_as_failure() {
        let f = fixture(&["111"]);
        f.dispatcher.dispatch(&inbound("L1", "111", "222"));
        let answered = f.dispatcher.dispatch(&answer("L1", "not-a-port"));
        assert!(matches!(
            answered,
            Dispatched::Answered(AnswerOutcome::NoMediaPort { .. })
        ));
        assert_eq!(f.metrics.capture_failures.get(), 1);
        assert_eq!(f.stats.started(), 0);
    }

    #[test]
    fn shutdown_during_capture_start_waits_and_stops_it() {
        let entered = Arc::new(Barrier::new(2));
        let inner = DryRunLauncher::new();
        let stats = inner.stats();
        let launcher = SlowLauncher {
            inner,
            entered: entered.clone(),
            delay: Duration::from_millis(100),
        };
        let f = fixture_with(&["111"], Arc::new(launcher), stats);
        f.dispatcher.dispatch(&inbound("L1", "111", "222"));

        let swept = std::thread::scope(|scope| {
            let answering = scope.spawn(|| {
                f.dispatcher.dispatch(&answer("L1", "30000"));
            });
            // The answer now holds the store and sits inside the launch.
            entered.wait();
            let swept = f.coordinator.shutdown(StopReason::Signal("SIGTERM"));
            answering.join().unwrap();
            swept
        });

        assert_eq!(swept, Some(1));
        assert_eq!(f.stats.started(), 1);
        assert_eq!(f.stats.stopped(), 1);
        assert!(f.store.lock().is_empty());
        assert_eq!(f.metrics.active_captures.get(), 0);
    }

    #[test]
    fn answer_after_sweep_starts_nothing() {
        let f = fixture(&["111"]);
        f.dispatcher.dispatch(&inbound("L1", "111", "222"));
        assert_eq!(f.coordinator.shutdown(StopReason::Timeout), Some(0));
        assert!(matches!(
            f.dispatcher.dispatch(&answer("L1", "30000")),
            Dispatched::Dropped
        ));
        assert_eq!(f.stats.started(), 0);
    }
}
