//! ## callcap-telemetry::metrics
//! **Prometheus counters for the call state machine**

use prometheus::{IntCounter, IntGauge, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub events: IntCounter,
    pub legs_tracked: IntCounter,
    pub captures_started: IntCounter,
    pub capture_failures: IntCounter,
    pub captures_stopped: IntCounter,
    pub active_captures: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events = IntCounter::new("callcap_events_total", "Signaling events dispatched")?;
        let legs_tracked =
            IntCounter::new("callcap_legs_tracked_total", "Call legs tracked for capture")?;
        let captures_started =
            IntCounter::new("callcap_captures_started_total", "Capture processes started")?;
        let capture_failures = IntCounter::new(
            "callcap_capture_failures_total",
            "Answered legs that could not be captured",
        )?;
        let captures_stopped =
            IntCounter::new("callcap_captures_stopped_total", "Capture processes stopped")?;
        let active_captures =
            IntGauge::new("callcap_active_captures", "Capture processes currently running")?;

        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(legs_tracked.clone()))?;
        registry.register(Box::new(captures_started.clone()))?;
        registry.register(Box::new(capture_failures.clone()))?;
        registry.register(Box::new(captures_stopped.clone()))?;
        registry.register(Box::new(active_captures.clone()))?;

        Ok(Self {
            registry,
            events,
            legs_tracked,
            captures_started,
            capture_failures,
            captures_stopped,
            active_captures,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn record_start(&self) {
        self.captures_started.inc();
        self.active_captures.inc();
    }

    pub fn record_stops(&self, count: usize) {
        self.captures_stopped.inc_by(count as u64);
        self.active_captures.sub(count as i64);
    }
}
