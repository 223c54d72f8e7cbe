//! ## callcap-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry attributes**
//!
//! Call lifecycle notifications (call begin, call end, capture begin/end)
//! are emitted as `call_event` spans carrying their attributes, so they can
//! be filtered apart from the plain diagnostic log.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` takes precedence over
    /// `default_level`. Installing twice is a no-op.
    pub fn init(default_level: &str) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .try_init();
    }

    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!("call_event", event_type = event_type, otel.kind = "INTERNAL");
        let _guard = span.enter();
        tracing::info!(metadata = ?metadata, "Call event {}", event_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_logging() {
        EventLogger::log_event("call_begin", vec![KeyValue::new("session_id", "S1")]);
        assert!(logs_contain("Call event call_begin"));
        assert!(logs_contain("session_id"));
    }
}
