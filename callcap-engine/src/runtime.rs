//! # Runtime entry points
//!
//! The modes a frontend can run: live capture against the switch, offline
//! scenario replay, and a setup check. All of them share the same
//! [`CaptureRuntime`], so replay exercises exactly the live state machine.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use callcap_capture::{check_interface, DryRunLauncher, Protocol, TcpdumpLauncher};
use callcap_config::{CallcapConfig, CaptureConfig};
use callcap_core::events::EventKind;
use callcap_core::lifecycle::CaptureSettings;
use callcap_esl::EslConnection;
use callcap_telemetry::MetricsRecorder;

use crate::engine::{spawn_signal_listener, CaptureRuntime, EngineError, RunSummary, StopReason};
use crate::replay::{Scenario, ScenarioSource};

/// Result of replaying a scenario.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub scenario: Option<String>,
    pub summary: RunSummary,
    /// Capture file names, in launch order.
    pub captures: Vec<String>,
}

/// Creates the capture directory and verifies the interface exists.
#[instrument(level = "info", skip(config), fields(interface = %config.interface))]
pub fn check_setup(config: &CaptureConfig) -> Result<CaptureSettings, EngineError> {
    let settings = capture_settings(config)?;
    std::fs::create_dir_all(&settings.directory)?;
    check_interface(&settings.interface)?;
    info!(
        "Capturing {} on {} into {}",
        settings.protocol,
        settings.interface,
        settings.directory.display()
    );
    Ok(settings)
}

fn capture_settings(config: &CaptureConfig) -> Result<CaptureSettings, EngineError> {
    Ok(CaptureSettings {
        protocol: config.protocol.parse::<Protocol>()?,
        interface: config.interface.clone(),
        directory: config.directory.clone(),
    })
}

/// Connects to the switch and captures monitored calls until timeout,
/// disconnect or a termination signal.
#[instrument(level = "info", name = "run_live_mode", skip_all)]
pub async fn run_live_mode(
    config: &CallcapConfig,
    metrics: MetricsRecorder,
) -> Result<RunSummary, EngineError> {
    let settings = check_setup(&config.capture)?;
    let launcher = TcpdumpLauncher::new(config.capture.tcpdump.clone(), config.capture.debug);
    let runtime = CaptureRuntime::new(
        config.monitor.numbers.iter().cloned(),
        Arc::new(launcher),
        settings,
        metrics.clone(),
    );
    let coordinator = runtime.coordinator();
    let signals = spawn_signal_listener(coordinator.clone())?;

    let result = async {
        let connect = EslConnection::connect(&config.esl.host, config.esl.port, &config.esl.password);
        let mut connection = tokio::select! {
            connection = connect => connection?,
            _ = coordinator.requested() => {
                coordinator.finish();
                return Ok(RunSummary {
                    reason: coordinator.reason().unwrap_or(StopReason::Disconnected),
                    events: 0,
                    stopped_at_shutdown: 0,
                });
            }
        };
        connection.subscribe(&EventKind::SUBSCRIBED).await?;
        Ok::<_, EngineError>(runtime.run(&mut connection, config.runtime.timeout()).await)
    }
    .await;

    signals.abort();
    if let Ok(exposition) = metrics.gather_metrics() {
        debug!("Final metrics:\n{}", exposition);
    }
    result
}

/// Feeds a scenario file through the runtime with captures recorded rather
/// than launched. Needs neither the switch nor the interface.
#[instrument(level = "info", name = "run_replay_mode", skip(config, metrics))]
pub async fn run_replay_mode(
    config: &CallcapConfig,
    scenario_path: &Path,
    metrics: MetricsRecorder,
) -> Result<ReplayReport, EngineError> {
    let scenario = Scenario::load_from_file(scenario_path)?;
    let events = scenario.to_events()?;
    info!(
        "Replaying {} event(s) from {}",
        events.len(),
        scenario.name.as_deref().unwrap_or("unnamed scenario")
    );

    let launcher = DryRunLauncher::new();
    let stats = launcher.stats();
    let runtime = CaptureRuntime::new(
        config.monitor.numbers.iter().cloned(),
        Arc::new(launcher),
        capture_settings(&config.capture)?,
        metrics,
    );

    let mut source = ScenarioSource::new(events);
    let summary = runtime.run(&mut source, config.runtime.timeout()).await;

    Ok(ReplayReport {
        scenario: scenario.name,
        summary,
        captures: stats.requests().iter().map(|request| request.name()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config(numbers: &[&str]) -> CallcapConfig {
        let mut config = CallcapConfig::default();
        config.monitor.numbers = numbers.iter().map(|n| n.to_string()).collect();
        config.capture.directory = "/var/spool/pcap".into();
        config
    }

    fn scenario_file(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    const LINKED_CALL: &str = r#"
name: linked call
events:
  - Event-Name: CHANNEL_CREATE
    Unique-ID: L1
    Caller-Direction: inbound
    Caller-Caller-ID-Number: "111"
    Caller-Destination-Number: "222"
    variable_session_id: S1
    Event-Date-Local: "2024-01-01 12:00:00"
  - Event-Name: CHANNEL_CREATE
    Unique-ID: L2
    Caller-Direction: outbound
    Caller-Caller-ID-Number: "111"
    Caller-Callee-ID-Number: "222"
    Other-Leg-Unique-ID: L1
    Event-Date-Local: "2024-01-01 12:00:01"
  - Event-Name: CHANNEL_ANSWER
    Unique-ID: L2
    variable_local_media_ip: 10.0.0.5
    variable_local_media_port: 30000
  - Event-Name: CHANNEL_HANGUP
    Unique-ID: L2
"#;

    #[tokio::test]
    async fn linked_call_is_captured_under_the_inbound_session() {
        let file = scenario_file(LINKED_CALL);
        let metrics = MetricsRecorder::new().unwrap();

        let report = run_replay_mode(&config(&["111"]), file.path(), metrics.clone())
            .await
            .unwrap();

        assert_eq!(report.scenario.as_deref(), Some("linked call"));
        assert_eq!(report.summary.events, 4);
        assert_eq!(
            report.captures,
            vec!["S1_111_222_outbound_20240101120001.pcap".to_string()]
        );
        // L1 was never answered, so the sweep finds nothing left to stop.
        assert_eq!(report.summary.stopped_at_shutdown, 0);
        assert_eq!(metrics.legs_tracked.get(), 2);
        assert_eq!(metrics.captures_stopped.get(), 1);
    }

    #[tokio::test]
    async fn unmonitored_numbers_produce_no_captures() {
        let file = scenario_file(LINKED_CALL);
        let report = run_replay_mode(&config(&["999"]), file.path(), MetricsRecorder::new().unwrap())
            .await
            .unwrap();
        assert!(report.captures.is_empty());
    }

    #[tokio::test]
    async fn missing_scenario_is_an_error() {
        let err = run_replay_mode(
            &config(&["111"]),
            Path::new("/nonexistent/scenario.yaml"),
            MetricsRecorder::new().unwrap(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn unknown_interface_fails_setup() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture = CaptureConfig::default();
        capture.interface = "callcap-none0".into();
        capture.directory = dir.path().join("pcap");

        let err = check_setup(&capture).unwrap_err();
        assert!(matches!(err, EngineError::Capture(_)));
        assert!(capture.directory.is_dir());
    }
}
