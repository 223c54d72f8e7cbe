//! ## callcap-cli
//! **Per-call packet capture for a softswitch**
//!
//! Watches the switch's event socket for calls on monitored numbers and
//! records each answered leg's media stream to its own pcap file.

use anyhow::Context;
use clap::Parser;
use callcap_telemetry::{EventLogger, MetricsRecorder};

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config().context("invalid configuration")?;

    EventLogger::init(&config.telemetry.log_level);
    let metrics = MetricsRecorder::new().context("failed to register metrics")?;

    commands::run_command(cli.command, config, metrics).await
}
