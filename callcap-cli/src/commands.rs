use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use callcap_config::{CallcapConfig, LayeredProvider};
use callcap_engine::{check_setup, run_live_mode, run_replay_mode};
use callcap_telemetry::MetricsRecorder;

#[derive(Parser, Debug)]
#[command(name = "callcap", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture monitored calls from the live switch
    Run,
    /// Feed a recorded scenario through the call state machine without capturing
    Replay(ReplayArgs),
    /// Validate configuration and the capture interface, then exit
    Check,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// YAML scenario file listing signaling events
    #[arg(long)]
    pub scenario: PathBuf,
}

/// Command line settings. Each one given overrides the file and environment.
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Configuration file (default: config/callcap.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Switch event socket host
    #[arg(short = 's', long = "host", global = true)]
    pub host: Option<String>,

    /// Switch event socket port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Switch event socket password
    #[arg(short = 'a', long, global = true)]
    pub password: Option<String>,

    /// Capture interface
    #[arg(short, long, global = true)]
    pub interface: Option<String>,

    /// Media transport protocol (udp or tcp)
    #[arg(long, global = true)]
    pub protocol: Option<String>,

    /// Capture output directory
    #[arg(short = 'd', long = "dir", global = true)]
    pub directory: Option<PathBuf>,

    /// Monitored number, repeatable; replaces the configured list
    #[arg(short = 'n', long = "num", global = true)]
    pub numbers: Vec<String>,

    /// Stop after this many seconds
    #[arg(short, long, global = true)]
    pub timeout: Option<u64>,

    /// Log every capture command line
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log level filter when RUST_LOG is unset
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Serialize, Default)]
struct Overrides {
    esl: EslOverrides,
    capture: CaptureOverrides,
    #[serde(skip_serializing_if = "Option::is_none")]
    monitor: Option<MonitorOverrides>,
    runtime: RuntimeOverrides,
    telemetry: TelemetryOverrides,
}

#[derive(Serialize, Default)]
struct EslOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

#[derive(Serialize, Default)]
struct CaptureOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<bool>,
}

#[derive(Serialize)]
struct MonitorOverrides {
    numbers: Vec<String>,
}

#[derive(Serialize, Default)]
struct RuntimeOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
}

#[derive(Serialize, Default)]
struct TelemetryOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
}

impl OverrideArgs {
    fn to_overrides(&self) -> Overrides {
        Overrides {
            esl: EslOverrides {
                host: self.host.clone(),
                port: self.port,
                password: self.password.clone(),
            },
            capture: CaptureOverrides {
                protocol: self.protocol.clone(),
                interface: self.interface.clone(),
                directory: self.directory.clone(),
                debug: self.debug.then_some(true),
            },
            monitor: (!self.numbers.is_empty()).then(|| MonitorOverrides {
                numbers: self.numbers.clone(),
            }),
            runtime: RuntimeOverrides {
                timeout_secs: self.timeout,
            },
            telemetry: TelemetryOverrides {
                log_level: self.log_level.clone(),
            },
        }
    }
}

impl Cli {
    /// Layers the command line over the configuration file and environment.
    pub fn load_config(&self) -> Result<CallcapConfig, callcap_config::ConfigError> {
        let provider = match &self.overrides.config {
            Some(path) => LayeredProvider::with_file(path),
            None => LayeredProvider::new(),
        };
        CallcapConfig::load_with(&provider, self.overrides.to_overrides())
    }
}

pub async fn run_command(
    command: Commands,
    config: CallcapConfig,
    metrics: MetricsRecorder,
) -> anyhow::Result<()> {
    match command {
        Commands::Run => {
            let summary = run_live_mode(&config, metrics)
                .await
                .context("capture run failed")?;
            info!(
                "Stopped ({}) after {} event(s)",
                summary.reason, summary.events
            );
        }
        Commands::Replay(args) => {
            let report = run_replay_mode(&config, &args.scenario, metrics)
                .await
                .with_context(|| format!("replay of {} failed", args.scenario.display()))?;
            for capture in &report.captures {
                println!("{}", capture);
            }
            info!(
                "Replayed {} event(s), {} capture(s)",
                report.summary.events,
                report.captures.len()
            );
        }
        Commands::Check => {
            check_setup(&config.capture).context("capture setup check failed")?;
            println!(
                "configuration ok: {} number(s) on {}",
                config.monitor.numbers.len(),
                config.capture.interface
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "callcap", "run", "-n", "111", "--num", "222", "-i", "eth1", "-t", "30",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Run));
        assert_eq!(cli.overrides.numbers, vec!["111", "222"]);
        assert_eq!(cli.overrides.interface.as_deref(), Some("eth1"));
        assert_eq!(cli.overrides.timeout, Some(30));
    }

    #[test]
    fn replay_requires_a_scenario() {
        assert!(Cli::try_parse_from(["callcap", "replay"]).is_err());
        let cli = Cli::try_parse_from(["callcap", "replay", "--scenario", "calls.yaml"]).unwrap();
        match cli.command {
            Commands::Replay(args) => assert_eq!(args.scenario, PathBuf::from("calls.yaml")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn command_line_wins_over_file() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/callcap.yaml",
                r#"
esl:
  host: switch.local
  password: secret
capture:
  interface: eth0
monitor:
  numbers: ["111"]
"#,
            )?;

            let cli = Cli::try_parse_from(["callcap", "-p", "8022", "-n", "333", "check"])
                .map_err(|e| e.to_string())?;
            let config = cli.load_config().map_err(|e| e.to_string())?;

            assert_eq!(config.esl.host, "switch.local");
            assert_eq!(config.esl.password, "secret");
            assert_eq!(config.esl.port, 8022);
            assert_eq!(config.capture.interface, "eth0");
            assert_eq!(config.monitor.numbers, vec!["333".to_string()]);
            assert!(!config.capture.debug);
            Ok(())
        });
    }

    #[test]
    fn missing_numbers_fail_to_load() {
        Jail::expect_with(|_| {
            let cli = Cli::try_parse_from(["callcap", "check"]).map_err(|e| e.to_string())?;
            assert!(cli.load_config().is_err());
            Ok(())
        });
    }
}
