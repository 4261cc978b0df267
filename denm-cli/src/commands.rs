use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use opentelemetry::KeyValue;
use tracing::{error, info, warn};

use denm_config::DenmConfig;
use denm_engine::TelemetrySinks;
use denm_protocols::{Alert, AlertPayload, DenmParser};
use denm_simulator::{AlertFamily, Scenario, ScenarioError, SimulationReport, Simulator};
use denm_telemetry::{fixed3, run_stamp, EventLogger, MetricsRecorder};

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "denm", version, about)]
pub struct Cli {
    /// Configuration file; defaults to `config/denm.yaml` plus `DENM_*` variables.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when `RUST_LOG` is unset; overrides the configuration.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario in the deterministic harness
    Simulate(SimulateArgs),
    /// Decode a hex-encoded DENM frame
    Decode(DecodeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Built-in scenario: collision, drowsiness, lane_change or speed.
    #[arg(short, long, default_value = "collision", conflicts_with = "scenario")]
    pub family: String,

    /// YAML scenario file.
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    #[arg(long)]
    pub ticks: Option<u64>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Fail unless the run digest equals this value.
    #[arg(long)]
    pub expect_digest: Option<String>,

    /// Write CSV telemetry here instead of the configured data directory.
    #[arg(long)]
    pub csv_dir: Option<PathBuf>,

    /// Print the prometheus metrics after the run.
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Frame as hex, e.g. copied from a capture.
    pub frame: String,
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => DenmConfig::load_from_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => DenmConfig::load().context("loading configuration")?,
    };
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.telemetry.log_level.clone());
    EventLogger::init(&level)?;

    match cli.command {
        Commands::Simulate(args) => run_simulation_mode(args, config).await,
        Commands::Decode(args) => {
            println!("{}", decode(&args.frame)?);
            Ok(())
        }
    }
}

fn scenario_resolve(args: &SimulateArgs) -> Result<Scenario, ScenarioError> {
    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin(args.family.parse::<AlertFamily>()?)?,
    };
    if let Some(seed) = args.seed {
        scenario.seed = Some(seed);
    }
    if let Some(ticks) = args.ticks {
        scenario.ticks = Some(ticks);
    }
    Ok(scenario)
}

async fn run_simulation_mode(args: SimulateArgs, config: DenmConfig) -> anyhow::Result<()> {
    let scenario = scenario_resolve(&args)?;

    let metrics = if config.telemetry.metrics_enabled || args.metrics {
        Some(MetricsRecorder::new()?)
    } else {
        None
    };
    let csv_dir = args.csv_dir.clone().or_else(|| {
        config
            .telemetry
            .csv_enabled
            .then(|| config.telemetry.data_dir.join(run_stamp()))
    });
    if let Some(dir) = &csv_dir {
        info!(dir = %dir.display(), "Writing CSV telemetry");
    }
    let telemetry = TelemetrySinks {
        metrics: metrics.clone(),
        csv_dir,
    };

    let report = tokio::task::spawn_blocking(move || {
        let mut simulator = Simulator::new(&scenario, &config, telemetry)?;
        Ok::<SimulationReport, ScenarioError>(simulator.run())
    })
    .await
    .map_err(CliError::from)??;

    println!("{report}");
    if args.metrics {
        if let Some(metrics) = &metrics {
            println!("{}", metrics.gather_metrics()?);
        }
    }

    if let Some(expected) = &args.expect_digest {
        if report.digest != *expected {
            bug_report_write(&format!(
                "Simulation error: state digest mismatch!\nExpected: {expected}\nGot: {}\n\n{report}",
                report.digest
            ));
            return Err(CliError::DigestMismatch {
                expected: expected.clone(),
                actual: report.digest.clone(),
            }
            .into());
        }
        info!(digest = %report.digest, "Digest verified");
    }

    EventLogger::log_event(
        "simulation_complete",
        vec![
            KeyValue::new("scenario", report.scenario.clone()),
            KeyValue::new("seed", report.seed.to_string()),
            KeyValue::new("ticks", report.ticks.to_string()),
            KeyValue::new("digest", report.digest.clone()),
        ],
    );
    Ok(())
}

fn bug_report_write(contents: &str) {
    let filename = format!("bug_report_{}.txt", run_stamp());
    match fs::write(&filename, contents) {
        Ok(()) => warn!(path = %filename, "Bug report written"),
        Err(err) => error!(error = %err, "Failed to write bug report"),
    }
}

/// Human-readable rendering of a hex DENM frame.
pub fn decode(frame: &str) -> anyhow::Result<String> {
    let alert = DenmParser::new()
        .parse_hex(frame.trim())
        .context("frame is not a DENM")?;
    Ok(describe(&alert))
}

fn describe(alert: &Alert) -> String {
    let cause = alert.cause();
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "cause       {} ({})", cause.as_u8(), cause.family());
    let _ = writeln!(
        out,
        "severity    {} ({})",
        alert.severity.as_u8(),
        alert.severity.label()
    );
    let _ = writeln!(out, "station     {}", alert.station_id);
    let _ = writeln!(
        out,
        "time        detected {} referenced {}",
        fixed3(alert.detection_time),
        fixed3(alert.reference_time)
    );
    let _ = writeln!(
        out,
        "position    x {} y {}",
        fixed3(alert.event_position.x),
        fixed3(alert.event_position.y)
    );
    let _ = writeln!(
        out,
        "motion      {} m/s heading {}",
        fixed3(alert.event_speed),
        fixed3(alert.event_heading)
    );
    let detail = match &alert.payload {
        AlertPayload::Collision { time_to_collision } => {
            format!("ttc {} s", fixed3(*time_to_collision))
        }
        AlertPayload::Drowsiness {
            drowsiness_level,
            reaction_time,
        } => format!(
            "level {} reaction time {} s",
            fixed3(*drowsiness_level),
            fixed3(*reaction_time)
        ),
        AlertPayload::LaneChange {
            current_lane,
            target_lane,
            risk_score,
            lateral_speed,
            is_emergency_vehicle,
        } => format!(
            "lane {current_lane} -> {target_lane} risk {} lateral {} m/s emergency {is_emergency_vehicle}",
            fixed3(*risk_score),
            fixed3(*lateral_speed)
        ),
        AlertPayload::Speed {
            offending_vehicle,
            current_speed,
            speed_limit,
        } => format!(
            "offender {offending_vehicle} speed {} m/s limit {} m/s",
            fixed3(*current_speed),
            fixed3(*speed_limit)
        ),
    };
    let _ = write!(out, "payload     {detail}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use denm_protocols::{DenmEncoder, Severity};

    fn collision_hex() -> String {
        let alert = Alert::new(
            7.into(),
            1.5,
            Severity::Critical,
            Default::default(),
            20.0,
            90.0,
            AlertPayload::Collision {
                time_to_collision: 1.0,
            },
        );
        let frame = DenmEncoder::new().encode(&alert);
        frame.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn decode_prints_cause_and_payload() {
        let text = decode(&collision_hex()).unwrap();
        assert!(text.contains("cause       97 (collision)"));
        assert!(text.contains("station     7"));
        assert!(text.contains("ttc 1.000 s"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("zz").is_err());
        assert!(decode("00ff").is_err());
    }

    #[test]
    fn simulate_arguments_parse() {
        let cli = Cli::try_parse_from([
            "denm",
            "simulate",
            "--family",
            "speed",
            "--seed",
            "9",
            "--ticks",
            "20",
            "--expect-digest",
            "abc",
        ])
        .unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let scenario = scenario_resolve(&args).unwrap();
        assert_eq!(scenario.name, "speed");
        assert_eq!(scenario.seed, Some(9));
        assert_eq!(scenario.ticks, Some(20));
        assert_eq!(args.expect_digest.as_deref(), Some("abc"));
    }

    #[test]
    fn family_and_scenario_conflict() {
        let result = Cli::try_parse_from([
            "denm", "simulate", "--family", "speed", "--scenario", "x.yaml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_family_is_reported() {
        let cli = Cli::try_parse_from(["denm", "simulate", "--family", "fog"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert!(matches!(
            scenario_resolve(&args),
            Err(ScenarioError::UnknownFamily(_))
        ));
    }

    #[test]
    fn scenario_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.yaml");
        fs::write(
            &path,
            "name: file\nvehicles:\n  - id: a\n    station: 1\n    position: { x: 0.0, y: 0.0 }\n    speed: 1.0\n",
        )
        .unwrap();
        let cli = Cli::try_parse_from(["denm", "simulate", "--scenario", path.to_str().unwrap()])
            .unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(scenario_resolve(&args).unwrap().name, "file");
    }
}
