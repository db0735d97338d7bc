//! lockprobe - feedback-directed fuzzer for the BLE smart lock command
//! protocol.
//!
//! Drives the campaign against the in-process lock simulator. Ctrl-C stops
//! the run gracefully: the link is closed and the queue is persisted so the
//! next run can resume with `--resume`.

#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lockprobe_core::campaign::Campaign;
use lockprobe_core::config::FuzzConfig;
use lockprobe_core::session::Session;
use lockprobe_explore::mutate::HavocMutator;
use lockprobe_explore::rng::{campaign_rng, MUTATION_STREAM};
use lockprobe_transport::sim::{SimulatedLock, SimulatedLockConfig};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lockprobe")]
#[command(about = "Mutation-based fuzzer for the smart lock command protocol")]
#[command(version)]
struct Cli {
    /// JSON config file; absent fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Queue file to resume from and persist back to
    #[arg(short, long)]
    resume: Option<PathBuf>,

    /// Outer scheduling rounds
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Fixed RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Root directory for session output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Advertised device name to connect to
    #[arg(long)]
    device: Option<String>,

    /// Opcode that crashes the simulated firmware (repeatable)
    #[arg(long = "crash-opcode", value_parser = parse_opcode)]
    crash_opcodes: Vec<u8>,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_opcode(raw: &str) -> Result<u8, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|e| format!("invalid opcode {raw:?}: {e}"))
}

impl Cli {
    fn effective_config(&self) -> Result<FuzzConfig> {
        let mut config = match &self.config {
            Some(path) => FuzzConfig::from_json_file(path)?,
            None => FuzzConfig::default(),
        };
        if let Some(path) = &self.resume {
            config.session.resume_path = Some(path.clone());
        }
        if let Some(iterations) = self.iterations {
            config.campaign.max_iterations = iterations;
        }
        if let Some(seed) = self.seed {
            config.campaign.rng_seed = Some(seed);
        }
        if let Some(output) = &self.output {
            config.session.output_root = output.clone();
        }
        if let Some(device) = &self.device {
            config.supervisor.device_name = device.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn simulator(&self, config: &FuzzConfig) -> SimulatedLock {
        let mut sim = SimulatedLockConfig {
            device_name: config.supervisor.device_name.clone(),
            passcode: config.supervisor.passcode,
            ..SimulatedLockConfig::default()
        };
        if !self.crash_opcodes.is_empty() {
            sim.crash_opcodes = self.crash_opcodes.iter().copied().collect();
        }
        SimulatedLock::new(sim)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lockprobe={level},lockprobe_core={level},lockprobe_explore={level},lockprobe_transport={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = cli.effective_config().context("invalid configuration")?;
    if cli.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let session = Session::start(
        &config.session,
        &config.campaign.seeds,
        config.campaign.initial_weight,
    )
    .context("failed to start session")?;
    info!(
        dir = %session.dir().display(),
        device = %config.supervisor.device_name,
        iterations = config.campaign.max_iterations,
        seed = ?config.campaign.rng_seed,
        "starting campaign"
    );

    let transport = cli.simulator(&config);
    let mutator = HavocMutator::new(campaign_rng(config.campaign.rng_seed, MUTATION_STREAM));
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c; run will stop at its iteration limit");
            std::future::pending::<()>().await;
        }
    };

    let summary = Campaign::new(&config, session, transport, mutator)
        .run(shutdown)
        .await
        .context("campaign failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opcode_forms() {
        assert_eq!(parse_opcode("0x13"), Ok(0x13));
        assert_eq!(parse_opcode("0XEE"), Ok(0xEE));
        assert_eq!(parse_opcode("170"), Ok(0xAA));
        assert!(parse_opcode("0x100").is_err());
        assert!(parse_opcode("lock").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "lockprobe",
            "-n",
            "3",
            "--seed",
            "9",
            "--device",
            "Bench Lock",
            "--crash-opcode",
            "0x42",
        ]);
        let config = cli.effective_config().unwrap();
        assert_eq!(config.campaign.max_iterations, 3);
        assert_eq!(config.campaign.rng_seed, Some(9));
        assert_eq!(config.supervisor.device_name, "Bench Lock");
        assert_eq!(cli.crash_opcodes, vec![0x42]);
    }

    #[test]
    fn test_empty_device_rejected() {
        let cli = Cli::parse_from(["lockprobe", "--device", " "]);
        assert!(cli.effective_config().is_err());
    }
}
