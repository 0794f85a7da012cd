// Demos are allowed to use expect/unwrap for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Churn Demo
//!
//! Runs a lifecycle stress run against the in-memory cluster and prints the
//! JSON report.
//!
//! # Usage
//!
//! ```bash
//! # Scenario A: ten observing workers for thirty seconds
//! cargo run --example churn
//!
//! # Scenario B or C
//! cargo run --example churn -- --scenario shared
//! cargo run --example churn -- --scenario fault
//!
//! # A run file (TOML, see RunConfig)
//! cargo run --example churn -- --config run.toml
//!
//! # Half a second, four workers
//! RUST_LOG=churn_core=debug cargo run --example churn -- --quick
//! ```

use anyhow::{Context, bail};
use churn::prelude::*;
use tracing_subscriber::EnvFilter;

fn usage() {
    println!("Churn Demo");
    println!();
    println!("Usage: churn [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --scenario <distinct|shared|fault>  Run a named scenario (default: distinct)");
    println!("  --config <FILE>                     Run a TOML run file");
    println!("  --quick                             Four workers for half a second");
    println!("  --help                              Show this help");
}

fn parse_scenario(name: &str) -> anyhow::Result<Scenario> {
    match name {
        "distinct" => Ok(Scenario::DistinctObserving),
        "shared" => Ok(Scenario::SharedConfig),
        "fault" => Ok(Scenario::FaultInjected),
        other => bail!("unknown scenario: {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return Ok(());
    }

    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    };

    let scenario = parse_scenario(value_of("--scenario").unwrap_or("distinct"))?;
    let config = if let Some(path) = value_of("--config") {
        RunConfig::load(path).with_context(|| format!("loading {path}"))?
    } else if args.iter().any(|a| a == "--quick") {
        RunConfig::quick()
    } else {
        scenario.config()
    };

    tracing::info!(?scenario, workers = config.workers, duration = ?config.duration, "starting");
    let harness = ScenarioHarness::for_scenario(scenario);
    let report = harness.run(config).await?;

    println!("{}", report.to_json()?);
    report.verdict()?;
    Ok(())
}
