//! Command-line entry point for running microgrid simulation scenarios.

mod cli;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use microgrid_algo::sim::{self, ScenarioConfig};

fn init_tracing(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading scenario file `{}`", path.display()))?;
    let scenario: ScenarioConfig = serde_json::from_str(&raw)
        .with_context(|| format!("parsing scenario file `{}`", path.display()))?;
    Ok(scenario)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    match cli.command {
        Commands::Run {
            scenario,
            strategy,
            soc_threshold,
            critical_soc,
            recovery_soc,
            out,
        } => {
            info!(path = %scenario.display(), "loading scenario");
            let scenario_config = load_scenario(&scenario)?;

            let strategy =
                Commands::dispatch_strategy(strategy, soc_threshold, critical_soc, recovery_soc);
            info!(?strategy, "running simulation");
            let result = sim::run(&scenario_config, strategy)
                .with_context(|| "simulation run failed")?;

            let report = serde_json::to_string_pretty(&result)
                .context("serializing simulation result")?;

            match out {
                Some(path) => {
                    fs::write(&path, report)
                        .with_context(|| format!("writing result to `{}`", path.display()))?;
                    info!(path = %path.display(), "wrote simulation result");
                }
                None => println!("{report}"),
            }
        }
        Commands::Validate { scenario } => {
            let scenario_config = load_scenario(&scenario)?;
            for component in &scenario_config.components {
                component.validate()?;
            }
            println!("scenario `{}` is valid", scenario.display());
        }
    }

    Ok(())
}
