use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use microgrid_algo::sim::DispatchStrategy;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario through the full simulation pipeline and print (or
    /// write) the resulting JSON report.
    Run {
        /// Path to a scenario JSON file.
        scenario: PathBuf,

        /// Which dispatch strategy to run.
        #[arg(long, value_enum, default_value = "load-following")]
        strategy: StrategyArg,

        /// SOC threshold below which cycle-charging runs the generator at
        /// full rated power (cycle-charging strategy only).
        #[arg(long, default_value_t = 0.80)]
        soc_threshold: f64,

        /// SOC below which the combined strategy switches into
        /// cycle-charging mode.
        #[arg(long, default_value_t = 0.30)]
        critical_soc: f64,

        /// SOC above which the combined strategy switches back to
        /// load-following mode.
        #[arg(long, default_value_t = 0.70)]
        recovery_soc: f64,

        /// Write the JSON report here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Validate a scenario file's component configuration without running
    /// a simulation.
    Validate {
        /// Path to a scenario JSON file.
        scenario: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StrategyArg {
    LoadFollowing,
    CycleCharging,
    Combined,
    LpOptimal,
}

impl Commands {
    /// Resolves the `Run` variant's flat CLI flags into a [`DispatchStrategy`].
    pub fn dispatch_strategy(
        strategy: StrategyArg,
        soc_threshold: f64,
        critical_soc: f64,
        recovery_soc: f64,
    ) -> DispatchStrategy {
        match strategy {
            StrategyArg::LoadFollowing => DispatchStrategy::LoadFollowing,
            StrategyArg::CycleCharging => DispatchStrategy::CycleCharging {
                soc_threshold_bp: (soc_threshold * 10_000.0).round() as u32,
            },
            StrategyArg::Combined => DispatchStrategy::Combined {
                critical_soc_bp: (critical_soc * 10_000.0).round() as u32,
                recovery_soc_bp: (recovery_soc * 10_000.0).round() as u32,
            },
            StrategyArg::LpOptimal => DispatchStrategy::LpOptimal,
        }
    }
}
