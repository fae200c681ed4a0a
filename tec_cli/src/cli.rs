//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

use tec_core::routines::DEFAULT_SQUARE_RAMPS;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tecctl", version, about = "Dual-zone TEC thermal cycler")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/tec_config.toml")]
    pub config: PathBuf,

    /// Optional calibration CSV (strict header: unit,zone,offset,gain)
    #[arg(long, value_name = "FILE", requires = "unit")]
    pub calibration: Option<PathBuf>,

    /// Unit name selected from the calibration CSV
    #[arg(long, value_name = "NAME")]
    pub unit: Option<String>,

    /// Profile TOML overriding the inline [profile] table
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    /// Append every sample as one JSON object per line
    #[arg(long, value_name = "FILE")]
    pub samples: Option<PathBuf>,

    /// Print samples, summaries and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full PCR protocol from the configured profile
    Run,
    /// Record telemetry without touching setpoints or output stage
    Monitor {
        /// Window length in seconds
        #[arg(long)]
        seconds: f64,
    },
    /// Enable, apply one setpoint, monitor, then disable
    Setpoint {
        /// Logical target temperature (degC)
        #[arg(long)]
        temp: f64,
        /// Ramp rate (degC/s)
        #[arg(long, default_value_t = 4.0)]
        ramp: f64,
        /// Monitor window after the setpoint is applied
        #[arg(long, default_value_t = 0.0)]
        seconds: f64,
    },
    /// Alternate between two temperatures for each ramp rate
    SquareWave {
        #[arg(long, default_value_t = 90.0)]
        high: f64,
        #[arg(long, default_value_t = 50.0)]
        low: f64,
        /// Ramp rates to sweep (degC/s)
        #[arg(long, num_args = 1.., value_delimiter = ',', default_values_t = DEFAULT_SQUARE_RAMPS)]
        ramps: Vec<f64>,
    },
    /// Step from a base temperature to each target and back
    StepResponse {
        #[arg(long, default_value_t = 50.0)]
        base: f64,
        #[arg(long, num_args = 1.., value_delimiter = ',', default_values_t = [60.0])]
        targets: Vec<f64>,
    },
    /// Connect, identify and read one telemetry poll
    SelfCheck,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Monitor { .. } => "monitor",
            Self::Setpoint { .. } => "setpoint",
            Self::SquareWave { .. } => "square-wave",
            Self::StepResponse { .. } => "step-response",
            Self::SelfCheck => "self-check",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ramps_accept_comma_list() {
        let cli = Cli::try_parse_from(["tecctl", "square-wave", "--ramps", "4,8"]).unwrap();
        match cli.cmd {
            Commands::SquareWave { ramps, high, low } => {
                assert_eq!(ramps, vec![4.0, 8.0]);
                assert_eq!((high, low), (90.0, 50.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn calibration_requires_unit() {
        let err = Cli::try_parse_from(["tecctl", "--calibration", "c.csv", "run"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
