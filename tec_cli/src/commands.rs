//! Subcommand execution and summary output.

use serde_json::json;
use tec_config::Config;
use tec_core::routines::{square_wave, step_response};
use tec_core::{CancelToken, MonitorStats, TimeSeries};
use tec_traits::clock::Clock;

use crate::cli::{Cli, Commands};
use crate::setup::{self, Cycler};

/// What a command reports once it finishes.
struct Outcome {
    stats: MonitorStats,
    extra: serde_json::Value,
    text: String,
}

fn print_summary(cli: &Cli, series: &TimeSeries, outcome: &Outcome) {
    let s = &outcome.stats;
    if cli.json {
        let mut obj = json!({
            "status": "ok",
            "command": cli.cmd.name(),
            "records": series.len(),
            "ticks": s.ticks,
            "overruns": s.overruns,
            "dropped_notifications": s.dropped_notifications,
            "max_lateness_ms": s.max_lateness.as_secs_f64() * 1e3,
        });
        if let (Some(dst), Some(src)) = (obj.as_object_mut(), outcome.extra.as_object()) {
            dst.extend(src.clone());
        }
        println!("{obj}");
    } else {
        println!(
            "{} complete: {} records, {} overruns, {} dropped notifications{}",
            cli.cmd.name(),
            series.len(),
            s.overruns,
            s.dropped_notifications,
            outcome.text
        );
    }
}

fn execute(cli: &Cli, cfg: &Config, cycler: &mut Cycler, series: &mut TimeSeries) -> eyre::Result<Outcome> {
    let outcome = match &cli.cmd {
        Commands::Run => {
            let profile = setup::resolve_profile(cli, cfg)?;
            let summary = cycler.run(&profile, series)?;
            Outcome {
                stats: summary.monitor,
                extra: json!({
                    "cycles_completed": summary.cycles_completed,
                    "setpoints_applied": summary.setpoints_applied,
                    "hold_time_s": summary.hold_time_s,
                }),
                text: format!(
                    ", {} cycles, {} setpoints, hold {:.2} s",
                    summary.cycles_completed, summary.setpoints_applied, summary.hold_time_s
                ),
            }
        }
        Commands::Monitor { seconds } => {
            cycler.connect()?;
            let stats = cycler.monitor(*seconds, series)?;
            Outcome {
                stats,
                extra: json!({ "seconds": seconds }),
                text: String::new(),
            }
        }
        Commands::Setpoint {
            temp,
            ramp,
            seconds,
        } => {
            let (applied, stats) = cycler.with_output(|c| {
                let applied = c.apply_setpoint(*temp, *ramp)?;
                let stats = c.monitor(*seconds, series)?;
                Ok((applied, stats))
            })?;
            Outcome {
                stats,
                extra: json!({
                    "temp": applied.logical,
                    "ramp": applied.ramp_rate,
                    "bottom_physical": applied.bottom,
                    "top_physical": applied.top,
                }),
                text: format!(
                    ", physical bottom {:.3} / top {:.3} degC",
                    applied.bottom, applied.top
                ),
            }
        }
        Commands::SquareWave { high, low, ramps } => Outcome {
            stats: square_wave(cycler, *high, *low, ramps, series)?,
            extra: json!({ "high": high, "low": low, "ramps": ramps }),
            text: String::new(),
        },
        Commands::StepResponse { base, targets } => Outcome {
            stats: step_response(cycler, *base, targets, series)?,
            extra: json!({ "base": base, "targets": targets }),
            text: String::new(),
        },
        Commands::SelfCheck => {
            let address = cycler.connect()?;
            let tick = cycler.sampler().tick().as_secs_f64();
            let stats = cycler.monitor(tick, series)?;
            Outcome {
                stats,
                extra: json!({ "port": cycler.gateway().port(), "address": address }),
                text: format!(", device address {address} on {}", cycler.gateway().port()),
            }
        }
    };
    Ok(outcome)
}

/// Build the cycler for `cfg` and run the selected subcommand.
pub fn dispatch(cli: &Cli, cfg: &Config, cancel: CancelToken) -> eyre::Result<()> {
    let mut cycler = setup::build_cycler(cli, cfg, cancel)?;
    let mut series = TimeSeries::new(cycler.sampler().clock().now());
    tracing::info!(command = cli.cmd.name(), "command start");

    let result = execute(cli, cfg, &mut cycler, &mut series);

    // Flush every queued sample before the summary or error is printed
    drop(cycler.sampler_mut().take_observer());
    cycler.gateway_mut().disconnect();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                command = cli.cmd.name(),
                records = series.len(),
                state = ?cycler.state(),
                "command failed"
            );
            return Err(e);
        }
    };
    print_summary(cli, &series, &outcome);
    Ok(())
}
