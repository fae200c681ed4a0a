//! Characterisation routines built on the cycler's primitives.
//!
//! Both routines enable the output on entry and disable it on exit, with the
//! same best-effort disable as a protocol run when they fail.
use tec_traits::SessionFactory;
use tec_traits::clock::Clock;

use crate::error::{Result, TecError};
use crate::protocol::ThermalCycler;
use crate::sampler::MonitorStats;
use crate::series::TimeSeries;

/// Ramp rates swept by the square-wave routine when none are given.
pub const DEFAULT_SQUARE_RAMPS: [f64; 7] = [4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0];
/// Ramp used for every step-response target.
pub const STEP_RAMP_RATE: f64 = 20.0;
/// Monitor window after each step-response setpoint.
pub const STEP_DWELL_S: f64 = 20.0;

/// Dwell after each square-wave edge: long enough to complete a 40 degC
/// swing at `ramp_rate`, plus ten seconds.
#[inline]
pub fn square_wave_dwell_s(ramp_rate: f64) -> f64 {
    10.0 + 40.0 / ramp_rate
}

/// For each ramp rate: go to `high`, monitor, go to `low`, monitor.
pub fn square_wave<F: SessionFactory, C: Clock>(
    cycler: &mut ThermalCycler<F, C>,
    high: f64,
    low: f64,
    ramps: &[f64],
    series: &mut TimeSeries,
) -> Result<MonitorStats> {
    if let Some(bad) = ramps.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
        return Err(TecError::Config(format!("ramp rate must be > 0, got {bad}")));
    }
    tracing::info!(high, low, ramps = ramps.len(), "square wave start");
    cycler.with_output(|c| {
        let mut stats = MonitorStats::default();
        for &ramp in ramps {
            let dwell = square_wave_dwell_s(ramp);
            for temp in [high, low] {
                c.apply_setpoint(temp, ramp)?;
                stats.merge(&c.monitor(dwell, series)?);
            }
        }
        Ok(stats)
    })
}

/// For each target: jump from `base` at the step ramp, monitor, return to
/// `base` and monitor again.
pub fn step_response<F: SessionFactory, C: Clock>(
    cycler: &mut ThermalCycler<F, C>,
    base: f64,
    targets: &[f64],
    series: &mut TimeSeries,
) -> Result<MonitorStats> {
    tracing::info!(base, targets = targets.len(), "step response start");
    cycler.with_output(|c| {
        let mut stats = MonitorStats::default();
        for &target in targets {
            for temp in [target, base] {
                c.apply_setpoint(temp, STEP_RAMP_RATE)?;
                stats.merge(&c.monitor(STEP_DWELL_S, series)?);
            }
        }
        Ok(stats)
    })
}
