//! Protocol state machine: Activation, repeated cycles, Equilibration.
//!
//! `Idle -> Activation -> (Anneal, Denature) x cycles -> Equilibration -> Disabled`
//!
//! Every cycle phase is a transition step (profile ramp, monitored for the
//! computed hold time) followed by a settle step (same temperature at the
//! slowest ramp, monitored for the phase's own hold). Activation and
//! Equilibration are single steps. Any error ends the run: no retries, no
//! skipped phases. Before returning the error the output stage gets one
//! best-effort disable.
use tec_traits::clock::Clock;
use tec_traits::{Address, Instance, SessionFactory};

use crate::error::{Result, TecError};
use crate::gateway::DeviceGateway;
use crate::params::{DEFAULT_WRITE_ORDER, Parameter};
use crate::profile::{PhaseKind, ProtocolProfile, SETTLE_RAMP_RATE, ThermalPhaseSpec};
use crate::sampler::{MonitorStats, SamplingLoop};
use crate::series::TimeSeries;
use crate::setpoint::{AppliedSetpoint, SetpointController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Idle,
    Activation,
    Denature { cycle: u32 },
    Anneal { cycle: u32 },
    Equilibration,
    Disabled,
}

impl ProtocolState {
    fn for_cycle(kind: PhaseKind, cycle: u32) -> Self {
        match kind {
            PhaseKind::Activation => Self::Activation,
            PhaseKind::Denature => Self::Denature { cycle },
            PhaseKind::Anneal => Self::Anneal { cycle },
            PhaseKind::Equilibration => Self::Equilibration,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub hold_time_s: f64,
    pub cycles_completed: u32,
    pub setpoints_applied: u32,
    pub monitor: MonitorStats,
}

pub struct ThermalCycler<F: SessionFactory, C: Clock> {
    gateway: DeviceGateway<F>,
    setpoint: SetpointController,
    sampler: SamplingLoop<C>,
    write_order: Vec<Instance>,
    state: ProtocolState,
    enabled: bool,
    history: Vec<ProtocolState>,
}

impl<F: SessionFactory, C: Clock> ThermalCycler<F, C> {
    pub fn new(
        gateway: DeviceGateway<F>,
        setpoint: SetpointController,
        sampler: SamplingLoop<C>,
    ) -> Self {
        Self {
            gateway,
            setpoint,
            sampler,
            write_order: DEFAULT_WRITE_ORDER.to_vec(),
            state: ProtocolState::Idle,
            enabled: false,
            history: vec![ProtocolState::Idle],
        }
    }

    /// Instance order for enable/disable writes.
    pub fn with_write_order(mut self, write_order: Vec<Instance>) -> Self {
        self.write_order = write_order;
        self
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// States entered so far, starting with `Idle`.
    pub fn history(&self) -> &[ProtocolState] {
        &self.history
    }

    /// Whether the output stage may be on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn gateway(&self) -> &DeviceGateway<F> {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut DeviceGateway<F> {
        &mut self.gateway
    }

    pub fn setpoint_controller(&self) -> &SetpointController {
        &self.setpoint
    }

    pub fn sampler(&self) -> &SamplingLoop<C> {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut SamplingLoop<C> {
        &mut self.sampler
    }

    pub fn connect(&mut self) -> Result<Address> {
        self.gateway.connect()
    }

    pub fn enable(&mut self) -> Result<()> {
        // Flag first: a partial write may already have switched a channel on
        self.enabled = true;
        self.gateway
            .write(Parameter::OutputEnable, 1.0, &self.write_order)?;
        tracing::info!("output enabled");
        Ok(())
    }

    pub fn disable(&mut self) -> Result<()> {
        self.gateway
            .write(Parameter::OutputEnable, 0.0, &self.write_order)?;
        self.enabled = false;
        tracing::info!("output disabled");
        Ok(())
    }

    pub fn apply_setpoint(&mut self, temperature: f64, ramp_rate: f64) -> Result<AppliedSetpoint> {
        self.setpoint.apply(&mut self.gateway, temperature, ramp_rate)
    }

    pub fn monitor(&mut self, duration_s: f64, series: &mut TimeSeries) -> Result<MonitorStats> {
        self.sampler.monitor(&mut self.gateway, duration_s, series)
    }

    /// Ramped setpoint followed by one monitor window of `spec.hold_s`.
    pub fn step(&mut self, spec: ThermalPhaseSpec, series: &mut TimeSeries) -> Result<MonitorStats> {
        self.apply_setpoint(spec.temperature, spec.ramp_rate)?;
        self.monitor(spec.hold_s, series)
    }

    /// Connect, enable the output, run `f`, then disable. If `f` fails the
    /// output gets a best-effort disable and the original error is returned.
    pub fn with_output<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = self
            .connect()
            .and_then(|_| self.enable())
            .and_then(|()| f(self))
            .and_then(|v| self.disable().map(|()| v));
        if let Err(e) = &result {
            self.safe_stop(e);
        }
        result
    }

    /// Execute the whole protocol. Records stay in `series` even on error.
    pub fn run(&mut self, profile: &ProtocolProfile, series: &mut TimeSeries) -> Result<RunSummary> {
        profile.validate()?;
        self.state = ProtocolState::Idle;
        self.history = vec![ProtocolState::Idle];

        let mut summary = RunSummary {
            hold_time_s: profile.hold_time_s(),
            ..RunSummary::default()
        };
        let result = self
            .connect()
            .and_then(|_| self.run_phases(profile, series, &mut summary));
        match result {
            Ok(()) => {
                tracing::info!(
                    cycles = summary.cycles_completed,
                    samples = summary.monitor.ticks,
                    overruns = summary.monitor.overruns,
                    "protocol complete"
                );
                Ok(summary)
            }
            Err(e) => {
                self.safe_stop(&e);
                Err(e)
            }
        }
    }

    fn run_phases(
        &mut self,
        profile: &ProtocolProfile,
        series: &mut TimeSeries,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let hold = summary.hold_time_s;
        tracing::info!(cycles = profile.cycles, hold_s = hold, "protocol start");

        self.enter(ProtocolState::Activation)?;
        self.enable()?;
        self.single_shot(profile.activation, series, summary)?;

        for cycle in 0..profile.cycles {
            for (kind, spec) in profile.cycle_phases() {
                self.enter(ProtocolState::for_cycle(kind, cycle))?;
                // Transition at the profile ramp, then settle at the slowest ramp
                self.apply_counted(spec.temperature, spec.ramp_rate, summary)?;
                self.monitor_counted(hold, series, summary)?;
                self.apply_counted(spec.temperature, SETTLE_RAMP_RATE, summary)?;
                self.monitor_counted(spec.hold_s, series, summary)?;
            }
            summary.cycles_completed += 1;
            tracing::info!(cycle, of = profile.cycles, "cycle complete");
        }

        self.enter(ProtocolState::Equilibration)?;
        self.single_shot(profile.equilibration, series, summary)?;

        self.enter(ProtocolState::Disabled)?;
        self.disable()?;
        self.monitor_counted(profile.cooldown_s, series, summary)?;
        Ok(())
    }

    fn enter(&mut self, next: ProtocolState) -> Result<()> {
        self.sampler.cancel_token().check()?;
        tracing::info!(from = ?self.state, to = ?next, "phase transition");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    fn single_shot(
        &mut self,
        spec: ThermalPhaseSpec,
        series: &mut TimeSeries,
        summary: &mut RunSummary,
    ) -> Result<()> {
        self.apply_counted(spec.temperature, spec.ramp_rate, summary)?;
        self.monitor_counted(spec.hold_s, series, summary)
    }

    fn apply_counted(&mut self, temp: f64, ramp: f64, summary: &mut RunSummary) -> Result<()> {
        self.apply_setpoint(temp, ramp)?;
        summary.setpoints_applied += 1;
        Ok(())
    }

    fn monitor_counted(
        &mut self,
        duration_s: f64,
        series: &mut TimeSeries,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let stats = self.monitor(duration_s, series)?;
        summary.monitor.merge(&stats);
        Ok(())
    }

    fn safe_stop(&mut self, cause: &TecError) {
        tracing::error!(state = ?self.state, error = %cause, "run aborted");
        if !self.enabled {
            return;
        }
        match self
            .gateway
            .write(Parameter::OutputEnable, 0.0, &self.write_order)
        {
            Ok(()) => {
                self.enabled = false;
                tracing::warn!("output disabled after abort");
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not disable output after abort");
            }
        }
    }
}
