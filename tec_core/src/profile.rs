//! Thermal profile consumed by the protocol state machine.

use crate::error::{Result, TecError};

/// Settling margin added to every computed hold time, seconds.
pub const SETTLE_MARGIN_S: f64 = 4.0;
/// Slowest ramp, used for the settle step after each transition.
pub const SETTLE_RAMP_RATE: f64 = 1.0;

/// One instruction: go to `temperature` at `ramp_rate`, then hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalPhaseSpec {
    pub temperature: f64,
    pub ramp_rate: f64,
    pub hold_s: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CycleOrder {
    #[default]
    AnnealFirst,
    DenatureFirst,
}

/// Named protocol step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Activation,
    Denature,
    Anneal,
    Equilibration,
}

impl PhaseKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::Denature => "denature",
            Self::Anneal => "anneal",
            Self::Equilibration => "equilibration",
        }
    }
}

/// Time to move between two temperatures at `ramp_rate`, plus the settling margin.
#[inline]
pub fn hold_time_s(denature_temp: f64, anneal_temp: f64, denature_ramp_rate: f64) -> f64 {
    (denature_temp - anneal_temp) / denature_ramp_rate + SETTLE_MARGIN_S
}

/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolProfile {
    pub activation: ThermalPhaseSpec,
    pub denature: ThermalPhaseSpec,
    pub anneal: ThermalPhaseSpec,
    pub equilibration: ThermalPhaseSpec,
    pub cycles: u32,
    pub order: CycleOrder,
    /// Telemetry window after the output stage is disabled.
    pub cooldown_s: f64,
}

impl ProtocolProfile {
    pub fn hold_time_s(&self) -> f64 {
        hold_time_s(
            self.denature.temperature,
            self.anneal.temperature,
            self.denature.ramp_rate,
        )
    }

    /// The two phases of one cycle, in execution order.
    pub fn cycle_phases(&self) -> [(PhaseKind, ThermalPhaseSpec); 2] {
        let denature = (PhaseKind::Denature, self.denature);
        let anneal = (PhaseKind::Anneal, self.anneal);
        match self.order {
            CycleOrder::AnnealFirst => [anneal, denature],
            CycleOrder::DenatureFirst => [denature, anneal],
        }
    }

    pub fn validate(&self) -> Result<()> {
        let phases = [
            (PhaseKind::Activation, &self.activation),
            (PhaseKind::Denature, &self.denature),
            (PhaseKind::Anneal, &self.anneal),
            (PhaseKind::Equilibration, &self.equilibration),
        ];
        for (kind, p) in phases {
            if !p.temperature.is_finite() {
                return Err(TecError::Config(format!(
                    "{} temperature must be finite",
                    kind.name()
                )));
            }
            if !(p.ramp_rate.is_finite() && p.ramp_rate > 0.0) {
                return Err(TecError::Config(format!(
                    "{} ramp rate must be > 0",
                    kind.name()
                )));
            }
            if !(p.hold_s.is_finite() && p.hold_s >= 0.0) {
                return Err(TecError::Config(format!(
                    "{} hold time must be >= 0",
                    kind.name()
                )));
            }
        }
        if !(self.cooldown_s.is_finite() && self.cooldown_s >= 0.0) {
            return Err(TecError::Config("cooldown must be >= 0".into()));
        }
        Ok(())
    }
}
