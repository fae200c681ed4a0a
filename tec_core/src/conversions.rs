//! `From`/`TryFrom` implementations bridging `tec_config` types to `tec_core` types.

use crate::calibration::{CalibrationModel, ZoneTuning};
use crate::error::TecError;
use crate::profile::{CycleOrder, ProtocolProfile, ThermalPhaseSpec};
use crate::setpoint::ZoneChannels;

// ── Calibration ──────────────────────────────────────────────────────────────

impl TryFrom<&tec_config::ZoneTuning> for ZoneTuning {
    type Error = TecError;

    fn try_from(c: &tec_config::ZoneTuning) -> Result<Self, Self::Error> {
        ZoneTuning::new(c.offset, c.gain)
    }
}

impl TryFrom<&tec_config::CalibrationPair> for CalibrationModel {
    type Error = TecError;

    fn try_from(c: &tec_config::CalibrationPair) -> Result<Self, Self::Error> {
        Ok(CalibrationModel::new(
            ZoneTuning::try_from(&c.bottom)?,
            ZoneTuning::try_from(&c.top)?,
        ))
    }
}

// ── Zones ────────────────────────────────────────────────────────────────────

impl From<&tec_config::ZonesCfg> for ZoneChannels {
    fn from(c: &tec_config::ZonesCfg) -> Self {
        Self {
            bottom: c.bottom_channels.clone(),
            top: c.top_channels.clone(),
        }
    }
}

// ── Profile ──────────────────────────────────────────────────────────────────

impl From<&tec_config::PhaseCfg> for ThermalPhaseSpec {
    fn from(c: &tec_config::PhaseCfg) -> Self {
        Self {
            temperature: c.temperature,
            ramp_rate: c.ramp_rate,
            hold_s: c.hold_s,
        }
    }
}

impl From<tec_config::CycleOrder> for CycleOrder {
    fn from(c: tec_config::CycleOrder) -> Self {
        match c {
            tec_config::CycleOrder::AnnealFirst => Self::AnnealFirst,
            tec_config::CycleOrder::DenatureFirst => Self::DenatureFirst,
        }
    }
}

impl From<&tec_config::ProfileCfg> for ProtocolProfile {
    fn from(c: &tec_config::ProfileCfg) -> Self {
        Self {
            activation: (&c.activation).into(),
            denature: (&c.denature).into(),
            anneal: (&c.anneal).into(),
            equilibration: (&c.equilibration).into(),
            cycles: c.cycles,
            order: c.order.into(),
            cooldown_s: c.cooldown_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Zone;

    #[test]
    fn calibration_pair_maps_zones() {
        let pair = tec_config::CalibrationPair {
            top: tec_config::ZoneTuning {
                offset: 1.5425,
                gain: 0.7747,
            },
            bottom: tec_config::ZoneTuning {
                offset: 0.5224,
                gain: 0.8228,
            },
        };
        let model = CalibrationModel::try_from(&pair).unwrap();
        assert_eq!(model.tuning(Zone::Bottom).offset(), 0.5224);
        assert_eq!(model.tuning(Zone::Top).gain(), 0.7747);
    }

    #[test]
    fn zero_gain_fails_conversion() {
        let bad = tec_config::ZoneTuning {
            offset: 0.0,
            gain: 0.0,
        };
        assert!(matches!(
            ZoneTuning::try_from(&bad),
            Err(TecError::Config(_))
        ));
    }
}
