//! Applies one logical temperature and ramp rate to both zones.

use tec_traits::{Instance, SessionFactory};

use crate::calibration::{CalibrationModel, Zone};
use crate::error::{Result, TecError};
use crate::gateway::DeviceGateway;
use crate::params::Parameter;

/// Zones are always written bottom first, then top.
pub const ZONE_WRITE_ORDER: [Zone; 2] = [Zone::Bottom, Zone::Top];

/// Instances that belong to each zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneChannels {
    pub bottom: Vec<Instance>,
    pub top: Vec<Instance>,
}

impl Default for ZoneChannels {
    fn default() -> Self {
        Self {
            bottom: vec![2],
            top: vec![1],
        }
    }
}

impl ZoneChannels {
    pub fn for_zone(&self, zone: Zone) -> &[Instance] {
        match zone {
            Zone::Bottom => &self.bottom,
            Zone::Top => &self.top,
        }
    }

    /// Zone owning `instance`, bottom taking precedence if listed twice.
    pub fn zone_of(&self, instance: Instance) -> Option<Zone> {
        ZONE_WRITE_ORDER
            .into_iter()
            .find(|z| self.for_zone(*z).contains(&instance))
    }
}

/// Physical values written by one `apply` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedSetpoint {
    pub logical: f64,
    pub ramp_rate: f64,
    pub bottom: f64,
    pub top: f64,
}

#[derive(Debug, Clone)]
pub struct SetpointController {
    calibration: CalibrationModel,
    channels: ZoneChannels,
}

impl SetpointController {
    pub fn new(calibration: CalibrationModel, channels: ZoneChannels) -> Self {
        Self {
            calibration,
            channels,
        }
    }

    pub fn calibration(&self) -> &CalibrationModel {
        &self.calibration
    }

    pub fn channels(&self) -> &ZoneChannels {
        &self.channels
    }

    /// Write ramp rate then calibrated setpoint, bottom zone then top zone.
    ///
    /// The ramp must precede the setpoint within a zone: the controller only
    /// applies a ramp to setpoint changes issued after it. Inputs are checked
    /// before the first write, so a rejected call leaves the device untouched.
    pub fn apply<F: SessionFactory>(
        &self,
        gateway: &mut DeviceGateway<F>,
        logical: f64,
        ramp_rate: f64,
    ) -> Result<AppliedSetpoint> {
        if !logical.is_finite() {
            return Err(TecError::Config(format!(
                "setpoint must be finite, got {logical}"
            )));
        }
        if !(ramp_rate.is_finite() && ramp_rate > 0.0) {
            return Err(TecError::Config(format!(
                "ramp rate must be > 0, got {ramp_rate}"
            )));
        }

        let mut applied = AppliedSetpoint {
            logical,
            ramp_rate,
            bottom: 0.0,
            top: 0.0,
        };
        for zone in ZONE_WRITE_ORDER {
            let physical = self.calibration.to_physical(zone, logical);
            let channels = self.channels.for_zone(zone);
            gateway.write(Parameter::RampRate, ramp_rate, channels)?;
            gateway.write(Parameter::TargetTemperature, physical, channels)?;
            match zone {
                Zone::Bottom => applied.bottom = physical,
                Zone::Top => applied.top = physical,
            }
        }
        tracing::info!(
            temp = logical,
            ramp = ramp_rate,
            bottom = applied.bottom,
            top = applied.top,
            "setpoint applied"
        );
        Ok(applied)
    }
}
