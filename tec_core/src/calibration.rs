//! Per-zone linear calibration between logical and physical temperatures.
//!
//! physical = offset + gain * logical
//! logical  = (physical - offset) / gain

use crate::error::{Result, TecError};

/// One of the two independently controlled thermal zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    Bottom,
    Top,
}

impl Zone {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bottom => "bottom",
            Self::Top => "top",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated tuning for a zone. `gain` is finite and non-zero, so the
/// inverse is always defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneTuning {
    offset: f64,
    gain: f64,
}

impl ZoneTuning {
    pub fn new(offset: f64, gain: f64) -> Result<Self> {
        if !offset.is_finite() {
            return Err(TecError::Config(format!(
                "calibration offset must be finite, got {offset}"
            )));
        }
        if !gain.is_finite() || gain == 0.0 {
            return Err(TecError::Config(format!(
                "calibration gain must be finite and non-zero, got {gain}"
            )));
        }
        Ok(Self { offset, gain })
    }

    /// Pass-through tuning (offset 0, gain 1).
    pub const fn identity() -> Self {
        Self {
            offset: 0.0,
            gain: 1.0,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    #[inline]
    pub fn to_physical(&self, requested: f64) -> f64 {
        self.offset + self.gain * requested
    }

    #[inline]
    pub fn to_logical(&self, physical: f64) -> f64 {
        (physical - self.offset) / self.gain
    }
}

/// Tunings for both zones; immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationModel {
    bottom: ZoneTuning,
    top: ZoneTuning,
}

impl Default for CalibrationModel {
    fn default() -> Self {
        Self::new(ZoneTuning::identity(), ZoneTuning::identity())
    }
}

impl CalibrationModel {
    pub fn new(bottom: ZoneTuning, top: ZoneTuning) -> Self {
        Self { bottom, top }
    }

    pub fn tuning(&self, zone: Zone) -> &ZoneTuning {
        match zone {
            Zone::Bottom => &self.bottom,
            Zone::Top => &self.top,
        }
    }

    pub fn to_physical(&self, zone: Zone, requested: f64) -> f64 {
        self.tuning(zone).to_physical(requested)
    }

    pub fn to_logical(&self, zone: Zone, physical: f64) -> f64 {
        self.tuning(zone).to_logical(physical)
    }
}
