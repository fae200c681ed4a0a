//! Typed view of the firmware parameter table.

use tec_traits::{Instance, ParameterId, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    LoopStatus,
    ObjectTemperature,
    TargetObjectTemperature,
    OutputCurrent,
    OutputVoltage,
    SinkTemperature,
    RampTemperature,
    OutputEnable,
    TargetTemperature,
    RampRate,
}

impl Parameter {
    pub const fn id(self) -> ParameterId {
        match self {
            Self::LoopStatus => params::LOOP_STATUS,
            Self::ObjectTemperature => params::OBJECT_TEMPERATURE,
            Self::TargetObjectTemperature => params::TARGET_OBJECT_TEMPERATURE,
            Self::OutputCurrent => params::OUTPUT_CURRENT,
            Self::OutputVoltage => params::OUTPUT_VOLTAGE,
            Self::SinkTemperature => params::SINK_TEMPERATURE,
            Self::RampTemperature => params::RAMP_TEMPERATURE,
            Self::OutputEnable => params::OUTPUT_ENABLE,
            Self::TargetTemperature => params::TARGET_TEMPERATURE,
            Self::RampRate => params::RAMP_RATE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::LoopStatus => "loop status",
            Self::ObjectTemperature => "object temperature",
            Self::TargetObjectTemperature => "target object temperature",
            Self::OutputCurrent => "output current",
            Self::OutputVoltage => "output voltage",
            Self::SinkTemperature => "sink temperature",
            Self::RampTemperature => "ramp temperature",
            Self::OutputEnable => "output enable",
            Self::TargetTemperature => "target temperature",
            Self::RampRate => "ramp rate",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::ObjectTemperature
            | Self::TargetObjectTemperature
            | Self::SinkTemperature
            | Self::RampTemperature
            | Self::TargetTemperature => "degC",
            Self::OutputCurrent => "A",
            Self::OutputVoltage => "V",
            Self::RampRate => "degC/s",
            Self::LoopStatus | Self::OutputEnable => "",
        }
    }

    pub fn from_id(id: ParameterId) -> Option<Self> {
        ALL.iter().copied().find(|p| p.id() == id)
    }
}

const ALL: [Parameter; 10] = [
    Parameter::LoopStatus,
    Parameter::ObjectTemperature,
    Parameter::TargetObjectTemperature,
    Parameter::OutputCurrent,
    Parameter::OutputVoltage,
    Parameter::SinkTemperature,
    Parameter::RampTemperature,
    Parameter::OutputEnable,
    Parameter::TargetTemperature,
    Parameter::RampRate,
];

/// Parameters polled on every sampling tick, in record order.
pub const TELEMETRY: [Parameter; 7] = [
    Parameter::LoopStatus,
    Parameter::ObjectTemperature,
    Parameter::TargetObjectTemperature,
    Parameter::OutputCurrent,
    Parameter::OutputVoltage,
    Parameter::SinkTemperature,
    Parameter::RampTemperature,
];

/// Instance order for telemetry reads.
pub const DEFAULT_READ_ORDER: [Instance; 2] = [1, 2];
/// Instance order for writes. Deliberately the reverse of the read order;
/// kept as the controller has always been driven this way.
pub const DEFAULT_WRITE_ORDER: [Instance; 2] = [2, 1];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_ids_are_exact() {
        let expected: [(Parameter, u16); 10] = [
            (Parameter::LoopStatus, 1200),
            (Parameter::ObjectTemperature, 1000),
            (Parameter::TargetObjectTemperature, 1010),
            (Parameter::OutputCurrent, 1020),
            (Parameter::OutputVoltage, 1021),
            (Parameter::SinkTemperature, 1001),
            (Parameter::RampTemperature, 1011),
            (Parameter::OutputEnable, 2010),
            (Parameter::TargetTemperature, 3000),
            (Parameter::RampRate, 3003),
        ];
        for (p, id) in expected {
            assert_eq!(p.id(), id, "{}", p.name());
            assert_eq!(Parameter::from_id(id), Some(p));
        }
    }

    #[test]
    fn telemetry_order() {
        let ids: Vec<u16> = TELEMETRY.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![1200, 1000, 1010, 1020, 1021, 1001, 1011]);
    }
}
