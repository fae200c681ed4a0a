pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type crossing the hardware trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Device address reported by `DeviceSession::identify`.
pub type Address = u8;

/// Physical instance (channel) of a parameter on the controller.
pub type Instance = u8;

/// Numeric parameter id as defined by the controller firmware.
pub type ParameterId = u16;

/// An open communication session with one TEC controller.
///
/// Implementations are not required to be thread-safe; callers issue one
/// request at a time.
pub trait DeviceSession {
    fn identify(&mut self) -> Result<Address, BoxError>;

    fn get_parameter(
        &mut self,
        id: ParameterId,
        address: Address,
        instance: Instance,
    ) -> Result<f64, BoxError>;

    fn set_parameter(
        &mut self,
        id: ParameterId,
        value: f64,
        address: Address,
        instance: Instance,
    ) -> Result<(), BoxError>;
}

impl<T: DeviceSession + ?Sized> DeviceSession for Box<T> {
    fn identify(&mut self) -> Result<Address, BoxError> {
        (**self).identify()
    }

    fn get_parameter(
        &mut self,
        id: ParameterId,
        address: Address,
        instance: Instance,
    ) -> Result<f64, BoxError> {
        (**self).get_parameter(id, address, instance)
    }

    fn set_parameter(
        &mut self,
        id: ParameterId,
        value: f64,
        address: Address,
        instance: Instance,
    ) -> Result<(), BoxError> {
        (**self).set_parameter(id, value, address, instance)
    }
}

/// Opens sessions on a named port (e.g. "COM7", "/dev/ttyUSB0", "sim").
pub trait SessionFactory {
    type Session: DeviceSession;

    fn open(&mut self, port: &str) -> Result<Self::Session, BoxError>;
}

/// Parameter ids understood by the controller firmware.
pub mod params {
    use super::ParameterId;

    pub const OBJECT_TEMPERATURE: ParameterId = 1000;
    pub const SINK_TEMPERATURE: ParameterId = 1001;
    pub const TARGET_OBJECT_TEMPERATURE: ParameterId = 1010;
    pub const RAMP_TEMPERATURE: ParameterId = 1011;
    pub const OUTPUT_CURRENT: ParameterId = 1020;
    pub const OUTPUT_VOLTAGE: ParameterId = 1021;
    pub const LOOP_STATUS: ParameterId = 1200;
    /// 1 = output stage enabled, 0 = disabled.
    pub const OUTPUT_ENABLE: ParameterId = 2010;
    pub const TARGET_TEMPERATURE: ParameterId = 3000;
    /// Coarse temperature ramp, degC per second.
    pub const RAMP_RATE: ParameterId = 3003;
}
