use thiserror::Error;

/// Failure taxonomy of the engine.
///
/// `Config` aborts before any device interaction. `Device`, `DeviceFault`,
/// `Timeout`, `LinkLost` and `NotConnected` are device communication errors:
/// they are never retried here and end the run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TecError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("device error: {0}")]
    Device(String),
    #[error("device fault: {0}")]
    DeviceFault(String),
    #[error("timeout waiting for device")]
    Timeout,
    #[error("device link lost: {0}")]
    LinkLost(String),
    #[error("device not connected")]
    NotConnected,
    #[error("run cancelled")]
    Cancelled,
}

impl TecError {
    /// True for every variant that originates from the device session.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Self::Device(_)
                | Self::DeviceFault(_)
                | Self::Timeout
                | Self::LinkLost(_)
                | Self::NotConnected
        )
    }
}

pub type Result<T> = std::result::Result<T, TecError>;
