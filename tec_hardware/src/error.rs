use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("device timeout")]
    Timeout,
    #[error("device disconnected")]
    Disconnected,
    #[error("no such port: {0}")]
    NoSuchPort(String),
    #[error("device rejected request (code {0})")]
    Nack(u8),
    #[error("unknown parameter id {0}")]
    UnknownParameter(u16),
    #[error("parameter {0} is read-only")]
    ReadOnly(u16),
    #[error("invalid parameter instance {0}")]
    InvalidInstance(u8),
    #[error("address mismatch: device is {expected}, request used {got}")]
    AddressMismatch { expected: u8, got: u8 },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
