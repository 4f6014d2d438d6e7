use std::io;
use std::num::ParseFloatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("device is not connected")]
    NotConnected,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("invalid request, got {ack:?}")]
    Rejected { ack: String },
    #[error("invalid hexadecimal digit {digit:?} at position {position}")]
    InvalidHexDigit { digit: char, position: usize },
    #[error("invalid number {input:?}: {source}")]
    InvalidNumber {
        input: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("invalid status length: {0}")]
    StatusLength(usize),
    #[error("measurement reply has an odd number of fields: {0}")]
    OddTokenCount(usize),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("{command} was not confirmed: expected {expected:?}, got {received:?}")]
    Confirmation {
        command: String,
        expected: String,
        received: String,
    },
    #[error("{name} must be between {min} and {max}, got {value:.1}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("invalid response: {}", hex_dump(.raw))]
    Stream { raw: Vec<u8> },
    #[error("configuration error: {0}")]
    Config(String),
}

impl DriverError {
    /// True for failures raised by the link itself rather than by the device or the decoder.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DriverError::NotConnected
                | DriverError::Io(_)
                | DriverError::Serial(_)
                | DriverError::Timeout(_)
        )
    }
}

fn hex_dump(raw: &[u8]) -> String {
    raw.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub type Result<T> = std::result::Result<T, DriverError>;
