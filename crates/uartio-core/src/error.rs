//! Serial port errors

use std::io;
use thiserror::Error;

/// Errors that can occur while opening, configuring or querying a serial port
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    #[error("Invalid parity '{0}': expected n, e or o")]
    InvalidParity(String),

    #[error("Invalid stop bits {0}: expected 1 or 2")]
    InvalidStopBits(u8),

    #[error("Failed to read port attributes: {0}")]
    AttributeQueryFailed(#[source] io::Error),

    #[error("Failed to apply port attributes: {0}")]
    AttributeApplyFailed(#[source] io::Error),

    #[error("Device enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("Invalid port settings: {0}")]
    Config(String),

    #[error("Serial ports are not supported on this platform")]
    UnsupportedPlatform,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SerialError>;

impl SerialError {
    /// Classify an error from opening `path`
    pub(crate) fn from_open(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            SerialError::DeviceNotFound(path.to_string())
        } else {
            SerialError::OpenFailed {
                path: path.to_string(),
                source,
            }
        }
    }
}
