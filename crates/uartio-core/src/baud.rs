//! Standard baud rates
//!
//! The set of line rates a port can be opened at. Both backends validate
//! against this table before touching the device; the Linux backend also
//! maps each entry onto its termios speed constant.

use crate::error::{Result, SerialError};

/// Every baud rate accepted by [`crate::SerialPort::open`], in ascending order
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200, 230400, 460800, 500000, 576000, 921600, 1000000, 1152000, 1500000, 2000000, 2500000,
    3000000, 3500000, 4000000,
];

/// Default baud rate when none is configured
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Returns true if `baud_rate` is one of [`SUPPORTED_BAUD_RATES`]
pub fn is_supported(baud_rate: u32) -> bool {
    SUPPORTED_BAUD_RATES.binary_search(&baud_rate).is_ok()
}

/// Check a baud rate against the table
pub fn validate(baud_rate: u32) -> Result<u32> {
    if is_supported(baud_rate) {
        Ok(baud_rate)
    } else {
        Err(SerialError::UnsupportedBaudRate(baud_rate))
    }
}
