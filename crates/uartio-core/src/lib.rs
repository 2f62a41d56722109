//! # uartio Core Library
//!
//! Open, configure and poll serial (UART) ports.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A validated settings record (baud rate, parity, stop bits, blocking, flow control)
//! - A single mapping from settings to a line configuration, shaped by backend capabilities
//! - A Linux backend on termios and a Windows backend on the Win32 COMM API
//! - Port listing and USB device details (SetupAPI on Windows)
//!
//! ## Example
//!
//! ```rust,ignore
//! use uartio_core::{Parity, PortSettings, SerialPort};
//!
//! let settings = PortSettings {
//!     baud_rate: 9600,
//!     parity: Parity::Even,
//!     ..PortSettings::default()
//! };
//! let port = SerialPort::open("/dev/ttyUSB0", &settings)?;
//! if port.poll()? {
//!     println!("{} bytes waiting", port.bytes_to_read()?);
//! }
//! port.close();
//! ```

pub mod baud;
pub mod device;
mod error;
pub mod line;
mod port;
pub mod settings;
mod sys;

pub use device::{device_info, list_ports, DeviceInfo, PortInfo};
pub use error::{Result, SerialError};
pub use line::{Capabilities, LineConfig};
pub use port::SerialPort;
pub use settings::{Parity, PortSettings, StopBits};

/// Capabilities of the backend compiled for this target
pub const CAPABILITIES: Capabilities = sys::CAPABILITIES;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::device::{device_info, list_ports, DeviceInfo, PortInfo};
    pub use crate::error::{Result, SerialError};
    pub use crate::port::SerialPort;
    pub use crate::settings::{Parity, PortSettings, StopBits};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
