//! Line configuration planning
//!
//! [`LineConfig::plan`] is the one place where [`PortSettings`] become a
//! concrete line setup. Each backend describes what it can express through
//! [`Capabilities`]; the backend then copies the planned values into its
//! native structure (`termios` or `DCB` + `COMMTIMEOUTS`) without further
//! decisions.

use crate::baud;
use crate::error::Result;
use crate::settings::{Parity, PortSettings, StopBits};

/// Data bits per character; fixed for every port
pub const DATA_BITS: u8 = 8;

/// termios `VTIME` in deciseconds, used in both blocking and non-blocking mode
pub const TERMIOS_READ_TIMEOUT_DS: u8 = 5;

/// How a backend expresses read/write timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutModel {
    /// `VMIN`/`VTIME` control characters
    Termios,
    /// Win32 `COMMTIMEOUTS`
    CommTimeouts,
}

/// What a platform backend can express
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// RTS/CTS hardware flow control can be enabled
    pub hardware_flow_control: bool,
    /// Timeout representation
    pub timeout_model: TimeoutModel,
}

impl Capabilities {
    /// Linux termios backend
    pub const TERMIOS: Capabilities = Capabilities {
        hardware_flow_control: true,
        timeout_model: TimeoutModel::Termios,
    };

    /// Win32 COMM backend
    pub const WIN32: Capabilities = Capabilities {
        hardware_flow_control: true,
        timeout_model: TimeoutModel::CommTimeouts,
    };
}

/// Win32 `COMMTIMEOUTS` values, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommTimeouts {
    /// Longest gap allowed between two received bytes
    pub read_interval: u32,
    /// Per-byte part of the total read timeout
    pub read_total_multiplier: u32,
    /// Fixed part of the total read timeout
    pub read_total_constant: u32,
    /// Per-byte part of the total write timeout
    pub write_total_multiplier: u32,
    /// Fixed part of the total write timeout
    pub write_total_constant: u32,
}

impl CommTimeouts {
    /// All zero: reads wait until the buffer is filled
    pub const BLOCKING: CommTimeouts = CommTimeouts {
        read_interval: 0,
        read_total_multiplier: 0,
        read_total_constant: 0,
        write_total_multiplier: 0,
        write_total_constant: 0,
    };

    /// Bounded reads and writes
    pub const NON_BLOCKING: CommTimeouts = CommTimeouts {
        read_interval: 50,
        read_total_multiplier: 10,
        read_total_constant: 50,
        write_total_multiplier: 10,
        write_total_constant: 50,
    };
}

/// Read timeout behavior for the planned line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTimeouts {
    /// `c_cc[VMIN]` and `c_cc[VTIME]`
    Termios {
        /// Bytes a read waits for
        vmin: u8,
        /// Inter-byte timeout in deciseconds
        vtime: u8,
    },
    /// `COMMTIMEOUTS`
    Comm(CommTimeouts),
}

impl ReadTimeouts {
    /// Timeouts for `blocking` mode under `model`
    pub fn for_mode(model: TimeoutModel, blocking: bool) -> Self {
        match model {
            TimeoutModel::Termios => ReadTimeouts::Termios {
                vmin: u8::from(blocking),
                vtime: TERMIOS_READ_TIMEOUT_DS,
            },
            TimeoutModel::CommTimeouts => ReadTimeouts::Comm(if blocking {
                CommTimeouts::BLOCKING
            } else {
                CommTimeouts::NON_BLOCKING
            }),
        }
    }
}

/// Fully resolved line setup
///
/// XON/XOFF is not part of the plan: backends always switch it off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    /// Validated rate from the supported table
    pub baud_rate: u32,
    /// Always [`DATA_BITS`]
    pub data_bits: u8,
    /// Parity bit
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// RTS/CTS
    pub hardware_flow_control: bool,
    /// Read timeouts in the backend's own model
    pub read_timeouts: ReadTimeouts,
}

impl LineConfig {
    /// Resolve `settings` against a backend's capabilities
    pub fn plan(settings: &PortSettings, caps: Capabilities) -> Result<Self> {
        let baud_rate = baud::validate(settings.baud_rate)?;

        let line = Self {
            baud_rate,
            data_bits: DATA_BITS,
            parity: settings.parity,
            stop_bits: settings.stop_bits,
            hardware_flow_control: settings.flow_control && caps.hardware_flow_control,
            read_timeouts: ReadTimeouts::for_mode(caps.timeout_model, settings.blocking),
        };
        tracing::debug!(?line, "planned line configuration");
        Ok(line)
    }

    /// Two stop bits requested
    pub fn two_stop_bits(&self) -> bool {
        self.stop_bits == StopBits::Two
    }
}
