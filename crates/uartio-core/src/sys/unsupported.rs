//! Fallback for targets without a serial backend

use std::fs::File;

use crate::device::{self, DeviceInfo};
use crate::error::{Result, SerialError};
use crate::line::{Capabilities, LineConfig, ReadTimeouts, TimeoutModel};

pub(crate) const CAPABILITIES: Capabilities = Capabilities {
    hardware_flow_control: false,
    timeout_model: TimeoutModel::Termios,
};

pub(crate) fn open(_path: &str, _line: &LineConfig) -> Result<File> {
    Err(SerialError::UnsupportedPlatform)
}

pub(crate) fn release(_file: &File) {}

pub(crate) fn set_read_timeouts(_file: &File, _timeouts: ReadTimeouts) -> Result<()> {
    Err(SerialError::UnsupportedPlatform)
}

pub(crate) fn bytes_to_read(_file: &File) -> Result<u32> {
    Err(SerialError::UnsupportedPlatform)
}

pub(crate) fn device_info(path: &str) -> Result<Option<DeviceInfo>> {
    Ok(device::select_listed(device::list_ports(), path).map(DeviceInfo::from))
}
