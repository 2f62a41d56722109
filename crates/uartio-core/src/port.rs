//! Serial port handle
//!
//! [`SerialPort`] owns the OS descriptor or handle. It is released exactly
//! once, by [`SerialPort::close`] or on drop, and `close` consumes the value
//! so it cannot be used afterwards.

use std::fs::File;
use std::io::{self, Read, Write};

use crate::error::Result;
use crate::line::{LineConfig, ReadTimeouts};
use crate::settings::PortSettings;
use crate::sys;

/// An open, configured serial port
#[derive(Debug)]
pub struct SerialPort {
    file: File,
    path: String,
    settings: PortSettings,
    line: LineConfig,
}

impl SerialPort {
    /// Open `path` exclusively and configure it from `settings`.
    ///
    /// On Windows `path` is a port name such as `COM3`; the `\\.\` prefix is
    /// added when missing. If configuration fails the device is closed again
    /// before the error is returned.
    pub fn open(path: &str, settings: &PortSettings) -> Result<Self> {
        let line = LineConfig::plan(settings, sys::CAPABILITIES)?;
        let file = sys::open(path, &line).inspect_err(|e| {
            tracing::warn!(path, "failed to open serial port: {e}");
        })?;
        tracing::info!(path, settings = %settings, "opened serial port");

        Ok(Self {
            file,
            path: path.to_string(),
            settings: *settings,
            line,
        })
    }

    /// Release the port
    pub fn close(self) {
        drop(self);
    }

    /// Path the port was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Settings in effect
    pub fn settings(&self) -> &PortSettings {
        &self.settings
    }

    /// Line configuration applied to the device
    pub fn line_config(&self) -> &LineConfig {
        &self.line
    }

    /// Number of bytes waiting in the input queue
    pub fn bytes_to_read(&self) -> Result<u32> {
        sys::bytes_to_read(&self.file)
    }

    /// Whether any input is waiting
    pub fn poll(&self) -> Result<bool> {
        Ok(self.bytes_to_read()? > 0)
    }

    /// Switch between blocking and non-blocking reads. Only the timeouts
    /// are re-applied; the rest of the line setup is unchanged.
    pub fn set_blocking(&mut self, blocking: bool) -> Result<()> {
        let timeouts = ReadTimeouts::for_mode(sys::CAPABILITIES.timeout_model, blocking);
        sys::set_read_timeouts(&self.file, timeouts)?;
        self.settings.blocking = blocking;
        self.line.read_timeouts = timeouts;
        tracing::debug!(path = %self.path, blocking, "read timeouts updated");
        Ok(())
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        tracing::info!(path = %self.path, "closing serial port");
        sys::release(&self.file);
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Read for &SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.file).read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Write for &SerialPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&self.file).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&self.file).flush()
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for SerialPort {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.file.as_raw_fd()
    }
}

#[cfg(unix)]
impl std::os::fd::AsFd for SerialPort {
    fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
        self.file.as_fd()
    }
}

#[cfg(windows)]
impl std::os::windows::io::AsRawHandle for SerialPort {
    fn as_raw_handle(&self) -> std::os::windows::io::RawHandle {
        self.file.as_raw_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SerialError;

    #[test]
    fn test_unsupported_baud_fails_before_touching_device() {
        let err = SerialPort::open("/dev/does-not-matter", &PortSettings::new(12345)).unwrap_err();
        assert!(matches!(err, SerialError::UnsupportedBaudRate(12345)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_missing_device() {
        let err = SerialPort::open("/dev/ttyUSB-uartio-missing", &PortSettings::default())
            .unwrap_err();
        assert!(matches!(err, SerialError::DeviceNotFound(ref p) if p == "/dev/ttyUSB-uartio-missing"));
    }

    #[cfg(windows)]
    #[test]
    fn test_missing_device() {
        let err = SerialPort::open("COM250", &PortSettings::default()).unwrap_err();
        assert!(matches!(err, SerialError::DeviceNotFound(_)));
    }
}
