//! Linux backend: termios

use std::fs::{File, OpenOptions};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

use crate::device::{self, DeviceInfo};
use crate::error::{Result, SerialError};
use crate::line::{Capabilities, LineConfig, ReadTimeouts};
use crate::settings::Parity;

pub(crate) const CAPABILITIES: Capabilities = Capabilities::TERMIOS;

/// termios speed constant for a baud rate
pub(crate) fn termios_speed(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        50 => libc::B50,
        75 => libc::B75,
        110 => libc::B110,
        134 => libc::B134,
        150 => libc::B150,
        200 => libc::B200,
        300 => libc::B300,
        600 => libc::B600,
        1200 => libc::B1200,
        1800 => libc::B1800,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        460800 => libc::B460800,
        500000 => libc::B500000,
        576000 => libc::B576000,
        921600 => libc::B921600,
        1000000 => libc::B1000000,
        1152000 => libc::B1152000,
        1500000 => libc::B1500000,
        2000000 => libc::B2000000,
        2500000 => libc::B2500000,
        3000000 => libc::B3000000,
        3500000 => libc::B3500000,
        4000000 => libc::B4000000,
        _ => return None,
    };
    Some(speed)
}

fn apply_read_timeouts(tty: &mut libc::termios, timeouts: ReadTimeouts) -> Result<()> {
    match timeouts {
        ReadTimeouts::Termios { vmin, vtime } => {
            tty.c_cc[libc::VMIN] = vmin;
            tty.c_cc[libc::VTIME] = vtime;
            Ok(())
        }
        ReadTimeouts::Comm(_) => Err(SerialError::Config(
            "COMMTIMEOUTS cannot be applied to a termios line".to_string(),
        )),
    }
}

/// Fill `tty` for raw 8-bit I/O as described by `line`
pub(crate) fn configure_termios(tty: &mut libc::termios, line: &LineConfig) -> Result<()> {
    let speed =
        termios_speed(line.baud_rate).ok_or(SerialError::UnsupportedBaudRate(line.baud_rate))?;
    // SAFETY: both calls only write fields of the termios value we hold
    let rc = unsafe { libc::cfsetospeed(&mut *tty, speed) | libc::cfsetispeed(&mut *tty, speed) };
    if rc != 0 {
        return Err(SerialError::AttributeApplyFailed(io::Error::last_os_error()));
    }

    tty.c_cflag = (tty.c_cflag & !libc::CSIZE) | libc::CS8;
    // Break arrives as \0 instead of being ignored
    tty.c_iflag &= !libc::IGNBRK;
    tty.c_lflag = 0;
    tty.c_oflag = 0;

    // No XON/XOFF: 0x11 and 0x13 are ordinary data bytes
    tty.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);

    tty.c_cflag |= libc::CLOCAL | libc::CREAD;
    tty.c_cflag &= !(libc::PARENB | libc::PARODD);
    match line.parity {
        Parity::None => {}
        Parity::Odd => tty.c_cflag |= libc::PARENB | libc::PARODD,
        Parity::Even => tty.c_cflag |= libc::PARENB,
    }

    tty.c_cflag &= !libc::CSTOPB;
    if line.two_stop_bits() {
        tty.c_cflag |= libc::CSTOPB;
    }

    tty.c_cflag &= !libc::CRTSCTS;
    if line.hardware_flow_control {
        tty.c_cflag |= libc::CRTSCTS;
    }

    apply_read_timeouts(tty, line.read_timeouts)
}

fn get_attrs(fd: RawFd) -> Result<libc::termios> {
    // SAFETY: termios is plain data, and tcgetattr fills it
    let mut tty: libc::termios = unsafe { mem::zeroed() };
    // SAFETY: fd is open for the lifetime of the borrowed File, and tty is a
    // valid termios to write into
    if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
        return Err(SerialError::AttributeQueryFailed(io::Error::last_os_error()));
    }
    Ok(tty)
}

fn set_attrs(fd: RawFd, tty: &libc::termios) -> Result<()> {
    // SAFETY: fd is an open descriptor and tty points to an initialized termios
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, tty) } != 0 {
        return Err(SerialError::AttributeApplyFailed(io::Error::last_os_error()));
    }
    Ok(())
}

pub(crate) fn open(path: &str, line: &LineConfig) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_SYNC)
        .open(path)
        .map_err(|e| SerialError::from_open(path, e))?;
    let fd = file.as_raw_fd();

    // SAFETY: fd is owned by `file`; TIOCEXCL takes no argument
    if unsafe { libc::ioctl(fd, libc::TIOCEXCL) } < 0 {
        return Err(SerialError::OpenFailed {
            path: path.to_string(),
            source: io::Error::last_os_error(),
        });
    }

    let mut tty = get_attrs(fd)?;
    configure_termios(&mut tty, line)?;
    set_attrs(fd, &tty)?;
    tracing::debug!(path, cflag = tty.c_cflag, "termios applied");

    Ok(file)
}

/// Drop exclusive mode before the descriptor is closed
pub(crate) fn release(file: &File) {
    // SAFETY: the descriptor stays open while `file` is borrowed; TIOCNXCL
    // takes no argument
    if unsafe { libc::ioctl(file.as_raw_fd(), libc::TIOCNXCL) } < 0 {
        tracing::debug!("TIOCNXCL failed: {}", io::Error::last_os_error());
    }
}

pub(crate) fn set_read_timeouts(file: &File, timeouts: ReadTimeouts) -> Result<()> {
    let fd = file.as_raw_fd();
    let mut tty = get_attrs(fd)?;
    apply_read_timeouts(&mut tty, timeouts)?;
    set_attrs(fd, &tty)
}

pub(crate) fn bytes_to_read(file: &File) -> Result<u32> {
    let mut pending: libc::c_int = 0;
    // SAFETY: FIONREAD writes one c_int through the pointer, which outlives the call
    if unsafe { libc::ioctl(file.as_raw_fd(), libc::FIONREAD, &mut pending as *mut libc::c_int) } < 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(pending.max(0) as u32)
}

pub(crate) fn device_info(path: &str) -> Result<Option<DeviceInfo>> {
    Ok(device::select_listed(device::list_ports(), path).map(DeviceInfo::from))
}
