//! Windows backend: Win32 COMM API and SetupAPI

use std::fs::{File, OpenOptions};
use std::io;
use std::mem;
use std::os::windows::fs::OpenOptionsExt;
use std::os::windows::io::AsRawHandle;
use std::ptr;

use windows_sys::Win32::Devices::Communication::{
    ClearCommError, GetCommState, SetCommState, SetCommTimeouts, COMMTIMEOUTS, COMSTAT, DCB,
    EVENPARITY, NOPARITY, ODDPARITY, ONESTOPBIT, TWOSTOPBITS,
};
use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo, SetupDiGetClassDevsW,
    SetupDiGetDeviceInstanceIdW, SetupDiGetDeviceRegistryPropertyW, DIGCF_PRESENT,
    GUID_DEVCLASS_USB, HDEVINFO, SPDRP_DEVICEDESC, SPDRP_DRIVER, SPDRP_FRIENDLYNAME, SPDRP_MFG,
    SP_DEVINFO_DATA,
};
use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};

use crate::device::{friendly_name_matches, parse_vid_pid, DeviceInfo};
use crate::error::{Result, SerialError};
use crate::line::{Capabilities, CommTimeouts, LineConfig, ReadTimeouts};
use crate::settings::Parity;

pub(crate) const CAPABILITIES: Capabilities = Capabilities::WIN32;

// DCB bitfield layout
const F_BINARY: u32 = 1 << 0;
const F_PARITY: u32 = 1 << 1;
const F_OUTX_CTS_FLOW: u32 = 1 << 2;
const F_OUTX: u32 = 1 << 8;
const F_INX: u32 = 1 << 9;
const RTS_CONTROL_SHIFT: u32 = 12;
const RTS_CONTROL_MASK: u32 = 0b11 << RTS_CONTROL_SHIFT;
const RTS_CONTROL_DISABLE: u32 = 0;
const RTS_CONTROL_HANDSHAKE: u32 = 2;

const MAX_PATH: usize = 260;

/// Win32 device namespace path for a port name such as `COM3`
pub(crate) fn device_path(name: &str) -> String {
    if name.starts_with(r"\\.\") || name.starts_with(r"\\?\") {
        name.to_string()
    } else {
        format!(r"\\.\{}", name)
    }
}

fn set_flag(bits: &mut u32, flag: u32, on: bool) {
    if on {
        *bits |= flag;
    } else {
        *bits &= !flag;
    }
}

/// Copy `line` into a DCB obtained from `GetCommState`
pub(crate) fn fill_dcb(dcb: &mut DCB, line: &LineConfig) {
    dcb.BaudRate = line.baud_rate;
    dcb.ByteSize = line.data_bits;
    dcb.Parity = match line.parity {
        Parity::None => NOPARITY,
        Parity::Even => EVENPARITY,
        Parity::Odd => ODDPARITY,
    };
    dcb.StopBits = if line.two_stop_bits() {
        TWOSTOPBITS
    } else {
        ONESTOPBIT
    };

    let mut bits = dcb._bitfield | F_BINARY;
    set_flag(&mut bits, F_PARITY, line.parity != Parity::None);
    // No XON/XOFF in either direction
    bits &= !(F_OUTX | F_INX);
    set_flag(&mut bits, F_OUTX_CTS_FLOW, line.hardware_flow_control);
    let rts = if line.hardware_flow_control {
        RTS_CONTROL_HANDSHAKE
    } else {
        RTS_CONTROL_DISABLE
    };
    dcb._bitfield = (bits & !RTS_CONTROL_MASK) | (rts << RTS_CONTROL_SHIFT);
}

pub(crate) fn comm_timeouts(timeouts: &CommTimeouts) -> COMMTIMEOUTS {
    COMMTIMEOUTS {
        ReadIntervalTimeout: timeouts.read_interval,
        ReadTotalTimeoutMultiplier: timeouts.read_total_multiplier,
        ReadTotalTimeoutConstant: timeouts.read_total_constant,
        WriteTotalTimeoutMultiplier: timeouts.write_total_multiplier,
        WriteTotalTimeoutConstant: timeouts.write_total_constant,
    }
}

fn raw(file: &File) -> HANDLE {
    file.as_raw_handle() as HANDLE
}

pub(crate) fn open(path: &str, line: &LineConfig) -> Result<File> {
    let full_path = device_path(path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .share_mode(0)
        .open(&full_path)
        .map_err(|e| SerialError::from_open(path, e))?;
    let handle = raw(&file);

    // SAFETY: DCB is plain data; GetCommState fills it once DCBlength is set
    let mut dcb: DCB = unsafe { mem::zeroed() };
    dcb.DCBlength = mem::size_of::<DCB>() as u32;
    // SAFETY: handle belongs to `file`, which outlives the call
    if unsafe { GetCommState(handle, &mut dcb) } == 0 {
        return Err(SerialError::AttributeQueryFailed(io::Error::last_os_error()));
    }

    fill_dcb(&mut dcb, line);
    // SAFETY: handle is open and dcb is fully initialized
    if unsafe { SetCommState(handle, &dcb) } == 0 {
        return Err(SerialError::AttributeApplyFailed(io::Error::last_os_error()));
    }
    set_read_timeouts(&file, line.read_timeouts)?;
    tracing::debug!(path = %full_path, baud = dcb.BaudRate, bits = dcb._bitfield, "DCB applied");

    Ok(file)
}

/// Nothing to undo before `CloseHandle`
pub(crate) fn release(_file: &File) {}

pub(crate) fn set_read_timeouts(file: &File, timeouts: ReadTimeouts) -> Result<()> {
    let ReadTimeouts::Comm(timeouts) = timeouts else {
        return Err(SerialError::Config(
            "termios timeouts cannot be applied to a COMM handle".to_string(),
        ));
    };
    let native = comm_timeouts(&timeouts);
    // SAFETY: the handle is borrowed from `file`; native lives across the call
    if unsafe { SetCommTimeouts(raw(file), &native) } == 0 {
        return Err(SerialError::AttributeApplyFailed(io::Error::last_os_error()));
    }
    Ok(())
}

pub(crate) fn bytes_to_read(file: &File) -> Result<u32> {
    let mut errors: u32 = 0;
    // SAFETY: COMSTAT is plain data filled by ClearCommError
    let mut stat: COMSTAT = unsafe { mem::zeroed() };
    // SAFETY: both out-pointers refer to locals that outlive the call
    if unsafe { ClearCommError(raw(file), &mut errors, &mut stat) } == 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(stat.cbInQue)
}

/// Device information set, destroyed on drop
struct DevInfoSet(HDEVINFO);

impl DevInfoSet {
    fn usb_present() -> Result<Self> {
        // SAFETY: the GUID is a static; null enumerator and parent window are allowed
        let set = unsafe {
            SetupDiGetClassDevsW(&GUID_DEVCLASS_USB, ptr::null(), ptr::null_mut(), DIGCF_PRESENT)
        };
        if set as isize == INVALID_HANDLE_VALUE as isize {
            return Err(SerialError::EnumerationFailed(
                io::Error::last_os_error().to_string(),
            ));
        }
        Ok(Self(set))
    }

    fn device(&self, index: u32) -> Option<SP_DEVINFO_DATA> {
        // SAFETY: SP_DEVINFO_DATA is plain data; cbSize must be set before the call
        let mut data: SP_DEVINFO_DATA = unsafe { mem::zeroed() };
        data.cbSize = mem::size_of::<SP_DEVINFO_DATA>() as u32;
        // SAFETY: self.0 is a live device set; data has cbSize set
        if unsafe { SetupDiEnumDeviceInfo(self.0, index, &mut data) } == 0 {
            None
        } else {
            Some(data)
        }
    }

    fn property(&self, data: &SP_DEVINFO_DATA, property: u32) -> Option<String> {
        let mut buf = [0u16; MAX_PATH];
        // SAFETY: the buffer size passed is the byte length of buf
        let ok = unsafe {
            SetupDiGetDeviceRegistryPropertyW(
                self.0,
                data,
                property,
                ptr::null_mut(),
                buf.as_mut_ptr() as *mut u8,
                (buf.len() * mem::size_of::<u16>()) as u32,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return None;
        }
        wide_to_string(&buf)
    }

    fn instance_id(&self, data: &SP_DEVINFO_DATA) -> Option<String> {
        let mut buf = [0u16; MAX_PATH];
        // SAFETY: the size passed is buf's length in UTF-16 units
        let ok = unsafe {
            SetupDiGetDeviceInstanceIdW(
                self.0,
                data,
                buf.as_mut_ptr(),
                buf.len() as u32,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            return None;
        }
        wide_to_string(&buf)
    }
}

impl Drop for DevInfoSet {
    fn drop(&mut self) {
        // SAFETY: self.0 came from SetupDiGetClassDevsW and is destroyed once
        unsafe {
            SetupDiDestroyDeviceInfoList(self.0);
        }
    }
}

fn wide_to_string(buf: &[u16]) -> Option<String> {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    let s = String::from_utf16_lossy(&buf[..len]);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub(crate) fn device_info(path: &str) -> Result<Option<DeviceInfo>> {
    let set = DevInfoSet::usb_present()?;
    let mut found = None;

    // Every match overwrites the previous one
    for data in (0..).map_while(|i| set.device(i)) {
        let Some(friendly_name) = set.property(&data, SPDRP_FRIENDLYNAME) else {
            continue;
        };
        if !friendly_name_matches(&friendly_name, path) {
            continue;
        }

        let ids = set.instance_id(&data).and_then(|id| parse_vid_pid(&id));
        found = Some(DeviceInfo {
            manufacturer: set.property(&data, SPDRP_MFG),
            product: Some(friendly_name),
            driver: set.property(&data, SPDRP_DRIVER),
            model: set.property(&data, SPDRP_DEVICEDESC),
            vid: ids.map(|(vid, _)| vid),
            pid: ids.map(|(_, pid)| pid),
        });
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{PortSettings, StopBits};

    fn dcb_for(settings: &PortSettings) -> DCB {
        let line = LineConfig::plan(settings, CAPABILITIES).unwrap();
        // SAFETY: DCB is plain data
        let mut dcb: DCB = unsafe { mem::zeroed() };
        fill_dcb(&mut dcb, &line);
        dcb
    }

    fn rts_control(dcb: &DCB) -> u32 {
        (dcb._bitfield & RTS_CONTROL_MASK) >> RTS_CONTROL_SHIFT
    }

    #[test]
    fn test_device_path_prefix() {
        assert_eq!(device_path("COM3"), r"\\.\COM3");
        assert_eq!(device_path(r"\\.\COM12"), r"\\.\COM12");
    }

    #[test]
    fn test_dcb_8n1() {
        let dcb = dcb_for(&PortSettings::new(57600));
        assert_eq!(dcb.BaudRate, 57600);
        assert_eq!(dcb.ByteSize, 8);
        assert_eq!(dcb.Parity, NOPARITY);
        assert_eq!(dcb.StopBits, ONESTOPBIT);
        assert_ne!(dcb._bitfield & F_BINARY, 0);
        assert_eq!(dcb._bitfield & (F_PARITY | F_OUTX | F_INX | F_OUTX_CTS_FLOW), 0);
        assert_eq!(rts_control(&dcb), RTS_CONTROL_DISABLE);
    }

    #[test]
    fn test_dcb_parity_and_stop_bits() {
        let dcb = dcb_for(&PortSettings {
            parity: Parity::Odd,
            stop_bits: StopBits::Two,
            ..PortSettings::default()
        });
        assert_eq!(dcb.Parity, ODDPARITY);
        assert_eq!(dcb.StopBits, TWOSTOPBITS);
        assert_ne!(dcb._bitfield & F_PARITY, 0);
    }

    #[test]
    fn test_dcb_flow_control_handshake() {
        let dcb = dcb_for(&PortSettings {
            flow_control: true,
            ..PortSettings::default()
        });
        assert_eq!(rts_control(&dcb), RTS_CONTROL_HANDSHAKE);
        assert_ne!(dcb._bitfield & F_OUTX_CTS_FLOW, 0);
    }

    #[test]
    fn test_dcb_clears_inherited_xon_xoff() {
        let line = LineConfig::plan(&PortSettings::default(), CAPABILITIES).unwrap();
        // SAFETY: DCB is plain data
        let mut dcb: DCB = unsafe { mem::zeroed() };
        dcb._bitfield = F_OUTX | F_INX | F_OUTX_CTS_FLOW;
        fill_dcb(&mut dcb, &line);
        assert_eq!(dcb._bitfield & (F_OUTX | F_INX | F_OUTX_CTS_FLOW), 0);
        assert_ne!(dcb._bitfield & F_BINARY, 0);
    }

    #[test]
    fn test_comm_timeouts_copy() {
        let native = comm_timeouts(&CommTimeouts::NON_BLOCKING);
        assert_eq!(native.ReadIntervalTimeout, 50);
        assert_eq!(native.ReadTotalTimeoutMultiplier, 10);
        assert_eq!(native.ReadTotalTimeoutConstant, 50);
        assert_eq!(native.WriteTotalTimeoutMultiplier, 10);
        assert_eq!(native.WriteTotalTimeoutConstant, 50);
    }

    #[test]
    fn test_wide_to_string_stops_at_nul() {
        let mut buf = [0u16; 8];
        for (slot, c) in buf.iter_mut().zip("COM3".encode_utf16()) {
            *slot = c;
        }
        assert_eq!(wide_to_string(&buf).as_deref(), Some("COM3"));
        assert_eq!(wide_to_string(&[0u16; 4]), None);
    }
}
