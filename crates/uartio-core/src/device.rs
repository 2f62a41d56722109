//! Device discovery
//!
//! Port listing through the `serialport` crate, and per-port USB details.
//! On Windows the details come from a SetupAPI scan of the USB device class;
//! elsewhere they are read from the `serialport` listing.

use serde::{Deserialize, Serialize};
use serialport::{SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;

use crate::error::Result;
use crate::sys;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,

    /// Serial number (if available)
    pub serial_number: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => Self {
                name: info.port_name,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                manufacturer: usb_info.manufacturer,
                product: usb_info.product,
                serial_number: usb_info.serial_number,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// USB details for one serial device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Manufacturer name
    pub manufacturer: Option<String>,
    /// Friendly name, e.g. "USB Serial Port (COM3)"
    pub product: Option<String>,
    /// Driver key (Windows only)
    pub driver: Option<String>,
    /// Device description
    pub model: Option<String>,
    /// USB vendor ID
    pub vid: Option<u16>,
    /// USB product ID
    pub pid: Option<u16>,
}

impl DeviceInfo {
    /// `"vvvv:pppp"` in lowercase hex, when both IDs are known
    pub fn usb_id(&self) -> Option<String> {
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => Some(format!("{:04x}:{:04x}", vid, pid)),
            _ => None,
        }
    }
}

impl From<PortInfo> for DeviceInfo {
    fn from(port: PortInfo) -> Self {
        Self {
            manufacturer: port.manufacturer,
            product: port.product,
            driver: None,
            model: None,
            vid: port.vid,
            pid: port.pid,
        }
    }
}

/// Extract VID and PID from a device instance ID such as
/// `USB\VID_0403&PID_6001\A50285BI`
pub fn parse_vid_pid(instance_id: &str) -> Option<(u16, u16)> {
    let upper = instance_id.to_ascii_uppercase();
    let field = |tag: &str| -> Option<u16> {
        let start = upper.find(tag)? + tag.len();
        let digits = upper.get(start..start + 4)?;
        u16::from_str_radix(digits, 16).ok()
    };
    Some((field("VID_")?, field("PID_")?))
}

/// Whether a device's friendly name refers to `path`
pub fn friendly_name_matches(friendly_name: &str, path: &str) -> bool {
    !path.is_empty() && friendly_name.contains(path)
}

/// Helper used to sort port names so that:
///  - ttyACM* ports come first (sorted numerically by suffix)
///  - then ttyUSB* ports (sorted numerically)
///  - then other ports (sorted by name)
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    match serialport::available_ports() {
        Ok(ports) => {
            for info in ports {
                let p = PortInfo::from(info);
                map.entry(p.name.clone()).or_insert(p);
            }
        }
        Err(e) => tracing::warn!("serial port listing failed: {e}"),
    }

    // Linux-only: add /dev/ttyACM* and /dev/ttyUSB* entries the listing missed
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone()).or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Pick the listing entry for `path`: an exact name match, else the last
/// entry whose name contains it
#[cfg_attr(windows, allow(dead_code))]
pub(crate) fn select_listed(ports: Vec<PortInfo>, path: &str) -> Option<PortInfo> {
    if path.is_empty() {
        return None;
    }
    let mut found = None;
    for port in ports {
        if port.name == path {
            return Some(port);
        }
        if port.name.contains(path) {
            found = Some(port);
        }
    }
    found
}

/// USB details for the device behind `path`.
///
/// Returns `Ok(None)` when no present device matches.
pub fn device_info(path: &str) -> Result<Option<DeviceInfo>> {
    let info = sys::device_info(path)?;
    match &info {
        Some(found) => tracing::debug!(path, ?found, "device details"),
        None => tracing::debug!(path, "no matching device"),
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_ports() {
        // This test just ensures the function doesn't panic
        let ports = list_ports();
        for port in &ports {
            println!("Found port: {} - {:?}", port.name, port.product);
        }
    }

    #[test]
    fn test_port_sorting() {
        let names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/ttyACM0",
            "/dev/someport",
            "/dev/ttyACM10",
        ];
        let mut ports: Vec<PortInfo> = names
            .into_iter()
            .map(|n| PortInfo::bare(n.to_string()))
            .collect();

        ports.sort_by_key(|p| port_sort_key(&p.name));
        let ordered: Vec<String> = ports.into_iter().map(|p| p.name).collect();

        assert_eq!(
            ordered,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn test_parse_vid_pid() {
        assert_eq!(
            parse_vid_pid(r"USB\VID_0403&PID_6001\A50285BI"),
            Some((0x0403, 0x6001))
        );
        assert_eq!(
            parse_vid_pid(r"usb\vid_10c4&pid_ea60\0001"),
            Some((0x10c4, 0xea60))
        );
        assert_eq!(parse_vid_pid(r"USB\VID_0403"), None);
        assert_eq!(parse_vid_pid(r"ACPI\PNP0501\1"), None);
        assert_eq!(parse_vid_pid(r"USB\VID_04&PID_6001"), None);
    }

    #[test]
    fn test_usb_id_format() {
        let info = DeviceInfo {
            vid: Some(0x10c4),
            pid: Some(0xea60),
            ..DeviceInfo::default()
        };
        assert_eq!(info.usb_id().as_deref(), Some("10c4:ea60"));
        assert_eq!(DeviceInfo::default().usb_id(), None);
    }

    #[test]
    fn test_friendly_name_match_is_substring() {
        assert!(friendly_name_matches(
            "Silicon Labs CP210x USB to UART Bridge (COM3)",
            "COM3"
        ));
        assert!(!friendly_name_matches("USB Serial Port (COM4)", "COM3"));
        assert!(!friendly_name_matches("USB Serial Port (COM4)", ""));
    }

    #[test]
    fn test_select_listed_prefers_exact_then_last_match() {
        let ports = vec![
            PortInfo::bare("/dev/ttyUSB0".to_string()),
            PortInfo::bare("/dev/ttyUSB1".to_string()),
            PortInfo::bare("/dev/ttyUSB10".to_string()),
        ];
        assert_eq!(
            select_listed(ports.clone(), "/dev/ttyUSB1").map(|p| p.name),
            Some("/dev/ttyUSB1".to_string())
        );
        assert_eq!(
            select_listed(ports.clone(), "ttyUSB").map(|p| p.name),
            Some("/dev/ttyUSB10".to_string())
        );
        assert_eq!(select_listed(ports, "ttyACM0"), None);
    }

    #[test]
    fn test_device_info_from_port_info() {
        let port = PortInfo {
            name: "/dev/ttyUSB0".to_string(),
            vid: Some(0x0403),
            pid: Some(0x6001),
            manufacturer: Some("FTDI".to_string()),
            product: Some("FT232R USB UART".to_string()),
            serial_number: Some("A50285BI".to_string()),
        };
        let info = DeviceInfo::from(port);
        assert_eq!(info.manufacturer.as_deref(), Some("FTDI"));
        assert_eq!(info.usb_id().as_deref(), Some("0403:6001"));
        assert_eq!(info.driver, None);
    }
}
