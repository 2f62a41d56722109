//! Port settings
//!
//! The configuration record handed to [`crate::SerialPort::open`]. Parity and
//! stop bits are validated when the record is built or deserialized, so an
//! invalid value never reaches a backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::baud::{self, DEFAULT_BAUD_RATE};
use crate::error::{Result, SerialError};

/// Parity bit scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl Parity {
    /// Single-letter form: 'n', 'e' or 'o'
    pub fn as_char(self) -> char {
        match self {
            Parity::None => 'n',
            Parity::Even => 'e',
            Parity::Odd => 'o',
        }
    }
}

impl TryFrom<char> for Parity {
    type Error = SerialError;

    fn try_from(c: char) -> Result<Self> {
        match c.to_ascii_lowercase() {
            'n' => Ok(Parity::None),
            'e' => Ok(Parity::Even),
            'o' => Ok(Parity::Odd),
            _ => Err(SerialError::InvalidParity(c.to_string())),
        }
    }
}

impl FromStr for Parity {
    type Err = SerialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "none" => Ok(Parity::None),
            "e" | "even" => Ok(Parity::Even),
            "o" | "odd" => Ok(Parity::Odd),
            _ => Err(SerialError::InvalidParity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Parity {
    type Error = SerialError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Parity> for String {
    fn from(parity: Parity) -> Self {
        parity.as_char().to_string()
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    /// One stop bit
    #[default]
    One,
    /// Two stop bits
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = SerialError;

    fn try_from(n: u8) -> Result<Self> {
        match n {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(SerialError::InvalidStopBits(other)),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(stop_bits: StopBits) -> Self {
        match stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Serial line settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SettingsFile")]
pub struct PortSettings {
    /// Baud rate, one of [`baud::SUPPORTED_BAUD_RATES`]
    pub baud_rate: u32,
    /// Parity scheme
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Block reads until at least one byte arrives
    pub blocking: bool,
    /// RTS/CTS hardware flow control
    pub flow_control: bool,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            stop_bits: StopBits::One,
            blocking: false,
            flow_control: false,
        }
    }
}

/// On-disk form of [`PortSettings`]: parity and stop bits stay raw so their
/// own error kinds surface instead of a generic parse error
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    baud_rate: u32,
    parity: String,
    stop_bits: u8,
    blocking: bool,
    flow_control: bool,
}

impl Default for SettingsFile {
    fn default() -> Self {
        let defaults = PortSettings::default();
        Self {
            baud_rate: defaults.baud_rate,
            parity: defaults.parity.into(),
            stop_bits: defaults.stop_bits.into(),
            blocking: defaults.blocking,
            flow_control: defaults.flow_control,
        }
    }
}

impl TryFrom<SettingsFile> for PortSettings {
    type Error = SerialError;

    fn try_from(raw: SettingsFile) -> Result<Self> {
        let settings = Self {
            baud_rate: raw.baud_rate,
            parity: raw.parity.parse()?,
            stop_bits: StopBits::try_from(raw.stop_bits)?,
            blocking: raw.blocking,
            flow_control: raw.flow_control,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl PortSettings {
    /// Default 8N1 settings at the given baud rate
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Check the fields that are not enforced by their types
    pub fn validate(&self) -> Result<()> {
        baud::validate(self.baud_rate)?;
        Ok(())
    }

    /// Parse settings from JSON; missing fields take their defaults, unknown
    /// fields are rejected
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: SettingsFile =
            serde_json::from_str(json).map_err(|e| SerialError::Config(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Load settings from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| SerialError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SerialError::Config(e.to_string()))
    }
}

impl fmt::Display for PortSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 8{}{}",
            self.baud_rate,
            self.parity.as_char().to_ascii_uppercase(),
            self.stop_bits
        )?;
        if self.flow_control {
            write!(f, " rtscts")?;
        }
        if self.blocking {
            write!(f, " blocking")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_char_is_case_insensitive() {
        assert_eq!(Parity::try_from('n').unwrap(), Parity::None);
        assert_eq!(Parity::try_from('N').unwrap(), Parity::None);
        assert_eq!(Parity::try_from('e').unwrap(), Parity::Even);
        assert_eq!(Parity::try_from('E').unwrap(), Parity::Even);
        assert_eq!(Parity::try_from('o').unwrap(), Parity::Odd);
        assert_eq!(Parity::try_from('O').unwrap(), Parity::Odd);
    }

    #[test]
    fn test_parity_rejects_unknown() {
        for c in ['x', 'm', 's', '1', ' '] {
            assert!(matches!(
                Parity::try_from(c),
                Err(SerialError::InvalidParity(_))
            ));
        }
        assert!("mark".parse::<Parity>().is_err());
        assert!("".parse::<Parity>().is_err());
    }

    #[test]
    fn test_parity_words() {
        assert_eq!("None".parse::<Parity>().unwrap(), Parity::None);
        assert_eq!(" EVEN ".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!("odd".parse::<Parity>().unwrap(), Parity::Odd);
    }

    #[test]
    fn test_stop_bits_only_one_or_two() {
        assert_eq!(StopBits::try_from(1).unwrap(), StopBits::One);
        assert_eq!(StopBits::try_from(2).unwrap(), StopBits::Two);
        for n in [0u8, 3, 15, 255] {
            assert!(matches!(
                StopBits::try_from(n),
                Err(SerialError::InvalidStopBits(v)) if v == n
            ));
        }
    }

    #[test]
    fn test_defaults_are_8n1() {
        let s = PortSettings::default();
        assert_eq!(s.baud_rate, 115200);
        assert_eq!(s.parity, Parity::None);
        assert_eq!(s.stop_bits, StopBits::One);
        assert!(!s.blocking);
        assert!(!s.flow_control);
        assert_eq!(s.to_string(), "115200 8N1");
    }

    #[test]
    fn test_display_flags() {
        let s = PortSettings {
            baud_rate: 9600,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            blocking: true,
            flow_control: true,
        };
        assert_eq!(s.to_string(), "9600 8E2 rtscts blocking");
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let s = PortSettings::from_json_str(r#"{ "baud_rate": 9600, "parity": "O" }"#).unwrap();
        assert_eq!(s.baud_rate, 9600);
        assert_eq!(s.parity, Parity::Odd);
        assert_eq!(s.stop_bits, StopBits::One);
    }

    #[test]
    fn test_json_rejects_bad_values_with_their_kind() {
        assert!(matches!(
            PortSettings::from_json_str(r#"{ "parity": "x" }"#),
            Err(SerialError::InvalidParity(ref p)) if p == "x"
        ));
        assert!(matches!(
            PortSettings::from_json_str(r#"{ "stop_bits": 3 }"#),
            Err(SerialError::InvalidStopBits(3))
        ));
        assert!(matches!(
            PortSettings::from_json_str(r#"{ "baud_rate": 12345 }"#),
            Err(SerialError::UnsupportedBaudRate(12345))
        ));
        assert!(matches!(
            PortSettings::from_json_str(r#"{ "baud_rate": "fast" }"#),
            Err(SerialError::Config(_))
        ));
    }

    #[test]
    fn test_json_rejects_unknown_keys() {
        let err = PortSettings::from_json_str(r#"{ "baudrate": 9600, "stopBits": 2 }"#)
            .unwrap_err();
        assert!(matches!(err, SerialError::Config(ref msg) if msg.contains("baudrate")));

        assert!(matches!(
            PortSettings::from_json_str(r#"{ "controlflow": true }"#),
            Err(SerialError::Config(_))
        ));
    }

    #[test]
    fn test_serde_deserialize_validates() {
        let settings: PortSettings =
            serde_json::from_str(r#"{ "baud_rate": 9600, "stop_bits": 2 }"#).unwrap();
        assert_eq!(settings.stop_bits, StopBits::Two);
        assert!(serde_json::from_str::<PortSettings>(r#"{ "baud_rate": 12345 }"#).is_err());
    }

    #[test]
    fn test_json_output_uses_short_forms() {
        let json = PortSettings::new(57600).to_json_string().unwrap();
        assert!(json.contains(r#""parity": "n""#));
        assert!(json.contains(r#""stop_bits": 1"#));
    }
}
