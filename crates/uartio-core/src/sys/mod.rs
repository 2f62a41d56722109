//! Platform backends
//!
//! Exactly one backend is compiled in. Each exposes the same set of
//! functions plus its [`Capabilities`](crate::line::Capabilities), which
//! [`LineConfig::plan`](crate::line::LineConfig::plan) uses to shape the
//! line configuration before the backend applies it.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub(crate) use self::linux::*;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use self::windows::*;

#[cfg(not(any(target_os = "linux", windows)))]
mod unsupported;
#[cfg(not(any(target_os = "linux", windows)))]
pub(crate) use self::unsupported::*;
