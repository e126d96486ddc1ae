//! # pinhub-adapter-gpio
//!
//! Implementations of the `OutputPort` trait from `pinhub-app`.
//!
//! | Backend | Type | Use |
//! |---------|------|-----|
//! | `virtual` | [`VirtualGpio`] | development machines and tests |
//! | `sysfs` | [`SysfsGpio`] | Raspberry Pi and other Linux boards |
//!
//! ## Dependency rule
//!
//! Depends on `pinhub-app` (port traits) and `pinhub-domain` only.

mod sysfs;
mod virtual_lines;

use std::path::PathBuf;

use serde::Deserialize;

use pinhub_app::ports::OutputPort;
use pinhub_domain::error::ResourceError;
use pinhub_domain::pin::Pin;

pub use sysfs::{DEFAULT_ROOT, SysfsGpio};
pub use virtual_lines::VirtualGpio;

/// Which backend drives the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Virtual,
    Sysfs,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virtual" => Ok(Self::Virtual),
            "sysfs" => Ok(Self::Sysfs),
            other => Err(format!("unknown gpio backend {other:?}")),
        }
    }
}

/// `[gpio]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub backend: Backend,
    pub sysfs_root: PathBuf,
    /// Relay boards switch on when the line is pulled low.
    pub active_low: bool,
    pub first_pin: u8,
    pub last_pin: u8,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Virtual,
            sysfs_root: PathBuf::from(DEFAULT_ROOT),
            active_low: true,
            first_pin: 2,
            last_pin: 27,
        }
    }
}

impl GpioConfig {
    /// Instantiate the configured backend.
    #[must_use]
    pub fn build(&self) -> Gpio {
        let pins = self.first_pin..=self.last_pin;
        match self.backend {
            Backend::Virtual => Gpio::Virtual(VirtualGpio::new(pins)),
            Backend::Sysfs => Gpio::Sysfs(SysfsGpio::new(&self.sysfs_root, self.active_low, pins)),
        }
    }
}

/// The backend picked at startup.
#[derive(Debug)]
pub enum Gpio {
    Virtual(VirtualGpio),
    Sysfs(SysfsGpio),
}

impl Gpio {
    #[must_use]
    pub fn backend(&self) -> Backend {
        match self {
            Self::Virtual(_) => Backend::Virtual,
            Self::Sysfs(_) => Backend::Sysfs,
        }
    }
}

impl OutputPort for Gpio {
    fn reset(&self) -> Result<(), ResourceError> {
        match self {
            Self::Virtual(lines) => lines.reset(),
            Self::Sysfs(lines) => lines.reset(),
        }
    }

    fn open(&self, pin: Pin) -> Result<(), ResourceError> {
        match self {
            Self::Virtual(lines) => lines.open(pin),
            Self::Sysfs(lines) => lines.open(pin),
        }
    }

    fn write(&self, pin: Pin, on: bool) -> Result<(), ResourceError> {
        match self {
            Self::Virtual(lines) => lines.write(pin, on),
            Self::Sysfs(lines) => lines.write(pin, on),
        }
    }

    fn close(&self, pin: Pin) {
        match self {
            Self::Virtual(lines) => lines.close(pin),
            Self::Sysfs(lines) => lines.close(pin),
        }
    }
}
