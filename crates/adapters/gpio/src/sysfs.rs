//! Linux sysfs GPIO lines (`/sys/class/gpio`).
//!
//! A line is claimed by writing its number to `export`, which makes a
//! `gpioN/` directory appear with `direction`, `active_low` and `value`
//! attributes. Relay boards are usually active-low: the line must idle
//! electrically high, so the direction is set with a raw `high` level and
//! `active_low` is flipped before any logical value is written.

use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use pinhub_app::ports::OutputPort;
use pinhub_domain::error::ResourceError;
use pinhub_domain::pin::Pin;

pub const DEFAULT_ROOT: &str = "/sys/class/gpio";

/// Output lines driven through the sysfs GPIO interface.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
    active_low: bool,
    pins: RangeInclusive<u8>,
}

impl SysfsGpio {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, active_low: bool, pins: RangeInclusive<u8>) -> Self {
        Self {
            root: root.into(),
            active_low,
            pins,
        }
    }

    fn line_dir(&self, pin: Pin) -> PathBuf {
        self.root.join(format!("gpio{}", pin.number()))
    }

    fn export(&self, pin: Pin) -> io::Result<()> {
        fs::write(self.root.join("export"), pin.number().to_string())
    }

    fn unexport(&self, pin: Pin) -> io::Result<()> {
        fs::write(self.root.join("unexport"), pin.number().to_string())
    }

    fn configure(&self, dir: &Path) -> io::Result<()> {
        let idle = if self.active_low { "high" } else { "low" };
        fs::write(dir.join("direction"), idle)?;
        if self.active_low {
            fs::write(dir.join("active_low"), "1")?;
        }
        Ok(())
    }
}

impl OutputPort for SysfsGpio {
    fn reset(&self) -> Result<(), ResourceError> {
        let mut released = 0;
        for number in self.pins.clone() {
            let pin = Pin::new(number);
            if !self.line_dir(pin).exists() {
                continue;
            }
            self.unexport(pin).map_err(ResourceError::Cleanup)?;
            released += 1;
        }
        if released > 0 {
            tracing::info!(released, "released stale gpio lines");
        }
        Ok(())
    }

    fn open(&self, pin: Pin) -> Result<(), ResourceError> {
        if !self.pins.contains(&pin.number()) {
            return Err(ResourceError::InvalidPin { pin });
        }
        let dir = self.line_dir(pin);
        if !dir.exists() {
            self.export(pin)
                .map_err(|source| ResourceError::Acquisition { pin, source })?;
        }
        if !dir.exists() {
            return Err(ResourceError::Acquisition {
                pin,
                source: io::Error::new(io::ErrorKind::NotFound, "line did not appear after export"),
            });
        }
        self.configure(&dir)
            .map_err(|source| ResourceError::Acquisition { pin, source })?;
        tracing::debug!(%pin, active_low = self.active_low, "gpio line exported");
        Ok(())
    }

    fn write(&self, pin: Pin, on: bool) -> Result<(), ResourceError> {
        let value = if on { "1" } else { "0" };
        fs::write(self.line_dir(pin).join("value"), value)
            .map_err(|source| ResourceError::Fault { pin, source })
    }

    fn close(&self, pin: Pin) {
        if let Err(err) = self.write(pin, false) {
            tracing::warn!(%pin, %err, "failed to switch line off before release");
        }
        if let Err(err) = self.unexport(pin) {
            tracing::warn!(%pin, %err, "failed to unexport gpio line");
        }
    }
}
