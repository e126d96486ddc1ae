//! Output port — the physical on/off lines.
//!
//! Calls are synchronous: driving a line is a short register or file write,
//! cheap enough to perform while the registry lock is held.

use std::sync::Arc;

use pinhub_domain::error::ResourceError;
use pinhub_domain::pin::Pin;

/// Hardware backend for switched outputs.
///
/// Exclusivity is enforced one level up by
/// [`OutputManager`](crate::output_manager::OutputManager); a backend only
/// needs to perform the raw operations.
pub trait OutputPort: Send + Sync + 'static {
    /// Force-release any line left claimed by a previous process.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Cleanup`] when stale claims cannot be dropped.
    fn reset(&self) -> Result<(), ResourceError>;

    /// Claim `pin` as an output, initially off.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidPin`] for an address the hardware lacks,
    /// or [`ResourceError::Acquisition`] when the claim fails.
    fn open(&self, pin: Pin) -> Result<(), ResourceError>;

    /// Drive a claimed line on or off.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Fault`] on a hardware-level failure.
    fn write(&self, pin: Pin, on: bool) -> Result<(), ResourceError>;

    /// Drop the claim on `pin`. Never fails; a backend logs what it cannot undo.
    fn close(&self, pin: Pin);
}

impl<T: OutputPort> OutputPort for Arc<T> {
    fn reset(&self) -> Result<(), ResourceError> {
        (**self).reset()
    }

    fn open(&self, pin: Pin) -> Result<(), ResourceError> {
        (**self).open(pin)
    }

    fn write(&self, pin: Pin, on: bool) -> Result<(), ResourceError> {
        (**self).write(pin, on)
    }

    fn close(&self, pin: Pin) {
        (**self).close(pin);
    }
}
