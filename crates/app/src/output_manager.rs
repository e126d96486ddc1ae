//! Output resource manager — exclusive bindings between pins and owners.
//!
//! [`OutputManager::acquire`] hands out at most one [`OutputHandle`] per pin.
//! The handle releases its pin when dropped, so a binding can never outlive
//! the value that owns it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use pinhub_domain::error::ResourceError;
use pinhub_domain::pin::Pin;

use crate::ports::OutputPort;

struct Lines<P> {
    port: P,
    bound: Mutex<HashSet<Pin>>,
}

impl<P> Lines<P> {
    fn bound(&self) -> std::sync::MutexGuard<'_, HashSet<Pin>> {
        self.bound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Grants exclusive access to output lines.
pub struct OutputManager<P> {
    lines: Arc<Lines<P>>,
}

impl<P> Clone for OutputManager<P> {
    fn clone(&self) -> Self {
        Self {
            lines: Arc::clone(&self.lines),
        }
    }
}

impl<P: OutputPort> OutputManager<P> {
    #[must_use]
    pub fn new(port: P) -> Self {
        Self {
            lines: Arc::new(Lines {
                port,
                bound: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Release stale claims left behind by an earlier process.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Cleanup`] from the backend.
    pub fn reset(&self) -> Result<(), ResourceError> {
        self.lines.port.reset()
    }

    /// Bind `pin` exclusively.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::PinUnavailable`] when another handle holds the
    /// pin, or the backend error when the hardware refuses it.
    pub fn acquire(&self, pin: Pin) -> Result<OutputHandle<P>, ResourceError> {
        let mut bound = self.lines.bound();
        if bound.contains(&pin) {
            return Err(ResourceError::PinUnavailable { pin });
        }
        self.lines.port.open(pin)?;
        bound.insert(pin);
        tracing::debug!(%pin, "output bound");
        Ok(OutputHandle {
            lines: Arc::clone(&self.lines),
            pin,
            released: false,
        })
    }

    #[must_use]
    pub fn is_bound(&self, pin: Pin) -> bool {
        self.lines.bound().contains(&pin)
    }

    /// Number of live handles.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.lines.bound().len()
    }
}

/// A live, exclusive binding to one output line.
pub struct OutputHandle<P: OutputPort> {
    lines: Arc<Lines<P>>,
    pin: Pin,
    released: bool,
}

impl<P: OutputPort> OutputHandle<P> {
    #[must_use]
    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Drive the line.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Fault`] on a hardware failure.
    pub fn set(&self, on: bool) -> Result<(), ResourceError> {
        self.lines.port.write(self.pin, on)
    }

    /// Give the pin back. Dropping the handle does the same.
    pub fn release(mut self) {
        self.release_line();
    }

    fn release_line(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.lines.port.close(self.pin);
        self.lines.bound().remove(&self.pin);
        tracing::debug!(pin = %self.pin, "output released");
    }
}

impl<P: OutputPort> Drop for OutputHandle<P> {
    fn drop(&mut self) {
        self.release_line();
    }
}

impl<P: OutputPort> std::fmt::Debug for OutputHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputHandle")
            .field("pin", &self.pin)
            .finish_non_exhaustive()
    }
}
