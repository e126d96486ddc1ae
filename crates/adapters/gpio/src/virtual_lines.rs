//! In-memory output lines for development and tests.

use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pinhub_app::ports::OutputPort;
use pinhub_domain::error::ResourceError;
use pinhub_domain::pin::Pin;

#[derive(Debug, Default)]
struct State {
    levels: HashMap<Pin, bool>,
    faulty: HashSet<Pin>,
}

/// Output lines that only exist in memory.
///
/// Levels can be inspected and faults injected, which makes the backend
/// useful both on a developer machine and in end-to-end tests.
#[derive(Debug)]
pub struct VirtualGpio {
    pins: RangeInclusive<u8>,
    state: Mutex<State>,
}

impl Default for VirtualGpio {
    fn default() -> Self {
        Self::new(2..=27)
    }
}

impl VirtualGpio {
    #[must_use]
    pub fn new(pins: RangeInclusive<u8>) -> Self {
        Self {
            pins,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current level of an open line, `None` when the line is not claimed.
    #[must_use]
    pub fn level(&self, pin: Pin) -> Option<bool> {
        self.state().levels.get(&pin).copied()
    }

    #[must_use]
    pub fn is_open(&self, pin: Pin) -> bool {
        self.state().levels.contains_key(&pin)
    }

    /// Make every write to `pin` fail until [`clear_fault`](Self::clear_fault).
    pub fn inject_fault(&self, pin: Pin) {
        self.state().faulty.insert(pin);
    }

    pub fn clear_fault(&self, pin: Pin) {
        self.state().faulty.remove(&pin);
    }
}

impl OutputPort for VirtualGpio {
    fn reset(&self) -> Result<(), ResourceError> {
        self.state().levels.clear();
        Ok(())
    }

    fn open(&self, pin: Pin) -> Result<(), ResourceError> {
        if !self.pins.contains(&pin.number()) {
            return Err(ResourceError::InvalidPin { pin });
        }
        self.state().levels.insert(pin, false);
        Ok(())
    }

    fn write(&self, pin: Pin, on: bool) -> Result<(), ResourceError> {
        let mut state = self.state();
        if state.faulty.contains(&pin) {
            return Err(ResourceError::Fault {
                pin,
                source: std::io::Error::other("injected fault"),
            });
        }
        match state.levels.get_mut(&pin) {
            Some(level) => {
                *level = on;
                tracing::debug!(%pin, on, "virtual line driven");
                Ok(())
            }
            None => Err(ResourceError::Fault {
                pin,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "line is not open"),
            }),
        }
    }

    fn close(&self, pin: Pin) {
        self.state().levels.remove(&pin);
    }
}
