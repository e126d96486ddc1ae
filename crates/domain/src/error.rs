//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HubError`]
//! via `#[from]`.

use crate::pin::Pin;

/// Top-level error shared by every layer.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Input failed a domain invariant.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A room or device lookup came back empty.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An output line could not be bound, driven, or released.
    #[error("output resource error")]
    Resource(#[from] ResourceError),

    /// The house snapshot could not be loaded at startup.
    #[error("house load error")]
    Load(#[from] LoadError),

    /// An adapter-level storage failure.
    #[error("storage error")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid time of day {0:?}, expected HH:MM")]
    InvalidTimeOfDay(String),

    #[error("invalid weekday {0:?}")]
    InvalidWeekday(String),

    #[error("a schedule needs at least one active weekday")]
    NoScheduleDays,

    #[error("a scheduled device needs {0}")]
    MissingScheduleField(&'static str),

    #[error("a device needs an output pin")]
    MissingPin,

    #[error("invalid switch state {0:?}, expected \"on\" or \"off\"")]
    InvalidSwitchState(String),

    #[error("device {0} is already registered")]
    DuplicateDevice(String),

    #[error("room {0} already exists")]
    DuplicateRoom(String),
}

/// A lookup by id found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

impl NotFoundError {
    /// `RoomNotFound`.
    #[must_use]
    pub fn room(id: impl ToString) -> Self {
        Self {
            entity: "Room",
            id: id.to_string(),
        }
    }

    /// `DeviceNotFound`.
    #[must_use]
    pub fn device(id: impl ToString) -> Self {
        Self {
            entity: "Device",
            id: id.to_string(),
        }
    }
}

/// Failures of the physical on/off lines.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The pin is already bound to another live device.
    #[error("{pin} is already bound")]
    PinUnavailable { pin: Pin },

    /// The pin is outside what the hardware exposes.
    #[error("{pin} is not a usable output")]
    InvalidPin { pin: Pin },

    /// The hardware refused to hand out the line.
    #[error("failed to acquire {pin}")]
    Acquisition {
        pin: Pin,
        #[source]
        source: std::io::Error,
    },

    /// A switch was attempted on a device that holds no line.
    #[error("output for device {device_id} is not initialized")]
    NotInitialized { device_id: String },

    /// Driving the line failed at the hardware level.
    #[error("failed to drive {pin}")]
    Fault {
        pin: Pin,
        #[source]
        source: std::io::Error,
    },

    /// Releasing stale bindings left by a previous process failed.
    #[error("failed to release stale output bindings")]
    Cleanup(#[source] std::io::Error),
}

impl ResourceError {
    /// Whether the error comes from contention or addressing rather than the hardware itself.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::PinUnavailable { .. } | Self::NotInitialized { .. }
        )
    }
}

/// Startup could not obtain a house snapshot.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The store holds no house.
    #[error("no house is stored")]
    NoHouse,

    /// The loader itself failed.
    #[error("house loader failed")]
    Unavailable(#[source] Box<HubError>),
}
