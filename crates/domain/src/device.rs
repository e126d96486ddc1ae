//! Device — a single on/off appliance wired to one output pin.
//!
//! A device belongs to exactly one room. It may carry a weekly
//! [`Schedule`]; when it does, the watcher drives it automatically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, ValidationError};
use crate::id::{DeviceId, RoomId};
use crate::pin::Pin;
use crate::schedule::Schedule;

/// Last commanded state of a device's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    #[default]
    Off,
}

impl SwitchState {
    #[must_use]
    pub fn is_on(self) -> bool {
        self == Self::On
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl From<bool> for SwitchState {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl FromStr for SwitchState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(ValidationError::InvalidSwitchState(s.to_string())),
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An appliance controlled by one output pin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub room_id: RoomId,
    pub name: String,
    pub pin: Pin,
    pub status: SwitchState,
    pub schedule: Option<Schedule>,
    /// Who configured the current schedule, carried into scheduled events.
    pub scheduled_by: Option<String>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when `name` is empty or the schedule is invalid.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(schedule) = &self.schedule {
            schedule.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_some()
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    room_id: Option<RoomId>,
    name: Option<String>,
    pin: Option<Pin>,
    status: SwitchState,
    schedule: Option<Schedule>,
    scheduled_by: Option<String>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn room_id(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn pin(mut self, pin: impl Into<Pin>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: SwitchState) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    #[must_use]
    pub fn scheduled_by(mut self, user: impl Into<String>) -> Self {
        self.scheduled_by = Some(user.into());
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if `name` is missing or empty, or
    /// [`ValidationError::MissingPin`] when no pin was given.
    pub fn build(self) -> Result<Device, HubError> {
        let pin = self.pin.ok_or(ValidationError::MissingPin)?;
        let device = Device {
            id: self.id.unwrap_or_default(),
            room_id: self.room_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            pin,
            status: self.status,
            schedule: self.schedule,
            scheduled_by: self.scheduled_by,
        };
        device.validate()?;
        Ok(device)
    }
}
