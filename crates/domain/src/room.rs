//! Room — a named group of devices inside the house.

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{HubError, ValidationError};
use crate::id::{DeviceId, HouseId, RoomId};

/// A room and the devices it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub house_id: HouseId,
    pub name: String,
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Room {
    /// Create a builder for constructing a [`Room`].
    #[must_use]
    pub fn builder() -> RoomBuilder {
        RoomBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Detach a device from this room, returning it if it was present.
    pub fn take_device(&mut self, id: DeviceId) -> Option<Device> {
        let idx = self.devices.iter().position(|d| d.id == id)?;
        Some(self.devices.remove(idx))
    }
}

/// Step-by-step builder for [`Room`].
#[derive(Debug, Default)]
pub struct RoomBuilder {
    id: Option<RoomId>,
    house_id: Option<HouseId>,
    name: Option<String>,
    devices: Vec<Device>,
}

impl RoomBuilder {
    #[must_use]
    pub fn id(mut self, id: RoomId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn house_id(mut self, house_id: HouseId) -> Self {
        self.house_id = Some(house_id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    /// Consume the builder, validate, and return a [`Room`].
    ///
    /// Devices added through the builder are re-parented onto the new room.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if `name` is missing or empty.
    pub fn build(self) -> Result<Room, HubError> {
        let id = self.id.unwrap_or_default();
        let devices = self
            .devices
            .into_iter()
            .map(|mut d| {
                d.room_id = id;
                d
            })
            .collect();
        let room = Room {
            id,
            house_id: self.house_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            devices,
        };
        room.validate()?;
        Ok(room)
    }
}
